//! Run one coordinated decision over a small history

fn main() {
    let json = r#"{
        "current_url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
        "current_title": "Funny Cat Compilation 2024",
        "time_on_current_seconds": 140,
        "study_topic": "data structures",
        "session_active": true,
        "recent_domains": ["github.com", "stackoverflow.com", "reddit.com", "youtube.com"],
        "interventions_today": 2,
        "historical_events": [
            { "domain": "github.com", "duration": 900, "timestamp": "2026-02-24T13:10:00", "is_distraction": false },
            { "domain": "youtube.com", "duration": 600, "timestamp": "2026-02-24T14:05:00", "is_distraction": true },
            { "domain": "reddit.com", "duration": 300, "timestamp": "2026-02-24T14:15:00", "is_distraction": true },
            { "domain": "instagram.com", "duration": 240, "timestamp": "2026-02-24T14:20:00", "is_distraction": true },
            { "domain": "youtube.com", "duration": 420, "timestamp": "2026-02-24T14:25:00", "is_distraction": true },
            { "domain": "reddit.com", "duration": 180, "timestamp": "2026-02-24T14:33:00", "is_distraction": true },
            { "domain": "instagram.com", "duration": 200, "timestamp": "2026-02-24T14:36:00", "is_distraction": true },
            { "domain": "arxiv.org", "duration": 1200, "timestamp": "2026-02-24T16:00:00", "is_distraction": false }
        ]
    }"#;

    match adaptifocus::coordinate_json(json) {
        Ok(output) => print!("{output}"),
        Err(e) => eprintln!("Error: {e:?}"),
    }
}
