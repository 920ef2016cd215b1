//! Core types for the AdaptiFocus pipeline
//!
//! This module defines the data structures that flow between components:
//! browsing events, the current page state, classification results, mined
//! patterns, and intervention decisions.

use crate::classify::normalize_host;
use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Maximum number of recent domains kept on a [`CurrentPageState`]
pub const MAX_RECENT_DOMAINS: usize = 20;

/// A single page visit from the caller's history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowsingEvent {
    pub url: Option<String>,
    pub domain: Option<String>,
    pub title: Option<String>,
    /// Seconds spent on the page. Negative values are treated as zero.
    #[serde(alias = "duration_seconds", deserialize_with = "lenient_signed_seconds")]
    pub duration: i64,
    /// Timestamp as received (RFC 3339 or naive ISO 8601)
    pub timestamp: Option<String>,
    pub is_distraction: bool,
    pub category: Option<String>,
}

impl BrowsingEvent {
    /// Duration clamped at zero
    pub fn duration_secs(&self) -> u64 {
        self.duration.max(0) as u64
    }

    /// Explicit domain if present, otherwise the host of `url`
    pub fn resolved_domain(&self) -> Option<String> {
        resolve_domain(self.domain.as_deref(), self.url.as_deref())
    }

    /// Wall-clock hour (0-23) of the timestamp, if it parses
    pub fn hour(&self) -> Option<u32> {
        self.timestamp.as_deref().and_then(parse_hour)
    }
}

/// Snapshot of what the user is looking at right now
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrentPageState {
    pub url: Option<String>,
    pub title: Option<String>,
    pub domain: Option<String>,
    pub study_topic: Option<String>,
    pub session_active: bool,
    /// Recently visited domains, most recent last
    pub recent_domains: Vec<String>,
}

impl CurrentPageState {
    pub fn new(domain: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            domain: Some(domain.into()),
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn with_study_topic(mut self, topic: impl Into<String>) -> Self {
        self.study_topic = Some(topic.into());
        self
    }

    pub fn with_session(mut self, active: bool) -> Self {
        self.session_active = active;
        self
    }

    /// Set the recent trajectory, keeping only the newest [`MAX_RECENT_DOMAINS`]
    pub fn with_recent_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut recent: Vec<String> = domains.into_iter().map(Into::into).collect();
        if recent.len() > MAX_RECENT_DOMAINS {
            recent.drain(..recent.len() - MAX_RECENT_DOMAINS);
        }
        self.recent_domains = recent;
        self
    }

    pub fn resolved_domain(&self) -> Option<String> {
        resolve_domain(self.domain.as_deref(), self.url.as_deref())
    }
}

/// Outcome of classifying a page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Study,
    Distraction,
    #[default]
    Neutral,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Study => "study",
            Classification::Distraction => "distraction",
            Classification::Neutral => "neutral",
        }
    }
}

/// Result of context scoring.
///
/// Deserializing a partial object fills missing fields with neutral values,
/// so an empty context never triggers an intervention.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationResult {
    pub classification: Classification,
    /// 0.0 - 1.0
    pub confidence: f64,
    /// 0.0 - 1.0, token overlap with the active study topic
    pub topic_relevance: f64,
    /// -1.0 (distraction) to 1.0 (focused)
    pub context_score: f64,
    /// Human-readable explanations in evaluation order
    pub reasons: Vec<String>,
    #[serde(alias = "is_adult")]
    pub is_severe: bool,
}

/// Kind of mined behavioral pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    TimeVulnerability,
    HighRiskDomains,
    DistractionChain,
    LongDwell,
}

impl PatternKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::TimeVulnerability => "time_vulnerability",
            PatternKind::HighRiskDomains => "high_risk_domains",
            PatternKind::DistractionChain => "distraction_chain",
            PatternKind::LongDwell => "long_dwell",
        }
    }
}

/// A discovered behavioral pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    #[serde(rename = "type")]
    pub kind: PatternKind,
    pub description: String,
    /// 0.0 - 1.0
    pub confidence: f64,
    pub data: serde_json::Value,
}

/// Everything mined from one history window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternReport {
    pub patterns: Vec<Pattern>,
    /// Hour (0-23) → distraction share of time
    pub hourly_vulnerability: BTreeMap<u32, f64>,
    /// Domain → distraction share of time
    pub domain_risk_scores: BTreeMap<String, f64>,
    /// Frequent distraction sequences, trigrams first
    pub distraction_chains: Vec<Vec<String>>,
}

impl PatternReport {
    pub fn risk_for(&self, domain: &str) -> Option<f64> {
        self.domain_risk_scores.get(domain).copied()
    }

    /// Domain risks sorted by risk descending, ties by domain name
    pub fn ranked_domain_risks(&self) -> Vec<(&str, f64)> {
        let mut ranked: Vec<(&str, f64)> = self
            .domain_risk_scores
            .iter()
            .map(|(domain, risk)| (domain.as_str(), *risk))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }

    pub fn has_pattern(&self, kind: PatternKind) -> bool {
        self.patterns.iter().any(|p| p.kind == kind)
    }
}

/// Intervention escalation level, ordered by severity
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum InterventionLevel {
    #[default]
    None,
    Nudge,
    Warn,
    SoftBlock,
    HardBlock,
}

impl InterventionLevel {
    /// Levels that actually intervene, mildest first
    pub const ACTIVE: [InterventionLevel; 4] = [
        InterventionLevel::Nudge,
        InterventionLevel::Warn,
        InterventionLevel::SoftBlock,
        InterventionLevel::HardBlock,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InterventionLevel::None => "none",
            InterventionLevel::Nudge => "nudge",
            InterventionLevel::Warn => "warn",
            InterventionLevel::SoftBlock => "soft_block",
            InterventionLevel::HardBlock => "hard_block",
        }
    }

    pub fn urgency(&self) -> f64 {
        match self {
            InterventionLevel::None => 0.0,
            InterventionLevel::Nudge => 0.3,
            InterventionLevel::Warn => 0.6,
            InterventionLevel::SoftBlock => 0.8,
            InterventionLevel::HardBlock => 1.0,
        }
    }

    /// Seconds the caller should wait before checking again.
    ///
    /// A hard block is persistent, so it re-checks immediately.
    pub fn cooldown_seconds(&self) -> u64 {
        match self {
            InterventionLevel::None => 30,
            InterventionLevel::Nudge => 60,
            InterventionLevel::Warn => 30,
            InterventionLevel::SoftBlock => 15,
            InterventionLevel::HardBlock => 0,
        }
    }
}

/// Whether and how strongly to intervene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionDecision {
    pub should_intervene: bool,
    pub level: InterventionLevel,
    pub message: String,
    /// 0.0 - 1.0
    pub urgency: f64,
    pub cooldown_seconds: u64,
}

impl InterventionDecision {
    /// A decision that does not intervene
    pub fn none(cooldown_seconds: u64) -> Self {
        Self {
            should_intervene: false,
            level: InterventionLevel::None,
            message: String::new(),
            urgency: 0.0,
            cooldown_seconds,
        }
    }
}

/// Input to the intervention policy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionRequest {
    pub context: ClassificationResult,
    pub patterns: PatternReport,
    pub dwell_seconds: u64,
    pub domain: Option<String>,
    pub session_active: bool,
    /// Interventions already issued today, used for message rotation
    pub interventions_today: u32,
}

/// Full request for one coordinated decision
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorRequest {
    pub current_url: Option<String>,
    pub current_title: Option<String>,
    pub current_domain: Option<String>,
    #[serde(alias = "dwell_seconds", deserialize_with = "lenient_seconds")]
    pub time_on_current_seconds: u64,
    pub study_topic: Option<String>,
    pub session_active: bool,
    pub recent_domains: Vec<String>,
    pub historical_events: Vec<BrowsingEvent>,
    pub interventions_today: u32,
}

impl CoordinatorRequest {
    /// Page state handed to the context scorer
    pub fn page_state(&self) -> CurrentPageState {
        CurrentPageState {
            url: self.current_url.clone(),
            title: self.current_title.clone(),
            domain: self.current_domain.clone(),
            study_topic: self.study_topic.clone(),
            session_active: self.session_active,
            recent_domains: Vec::new(),
        }
        .with_recent_domains(self.recent_domains.iter().cloned())
    }
}

/// Combined result of one coordinated run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorOutput {
    pub analysis_id: Uuid,
    pub computed_at: DateTime<Utc>,
    pub decision: InterventionDecision,
    pub context: ClassificationResult,
    pub patterns: PatternReport,
}

fn resolve_domain(domain: Option<&str>, url: Option<&str>) -> Option<String> {
    match domain.and_then(normalize_host) {
        Some(host) => Some(host),
        None => url.and_then(crate::classify::extract_domain),
    }
}

/// Parse the wall-clock hour from an RFC 3339 or naive ISO 8601 timestamp.
///
/// The hour is taken as written; offsets are not converted to UTC.
pub fn parse_hour(timestamp: &str) -> Option<u32> {
    let timestamp = timestamp.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(dt.hour());
    }
    const NAIVE_FORMATS: [&str; 3] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
    ];
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(timestamp, fmt).ok())
        .map(|dt| dt.hour())
}

/// Read a dwell time from whatever number-like value a client sent.
///
/// Integers pass through, floats truncate, numeric strings parse, and
/// negatives, `null` or anything else become zero.
pub(crate) fn lenient_seconds<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(seconds_from_value(&value))
}

/// Signed variant of [`lenient_seconds`] for fields kept as `i64`
pub(crate) fn lenient_signed_seconds<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_seconds(deserializer).map(|secs| i64::try_from(secs).unwrap_or(i64::MAX))
}

fn seconds_from_value(value: &serde_json::Value) -> u64 {
    let from_float = |f: f64| if f.is_finite() && f > 0.0 { f.trunc() as u64 } else { 0 };
    match value {
        serde_json::Value::Number(n) => n.as_u64().unwrap_or_else(|| n.as_f64().map_or(0, from_float)),
        serde_json::Value::String(s) => s.trim().parse::<f64>().map_or(0, from_float),
        _ => 0,
    }
}

/// Round to three decimals for reporting
pub(crate) fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lenient_durations() {
        let parse = |raw: &str| serde_json::from_str::<BrowsingEvent>(raw).unwrap().duration;
        assert_eq!(parse(r#"{"duration": 42}"#), 42);
        assert_eq!(parse(r#"{"duration": 12.9}"#), 12);
        assert_eq!(parse(r#"{"duration": -7}"#), 0);
        assert_eq!(parse(r#"{"duration": -2.5}"#), 0);
        assert_eq!(parse(r#"{"duration": null}"#), 0);
        assert_eq!(parse(r#"{"duration_seconds": "90"}"#), 90);
        assert_eq!(parse(r#"{"duration": "soon"}"#), 0);
        assert_eq!(parse(r#"{}"#), 0);

        let request: CoordinatorRequest =
            serde_json::from_str(r#"{"dwell_seconds": 95.7}"#).unwrap();
        assert_eq!(request.time_on_current_seconds, 95);
        let request: CoordinatorRequest =
            serde_json::from_str(r#"{"time_on_current_seconds": null}"#).unwrap();
        assert_eq!(request.time_on_current_seconds, 0);
    }

    #[test]
    fn test_parse_hour_formats() {
        assert_eq!(parse_hour("2026-02-24T10:05:00"), Some(10));
        assert_eq!(parse_hour("2026-02-24T14:30:00.123"), Some(14));
        assert_eq!(parse_hour("2026-02-24 09:00:00"), Some(9));
        assert_eq!(parse_hour("2026-02-24T23:59:59+05:30"), Some(23));
        assert_eq!(parse_hour("2026-02-24T07:15:00Z"), Some(7));
        assert_eq!(parse_hour("2026-02-24T18:45"), Some(18));
        assert_eq!(parse_hour("yesterday"), None);
        assert_eq!(parse_hour(""), None);
    }

    #[test]
    fn test_event_duration_never_negative() {
        let event = BrowsingEvent {
            duration: -40,
            ..Default::default()
        };
        assert_eq!(event.duration_secs(), 0);
    }

    #[test]
    fn test_event_domain_falls_back_to_url() {
        let event = BrowsingEvent {
            url: Some("https://www.Reddit.com/r/rust".to_string()),
            ..Default::default()
        };
        assert_eq!(event.resolved_domain().as_deref(), Some("reddit.com"));

        let explicit = BrowsingEvent {
            url: Some("https://reddit.com/".to_string()),
            domain: Some("github.com".to_string()),
            ..Default::default()
        };
        assert_eq!(explicit.resolved_domain().as_deref(), Some("github.com"));
    }

    #[test]
    fn test_event_accepts_duration_seconds_alias() {
        let json = r#"{"domain": "youtube.com", "duration_seconds": 180, "is_distraction": true}"#;
        let event: BrowsingEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.duration_secs(), 180);
        assert!(event.is_distraction);
        assert_eq!(event.hour(), None);
    }

    #[test]
    fn test_recent_domains_are_bounded() {
        let domains: Vec<String> = (0..30).map(|i| format!("site{i}.com")).collect();
        let state = CurrentPageState::default().with_recent_domains(domains);
        assert_eq!(state.recent_domains.len(), MAX_RECENT_DOMAINS);
        assert_eq!(state.recent_domains.last().map(String::as_str), Some("site29.com"));
        assert_eq!(state.recent_domains[0], "site10.com");
    }

    #[test]
    fn test_partial_classification_defaults_to_neutral() {
        let parsed: ClassificationResult = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.classification, Classification::Neutral);
        assert_eq!(parsed.confidence, 0.0);
    }

    #[test]
    fn test_levels_are_ordered() {
        assert!(InterventionLevel::None < InterventionLevel::Nudge);
        assert!(InterventionLevel::Nudge < InterventionLevel::Warn);
        assert!(InterventionLevel::Warn < InterventionLevel::SoftBlock);
        assert!(InterventionLevel::SoftBlock < InterventionLevel::HardBlock);
    }

    #[test]
    fn test_level_serializes_snake_case() {
        let json = serde_json::to_string(&InterventionLevel::SoftBlock).unwrap();
        assert_eq!(json, "\"soft_block\"");
    }

    #[test]
    fn test_ranked_domain_risks() {
        let mut report = PatternReport::default();
        report.domain_risk_scores.insert("a.com".to_string(), 0.2);
        report.domain_risk_scores.insert("b.com".to_string(), 0.9);
        report.domain_risk_scores.insert("c.com".to_string(), 0.9);

        let ranked = report.ranked_domain_risks();
        assert_eq!(ranked, vec![("b.com", 0.9), ("c.com", 0.9), ("a.com", 0.2)]);
        assert_eq!(report.risk_for("a.com"), Some(0.2));
        assert_eq!(report.risk_for("missing.com"), None);
    }
}
