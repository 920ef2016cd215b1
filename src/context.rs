//! Context scoring
//!
//! Combines domain and title signals with override, topic-relevance, session
//! and trajectory rules into one classification. The key idea is that content
//! can flip a domain's reputation: a lecture on a video site is study, a meme
//! thread on a developer forum is not.

use crate::agent::Agent;
use crate::catalog::{DomainCatalog, DomainCategory, KeywordCatalog};
use crate::classify::{
    normalize_host, BoundedSemantic, CompiledKeywords, DomainClassifier, TitleClassifier,
    TitleScore, TitleSignal, TitleVerdict,
};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::types::{round3, Classification, ClassificationResult, CurrentPageState};
use log::debug;
use std::collections::HashSet;
use std::sync::Arc;

/// Context score above which a page is study
const STUDY_CUTOFF: f64 = 0.2;
/// Context score below which a page is distraction
const DISTRACTION_CUTOFF: f64 = -0.2;
/// Topic overlap needed for a relevance boost
const TOPIC_RELEVANCE_CUTOFF: f64 = 0.3;
/// Recent domains considered for the trajectory
const TRAJECTORY_WINDOW: usize = 5;
/// Signal added on an ambiguous domain when the content says nothing
const AMBIGUOUS_DEFAULT_SIGNAL: f64 = -0.8;

const STOP_WORDS: [&str; 17] = [
    "the", "a", "an", "in", "on", "at", "to", "for", "of", "and", "or", "is", "it", "with", "-",
    "|", "—",
];

/// Classifies the current page as study, distraction, or neutral
#[derive(Debug, Clone)]
pub struct ContextScorer {
    domains: DomainClassifier,
    titles: TitleClassifier,
}

impl Default for ContextScorer {
    fn default() -> Self {
        let keywords = CompiledKeywords::compile(&KeywordCatalog::default())
            .expect("built-in keyword patterns compile");
        Self::new(DomainClassifier::default(), TitleClassifier::new(keywords))
    }
}

impl ContextScorer {
    pub fn new(domains: DomainClassifier, titles: TitleClassifier) -> Self {
        Self { domains, titles }
    }

    /// Build from configuration, optionally with a semantic collaborator
    pub fn from_config(
        config: &EngineConfig,
        semantic: Option<BoundedSemantic>,
    ) -> Result<Self, EngineError> {
        Self::with_catalog(
            Arc::new(config.resolved_domains()),
            &config.resolved_keywords(),
            semantic,
        )
    }

    /// Build around a catalog shared with other components
    pub fn with_catalog(
        catalog: Arc<DomainCatalog>,
        keywords: &KeywordCatalog,
        semantic: Option<BoundedSemantic>,
    ) -> Result<Self, EngineError> {
        let keywords = CompiledKeywords::compile(keywords)?;
        let mut titles = TitleClassifier::new(keywords);
        if let Some(semantic) = semantic {
            titles = titles.with_semantic(semantic);
        }
        Ok(Self::new(DomainClassifier::new(catalog), titles))
    }

    pub fn catalog(&self) -> &DomainCatalog {
        self.domains.catalog()
    }

    pub fn classify(&self, page: &CurrentPageState) -> ClassificationResult {
        let domain = page.resolved_domain();
        let domain_label = domain.as_deref().unwrap_or("unknown");
        let title = page.title.as_deref().unwrap_or("").trim();

        let mut reasons: Vec<String> = Vec::new();
        let mut signals: Vec<f64> = Vec::new();

        // 1. Domain
        let category = self.domains.category(domain.as_deref());
        let domain_score = self.domains.score(domain.as_deref());
        signals.push(domain_score);
        if domain_score > 0.0 {
            reasons.push(format!(
                "Domain '{domain_label}' is associated with study/productivity"
            ));
        } else if domain_score < 0.0 {
            reasons.push(format!("Domain '{domain_label}' is typically a distraction"));
        }

        // 2. Title
        let TitleScore {
            score: title_score,
            signal,
        } = self.titles.evaluate(title, category);
        signals.push(title_score);
        match signal {
            TitleSignal::Semantic(TitleVerdict::Distraction) => reasons.push(
                "AI determined the video/page content is entertainment or distracting".to_string(),
            ),
            TitleSignal::Semantic(_) => reasons.push(
                "AI determined the video/page content is study or academic material".to_string(),
            ),
            TitleSignal::Keywords | TitleSignal::Severe if title_score > 0.0 => {
                reasons.push("Page title contains study-related keywords".to_string())
            }
            TitleSignal::Keywords | TitleSignal::Severe => {
                reasons.push("Page title contains distraction-related keywords".to_string())
            }
            TitleSignal::None => {}
        }

        if category == Some(DomainCategory::Ambiguous) && signal == TitleSignal::None {
            signals.push(AMBIGUOUS_DEFAULT_SIGNAL);
            reasons.push(format!(
                "Content on '{domain_label}' could not be confirmed as study material"
            ));
        }

        // 3. Content overrides the domain's reputation
        if domain_score <= 0.0 && title_score > 0.0 {
            signals.push(1.0 + title_score);
            reasons.push(format!(
                "Study content detected on '{domain_label}': title suggests academic use"
            ));
        } else if domain_score >= 0.0 && title_score < 0.0 {
            signals.push(-0.8 + title_score);
            reasons.push(format!(
                "Distraction content detected on '{domain_label}': title suggests non-academic use"
            ));
        }

        // 4. Topic relevance
        let mut topic_relevance = 0.0;
        if let Some(topic) = page.study_topic.as_deref().filter(|t| !t.trim().is_empty()) {
            if !title.is_empty() {
                topic_relevance = topic_overlap(topic, title);
                if topic_relevance > TOPIC_RELEVANCE_CUTOFF {
                    signals.push(if domain_score < 0.0 { 0.8 } else { 0.5 });
                    reasons.push(format!("Page is relevant to study topic '{topic}'"));
                }
            }
        }

        // 5. Session penalty
        if page.session_active && domain_score < 0.0 && title_score <= 0.0 {
            signals.push(-0.3);
            reasons.push("Distraction detected during an active study session".to_string());
        }

        // 6. Trajectory
        let trajectory = self.trajectory(&page.recent_domains);
        if trajectory.abs() > 0.1 {
            signals.push(trajectory * 0.5);
            if trajectory < 0.0 {
                reasons.push("Recent browsing trend is shifting toward distractions".to_string());
            } else {
                reasons.push("Recent browsing trend is focused on study content".to_string());
            }
        }

        // 7. Severe content bypasses aggregation
        let is_severe = domain_score <= -2.0 || title_score <= -2.0;
        let result = if is_severe {
            reasons.push("Explicit/adult content detected".to_string());
            ClassificationResult {
                classification: Classification::Distraction,
                confidence: 1.0,
                topic_relevance: round3(topic_relevance),
                context_score: -1.0,
                reasons,
                is_severe: true,
            }
        } else {
            // 8. Aggregate
            let mean = signals.iter().sum::<f64>() / signals.len() as f64;
            let context_score = mean.clamp(-1.0, 1.0);
            let classification = if context_score > STUDY_CUTOFF {
                Classification::Study
            } else if context_score < DISTRACTION_CUTOFF {
                Classification::Distraction
            } else {
                Classification::Neutral
            };

            ClassificationResult {
                classification,
                confidence: round3((context_score.abs() * 1.5).min(1.0)),
                topic_relevance: round3(topic_relevance),
                context_score: round3(context_score),
                reasons,
                is_severe: false,
            }
        };

        debug!(
            "context {} → {} (score {}, {} signals)",
            domain_label,
            result.classification.as_str(),
            result.context_score,
            signals.len()
        );
        result
    }

    /// Position-weighted trend of the last five domains: +1 study, -1 distraction.
    ///
    /// Domains are looked up like the current page, so subdomains count.
    fn trajectory(&self, recent: &[String]) -> f64 {
        let window = &recent[recent.len().saturating_sub(TRAJECTORY_WINDOW)..];
        if window.is_empty() {
            return 0.0;
        }

        let mut weighted = 0.0;
        let mut total_weight = 0.0;
        for (i, domain) in window.iter().enumerate() {
            let weight = (i + 1) as f64;
            let value = match normalize_host(domain).and_then(|h| self.catalog().category_of(&h)) {
                Some(DomainCategory::Study) => 1.0,
                Some(DomainCategory::Distraction) => -1.0,
                _ => 0.0,
            };
            weighted += value * weight;
            total_weight += weight;
        }
        weighted / total_weight
    }
}

/// Share of stop-word-filtered topic tokens that also appear in the title
fn topic_overlap(topic: &str, title: &str) -> f64 {
    let tokens = |text: &str| -> HashSet<String> {
        text.to_lowercase()
            .split_whitespace()
            .filter(|w| !STOP_WORDS.contains(w))
            .map(str::to_string)
            .collect()
    };

    let topic_tokens = tokens(topic);
    if topic_tokens.is_empty() {
        return 0.0;
    }
    let title_tokens = tokens(title);
    let overlap = topic_tokens.intersection(&title_tokens).count();
    overlap as f64 / topic_tokens.len() as f64
}

impl Agent<CurrentPageState> for ContextScorer {
    type Output = ClassificationResult;

    fn name(&self) -> &'static str {
        "Context Agent"
    }

    fn analyze(&self, input: &CurrentPageState) -> ClassificationResult {
        self.classify(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{SemanticClassifier, VerdictCache};
    use crate::error::SemanticError;
    use proptest::prelude::*;
    use std::time::Duration;

    fn scorer() -> ContextScorer {
        ContextScorer::default()
    }

    fn classify(domain: &str, title: &str) -> ClassificationResult {
        scorer().classify(&CurrentPageState::new(domain, title))
    }

    #[test]
    fn test_youtube_lecture_is_study() {
        let result = classify("youtube.com", "MIT 6.006 Data Structures Algorithm Lecture 1");
        assert_eq!(result.classification, Classification::Study);
        assert!(result
            .reasons
            .iter()
            .any(|r| r.starts_with("Study content detected on 'youtube.com'")));
    }

    #[test]
    fn test_youtube_generic_title_is_distraction() {
        let result = classify("youtube.com", "YouTube");
        assert_eq!(result.classification, Classification::Distraction);
        assert!(result.confidence >= 0.3);
    }

    #[test]
    fn test_youtube_cat_video_is_distraction() {
        let result = classify("youtube.com", "Funny Cat Compilation 2024");
        assert_eq!(result.classification, Classification::Distraction);
        assert!(result
            .reasons
            .contains(&"Page title contains distraction-related keywords".to_string()));
    }

    #[test]
    fn test_youtube_tutorial_with_topic_is_study() {
        let page = CurrentPageState::new("youtube.com", "Python Machine Learning Tutorial")
            .with_study_topic("machine learning");
        let result = scorer().classify(&page);
        assert_eq!(result.classification, Classification::Study);
        assert_eq!(result.topic_relevance, 1.0);
    }

    #[test]
    fn test_study_domain() {
        let result = classify("github.com", "My Repository");
        assert_eq!(result.classification, Classification::Study);
        assert!(result.confidence > 0.0);
        assert_eq!(
            result.reasons[0],
            "Domain 'github.com' is associated with study/productivity"
        );
    }

    #[test]
    fn test_scholar_with_topic_in_session() {
        let page = CurrentPageState::new("scholar.google.com", "Machine Learning Research Papers")
            .with_study_topic("machine learning")
            .with_session(true);
        let result = scorer().classify(&page);
        assert!(result.topic_relevance > 0.0);
        assert_eq!(result.classification, Classification::Study);
    }

    #[test]
    fn test_distraction_domain() {
        let result = classify("instagram.com", "Instagram");
        assert_eq!(result.classification, Classification::Distraction);
    }

    #[test]
    fn test_reddit_programming_is_not_distraction() {
        let result = classify(
            "reddit.com",
            "Understanding Python programming async await tutorial",
        );
        assert_ne!(result.classification, Classification::Distraction);
    }

    #[test]
    fn test_unknown_domain_without_signals_is_neutral() {
        let result = classify("weather.com", "Weather Forecast");
        assert_eq!(result.classification, Classification::Neutral);
        assert_eq!(result.context_score, 0.0);
        assert_eq!(result.confidence, 0.0);
        assert!(result.reasons.is_empty());
    }

    #[test]
    fn test_severe_domain_forces_block() {
        let page = CurrentPageState::new("pornhub.com", "Linear algebra lecture")
            .with_study_topic("linear algebra")
            .with_recent_domains(["github.com", "arxiv.org"]);
        let result = scorer().classify(&page);
        assert_eq!(result.classification, Classification::Distraction);
        assert_eq!(result.context_score, -1.0);
        assert_eq!(result.confidence, 1.0);
        assert!(result.is_severe);
        assert_eq!(
            result.reasons.last().map(String::as_str),
            Some("Explicit/adult content detected")
        );
    }

    #[test]
    fn test_severe_title_on_study_domain() {
        let result = classify("github.com", "nsfw collection");
        assert!(result.is_severe);
        assert_eq!(result.classification, Classification::Distraction);
    }

    #[test]
    fn test_session_penalty() {
        let page = CurrentPageState::new("facebook.com", "News Feed").with_session(true);
        let result = scorer().classify(&page);
        assert!(result
            .reasons
            .contains(&"Distraction detected during an active study session".to_string()));
        // (-0.8 + 0 - 0.3) / 3
        assert!((result.context_score + 0.367).abs() < 1e-9);
    }

    #[test]
    fn test_trajectory_weighting() {
        let s = scorer();
        // Oldest study, newest distraction: (1*1 + 0*2 + -1*3) / 6
        let t = s.trajectory(&[
            "github.com".to_string(),
            "weather.com".to_string(),
            "instagram.com".to_string(),
        ]);
        assert!((t + 1.0 / 3.0).abs() < 1e-9);

        // Only the last five count
        let mut recent = vec!["instagram.com".to_string(); 10];
        recent.extend(vec!["arxiv.org".to_string(); 5]);
        assert!((s.trajectory(&recent) - 1.0).abs() < 1e-9);

        assert_eq!(s.trajectory(&[]), 0.0);
    }

    #[test]
    fn test_trajectory_matches_subdomains() {
        let s = scorer();
        // Same exact-then-suffix lookup as the domain score: (1*1 + -1*2) / 3
        let t = s.trajectory(&["cs.mit.edu".to_string(), "m.instagram.com".to_string()]);
        assert!((t + 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_trajectory_reason() {
        let page = CurrentPageState::new("weather.com", "Weather")
            .with_recent_domains(["tiktok.com", "instagram.com"]);
        let result = scorer().classify(&page);
        assert_eq!(
            result.reasons,
            vec!["Recent browsing trend is shifting toward distractions".to_string()]
        );
    }

    #[test]
    fn test_topic_overlap() {
        assert_eq!(topic_overlap("machine learning", "Machine Learning Research"), 1.0);
        assert_eq!(topic_overlap("the theory of graphs", "graphs explained"), 0.5);
        assert_eq!(topic_overlap("the of and", "anything"), 0.0);
    }

    #[test]
    fn test_domain_resolved_from_url() {
        let page = CurrentPageState {
            url: Some("https://www.instagram.com/explore".to_string()),
            title: Some("Explore".to_string()),
            ..Default::default()
        };
        let result = scorer().classify(&page);
        assert_eq!(result.classification, Classification::Distraction);
    }

    #[test]
    fn test_empty_page_is_neutral() {
        let result = scorer().classify(&CurrentPageState::default());
        assert_eq!(result.classification, Classification::Neutral);
        assert_eq!(result.context_score, 0.0);
    }

    struct AlwaysStudy;

    impl SemanticClassifier for AlwaysStudy {
        fn classify(&self, _title: &str) -> Result<TitleVerdict, SemanticError> {
            Ok(TitleVerdict::Study)
        }
    }

    #[test]
    fn test_semantic_reason_replaces_keyword_reason() {
        let semantic = BoundedSemantic::new(
            Arc::new(AlwaysStudy),
            Arc::new(VerdictCache::new(4)),
            Duration::from_secs(1),
        );
        let scorer = ContextScorer::from_config(&EngineConfig::default(), Some(semantic)).unwrap();
        let result = scorer.classify(&CurrentPageState::new(
            "youtube.com",
            "Linear algebra lecture 3",
        ));

        assert_eq!(result.classification, Classification::Study);
        assert!(result
            .reasons
            .contains(&"AI determined the video/page content is study or academic material".to_string()));
        assert!(!result
            .reasons
            .contains(&"Page title contains study-related keywords".to_string()));
    }

    proptest! {
        #[test]
        fn prop_context_score_is_clamped(
            domain in prop::sample::select(vec![
                "youtube.com", "github.com", "instagram.com", "weather.com",
                "pornhub.com", "cs.mit.edu", "m.facebook.com", "",
            ]),
            title in "[a-zA-Z ]{0,40}",
            topic in proptest::option::of("[a-z ]{0,20}"),
            session in any::<bool>(),
            recent in prop::collection::vec(
                prop::sample::select(vec!["github.com", "tiktok.com", "weather.com"]),
                0..8,
            ),
        ) {
            let mut page = CurrentPageState::new(domain, title)
                .with_session(session)
                .with_recent_domains(recent);
            page.study_topic = topic;
            let result = scorer().classify(&page);

            prop_assert!(result.context_score >= -1.0 && result.context_score <= 1.0);
            prop_assert!(result.confidence >= 0.0 && result.confidence <= 1.0);
            prop_assert!(result.topic_relevance >= 0.0 && result.topic_relevance <= 1.0);
            if result.is_severe {
                prop_assert_eq!(result.classification, Classification::Distraction);
                prop_assert_eq!(result.context_score, -1.0);
            }
        }
    }
}
