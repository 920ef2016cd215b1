//! Pipeline orchestration
//!
//! This module provides the public API for the decision engine. The
//! [`Coordinator`] composes pattern mining, context scoring and the
//! intervention policy into one call; the `*_json` functions wrap the same
//! operations for callers that speak JSON.

use crate::agent::Agent;
use crate::catalog::DomainCatalog;
use crate::classify::{BoundedSemantic, SemanticClassifier, VerdictCache};
use crate::config::EngineConfig;
use crate::context::ContextScorer;
use crate::error::EngineError;
use crate::intervention::InterventionPolicy;
use crate::patterns::PatternAnalyzer;
use crate::types::{
    BrowsingEvent, ClassificationResult, CoordinatorOutput, CoordinatorRequest, CurrentPageState,
    DecisionRequest, InterventionDecision, PatternReport,
};
use chrono::Utc;
use log::debug;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use uuid::Uuid;

type PatternAgent = Box<dyn Agent<[BrowsingEvent], Output = PatternReport>>;
type ContextAgent = Box<dyn Agent<CurrentPageState, Output = ClassificationResult>>;
type PolicyAgent = Box<dyn Agent<DecisionRequest, Output = InterventionDecision>>;

/// Run one coordinated decision from a JSON [`CoordinatorRequest`].
///
/// Uses the built-in configuration. Returns the [`CoordinatorOutput`] as JSON.
///
/// # Example
/// ```ignore
/// let output = coordinate_json(r#"{"current_domain": "youtube.com", "time_on_current_seconds": 90}"#)?;
/// ```
pub fn coordinate_json(request_json: &str) -> Result<String, EngineError> {
    builtin().coordinate_json(request_json)
}

/// Classify a JSON [`CurrentPageState`] with the built-in configuration
pub fn classify_json(page_json: &str) -> Result<String, EngineError> {
    builtin().classify_json(page_json)
}

/// Mine patterns from a JSON array of [`BrowsingEvent`]s with the built-in configuration
pub fn analyze_json(events_json: &str) -> Result<String, EngineError> {
    builtin().analyze_json(events_json)
}

/// Coordinator over the built-in configuration, built on first use
fn builtin() -> &'static Coordinator {
    static BUILTIN: OnceLock<Coordinator> = OnceLock::new();
    BUILTIN.get_or_init(Coordinator::default)
}

/// Composes the pattern, context and intervention agents.
///
/// Stages run in a fixed order: patterns from history, then context for the
/// current page, then the policy over both. The coordinator adds no
/// heuristics of its own.
pub struct Coordinator {
    patterns: PatternAgent,
    context: ContextAgent,
    policy: PolicyAgent,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("agents", &self.agents())
            .finish()
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::with_agents(
            PatternAnalyzer::default(),
            ContextScorer::default(),
            InterventionPolicy::default(),
        )
    }
}

impl Coordinator {
    /// Assemble from any agent implementations
    pub fn with_agents(
        patterns: impl Agent<[BrowsingEvent], Output = PatternReport> + 'static,
        context: impl Agent<CurrentPageState, Output = ClassificationResult> + 'static,
        policy: impl Agent<DecisionRequest, Output = InterventionDecision> + 'static,
    ) -> Self {
        Self {
            patterns: Box::new(patterns),
            context: Box::new(context),
            policy: Box::new(policy),
        }
    }

    /// Build the standard agents from configuration
    pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        Self::builder(config.clone()).build()
    }

    pub fn builder(config: EngineConfig) -> CoordinatorBuilder {
        CoordinatorBuilder {
            config,
            semantic: None,
            cache: None,
        }
    }

    /// Names of the pattern, context and policy agents, in call order
    pub fn agents(&self) -> [&'static str; 3] {
        [
            self.patterns.name(),
            self.context.name(),
            self.policy.name(),
        ]
    }

    pub fn classify(&self, page: &CurrentPageState) -> ClassificationResult {
        self.context.analyze(page)
    }

    pub fn analyze_history(&self, events: &[BrowsingEvent]) -> PatternReport {
        self.patterns.analyze(events)
    }

    pub fn decide(&self, request: &DecisionRequest) -> InterventionDecision {
        self.policy.analyze(request)
    }

    /// Patterns, then context, then the decision over both
    pub fn coordinate(&self, request: &CoordinatorRequest) -> CoordinatorOutput {
        let patterns = self.patterns.analyze(&request.historical_events);
        debug!(
            "patterns: {} found in {} events",
            patterns.patterns.len(),
            request.historical_events.len()
        );

        let page = request.page_state();
        let context = self.context.analyze(&page);

        let decision_request = DecisionRequest {
            context,
            patterns,
            dwell_seconds: request.time_on_current_seconds,
            domain: page.resolved_domain(),
            session_active: request.session_active,
            interventions_today: request.interventions_today,
        };
        let decision = self.policy.analyze(&decision_request);
        debug!(
            "decision: {} (intervene: {})",
            decision.level.as_str(),
            decision.should_intervene
        );

        let DecisionRequest {
            context, patterns, ..
        } = decision_request;

        CoordinatorOutput {
            analysis_id: Uuid::new_v4(),
            computed_at: Utc::now(),
            decision,
            context,
            patterns,
        }
    }

    pub fn coordinate_json(&self, request_json: &str) -> Result<String, EngineError> {
        let request: CoordinatorRequest = serde_json::from_str(request_json)?;
        Ok(serde_json::to_string(&self.coordinate(&request))?)
    }

    pub fn classify_json(&self, page_json: &str) -> Result<String, EngineError> {
        let page: CurrentPageState = serde_json::from_str(page_json)?;
        Ok(serde_json::to_string(&self.classify(&page))?)
    }

    pub fn analyze_json(&self, events_json: &str) -> Result<String, EngineError> {
        let events: Vec<BrowsingEvent> = serde_json::from_str(events_json)?;
        Ok(serde_json::to_string(&self.analyze_history(&events))?)
    }
}

impl Agent<CoordinatorRequest> for Coordinator {
    type Output = CoordinatorOutput;

    fn name(&self) -> &'static str {
        "Coordinator Agent"
    }

    fn analyze(&self, input: &CoordinatorRequest) -> CoordinatorOutput {
        self.coordinate(input)
    }
}

/// Builds a [`Coordinator`] from configuration plus optional collaborators
pub struct CoordinatorBuilder {
    config: EngineConfig,
    semantic: Option<Arc<dyn SemanticClassifier>>,
    cache: Option<Arc<VerdictCache>>,
}

impl CoordinatorBuilder {
    /// Consult this classifier for titles on ambiguous domains
    pub fn semantic_classifier(mut self, classifier: Arc<dyn SemanticClassifier>) -> Self {
        self.semantic = Some(classifier);
        self
    }

    /// Share a verdict cache across coordinators; defaults to a fresh one
    pub fn verdict_cache(mut self, cache: Arc<VerdictCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn build(self) -> Result<Coordinator, EngineError> {
        let config = self.config;
        config.validate()?;

        let semantic = self.semantic.map(|classifier| {
            let cache = self
                .cache
                .unwrap_or_else(|| Arc::new(VerdictCache::new(config.verdict_cache_capacity)));
            BoundedSemantic::new(
                classifier,
                cache,
                Duration::from_millis(config.semantic_timeout_ms),
            )
        });

        let catalog: Arc<DomainCatalog> = Arc::new(config.resolved_domains());
        let context =
            ContextScorer::with_catalog(Arc::clone(&catalog), &config.resolved_keywords(), semantic)?;
        let patterns = PatternAnalyzer::new(catalog, config.long_dwell_seconds)
            .with_history_domains(config.resolved_history_domains());
        let policy = InterventionPolicy::new(config.thresholds, config.messages);

        Ok(Coordinator::with_agents(patterns, context, policy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::TitleVerdict;
    use crate::config::CatalogExtension;
    use crate::error::SemanticError;
    use crate::types::{Classification, InterventionLevel};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn history_event(domain: &str, duration: i64, is_distraction: bool) -> BrowsingEvent {
        BrowsingEvent {
            domain: Some(domain.to_string()),
            duration,
            timestamp: Some("2026-02-24T15:00:00".to_string()),
            is_distraction,
            ..Default::default()
        }
    }

    fn sample_request() -> CoordinatorRequest {
        CoordinatorRequest {
            current_url: Some("https://www.youtube.com/watch?v=abc".to_string()),
            current_title: Some("Funny Cat Compilation".to_string()),
            time_on_current_seconds: 130,
            historical_events: vec![
                history_event("youtube.com", 300, true),
                history_event("youtube.com", 300, true),
                history_event("youtube.com", 300, true),
                history_event("youtube.com", 100, false),
            ],
            ..Default::default()
        }
    }

    struct FixedVerdict {
        calls: AtomicUsize,
        verdict: TitleVerdict,
    }

    impl SemanticClassifier for FixedVerdict {
        fn classify(&self, _title: &str) -> Result<TitleVerdict, SemanticError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.verdict)
        }
    }

    /// Pattern agent that reports every domain as maximally risky
    struct AlwaysRisky;

    impl Agent<[BrowsingEvent]> for AlwaysRisky {
        type Output = PatternReport;

        fn name(&self) -> &'static str {
            "Always Risky"
        }

        fn analyze(&self, _input: &[BrowsingEvent]) -> PatternReport {
            PatternReport {
                domain_risk_scores: [("youtube.com".to_string(), 1.0)].into(),
                ..Default::default()
            }
        }
    }

    #[test]
    fn test_full_pipeline() {
        let output = Coordinator::default().coordinate(&sample_request());

        assert_eq!(output.context.classification, Classification::Distraction);
        // youtube.com counts as distraction in history even when unflagged
        assert_eq!(output.patterns.risk_for("youtube.com"), Some(1.0));
        assert_eq!(output.decision.level, InterventionLevel::Warn);
        assert!(output.decision.should_intervene);
        assert!(output.decision.message.contains("2m 10s"));
    }

    #[test]
    fn test_empty_request_is_neutral() {
        let output = Coordinator::default().coordinate(&CoordinatorRequest::default());
        assert_eq!(output.context.classification, Classification::Neutral);
        assert!(output.patterns.patterns.is_empty());
        assert!(!output.decision.should_intervene);
    }

    #[test]
    fn test_each_run_has_its_own_analysis_id() {
        let coordinator = Coordinator::default();
        let a = coordinator.coordinate(&sample_request());
        let b = coordinator.coordinate(&sample_request());
        assert_ne!(a.analysis_id, b.analysis_id);
        assert!(b.computed_at >= a.computed_at);
    }

    #[test]
    fn test_agent_names() {
        let coordinator = Coordinator::default();
        assert_eq!(
            coordinator.agents(),
            ["Pattern Agent", "Context Agent", "Intervention Agent"]
        );
        assert_eq!(coordinator.name(), "Coordinator Agent");
    }

    #[test]
    fn test_pattern_agent_can_be_swapped() {
        let coordinator = Coordinator::with_agents(
            AlwaysRisky,
            ContextScorer::default(),
            InterventionPolicy::default(),
        );
        let mut request = sample_request();
        request.historical_events.clear();
        // risk 1.0 halves the warn threshold to 60s
        request.time_on_current_seconds = 61;

        let output = coordinator.coordinate(&request);
        assert_eq!(coordinator.agents()[0], "Always Risky");
        assert_eq!(output.decision.level, InterventionLevel::Warn);
    }

    #[test]
    fn test_builder_applies_config() {
        let config = EngineConfig {
            extend: CatalogExtension {
                distraction_domains: vec!["example-games.io".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };
        let coordinator = Coordinator::from_config(&config).unwrap();

        let page = CurrentPageState::new("example-games.io", "Level 3");
        assert_eq!(
            coordinator.classify(&page).classification,
            Classification::Distraction
        );
        // The pattern agent sees the same catalog
        let report = coordinator.analyze_history(&[history_event("example-games.io", 60, false)]);
        assert_eq!(report.risk_for("example-games.io"), Some(1.0));
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let mut config = EngineConfig::default();
        config.thresholds.warn = 10;
        let err = Coordinator::builder(config).build().unwrap_err();
        assert!(matches!(err, EngineError::InvalidThresholds(_)));
    }

    #[test]
    fn test_semantic_classifier_with_shared_cache() {
        let classifier = Arc::new(FixedVerdict {
            calls: AtomicUsize::new(0),
            verdict: TitleVerdict::Study,
        });
        let cache = Arc::new(VerdictCache::new(16));

        let build = || {
            Coordinator::builder(EngineConfig::default())
                .semantic_classifier(classifier.clone())
                .verdict_cache(Arc::clone(&cache))
                .build()
                .unwrap()
        };
        let first = build();
        let second = build();

        let page = CurrentPageState::new("youtube.com", "Building a compiler from scratch");
        let a = first.classify(&page);
        let b = second.classify(&page);

        assert_eq!(a.classification, Classification::Study);
        assert_eq!(a, b);
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
        assert!(a.reasons.iter().any(|r| r.starts_with("AI determined")));
    }

    #[test]
    fn test_coordinate_json() {
        let raw = r#"{
            "current_domain": "instagram.com",
            "current_title": "Reels",
            "dwell_seconds": 400,
            "session_active": true
        }"#;
        let output: serde_json::Value = serde_json::from_str(&coordinate_json(raw).unwrap()).unwrap();

        assert_eq!(output["context"]["classification"], "distraction");
        assert_eq!(output["decision"]["level"], "hard_block");
        assert!(output["analysis_id"].as_str().is_some());
    }

    #[test]
    fn test_classify_and_analyze_json() {
        let classified: serde_json::Value = serde_json::from_str(
            &classify_json(r#"{"domain": "github.com", "title": "Pull requests"}"#).unwrap(),
        )
        .unwrap();
        assert_eq!(classified["classification"], "study");

        let report: serde_json::Value = serde_json::from_str(&analyze_json("[]").unwrap()).unwrap();
        assert_eq!(report["patterns"], serde_json::json!([]));
    }

    #[test]
    fn test_json_durations_are_lenient() {
        let report: serde_json::Value = serde_json::from_str(
            &analyze_json(
                r#"[
                    {"domain": "youtube.com", "duration": 12.5, "is_distraction": true},
                    {"domain": "github.com", "duration": null},
                    {"domain": "github.com", "duration_seconds": -30}
                ]"#,
            )
            .unwrap(),
        )
        .unwrap();
        assert_eq!(report["domain_risk_scores"]["youtube.com"], 1.0);
        assert!(report["domain_risk_scores"].get("github.com").is_none());

        let raw = r#"{
            "current_domain": "instagram.com",
            "current_title": "Reels",
            "time_on_current_seconds": 400.9,
            "historical_events": [{"domain": "instagram.com", "duration": "45.2"}]
        }"#;
        let output: serde_json::Value =
            serde_json::from_str(&coordinate_json(raw).unwrap()).unwrap();
        assert_eq!(output["context"]["classification"], "distraction");
        assert_eq!(output["patterns"]["domain_risk_scores"]["instagram.com"], 1.0);
        assert_eq!(output["decision"]["should_intervene"], true);

        let negative = coordinate_json(r#"{"current_domain": "instagram.com", "dwell_seconds": -5}"#)
            .unwrap();
        let output: serde_json::Value = serde_json::from_str(&negative).unwrap();
        assert_eq!(output["decision"]["should_intervene"], false);
    }

    #[test]
    fn test_builtin_coordinator_is_shared() {
        assert!(std::ptr::eq(builtin(), builtin()));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            coordinate_json("{not json"),
            Err(EngineError::JsonError(_))
        ));
        assert!(analyze_json(r#"{"events": 3}"#).is_err());
    }
}
