//! Labeling of ingested visits
//!
//! Turns a raw visit reported by a client into a [`BrowsingEvent`] whose
//! distraction flag and category are derived from the context scorer, so the
//! stored history feeds the pattern analyzer consistently.

use crate::catalog::DomainCategory;
use crate::context::ContextScorer;
use crate::types::{lenient_signed_seconds, BrowsingEvent, Classification, CurrentPageState};
use serde::{Deserialize, Serialize};

/// Minimum distraction score for a visit to a listed distraction domain
const LISTED_DISTRACTION_SCORE: f64 = 0.7;

/// A visit as reported by a client, before labeling
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawVisit {
    pub url: Option<String>,
    pub domain: Option<String>,
    pub title: Option<String>,
    #[serde(alias = "duration_seconds", deserialize_with = "lenient_signed_seconds")]
    pub duration: i64,
    pub timestamp: Option<String>,
    pub category: Option<String>,
    pub session_active: bool,
}

/// A labeled event plus the scores that produced its label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledEvent {
    #[serde(flatten)]
    pub event: BrowsingEvent,
    /// 0.0 - 1.0
    pub distraction_score: f64,
    pub classification: Classification,
}

/// Labels raw visits with the context scorer
#[derive(Debug, Clone, Default)]
pub struct EventLabeler {
    scorer: ContextScorer,
}

impl EventLabeler {
    pub fn new(scorer: ContextScorer) -> Self {
        Self { scorer }
    }

    pub fn label(&self, visit: &RawVisit) -> LabeledEvent {
        let page = CurrentPageState {
            url: visit.url.clone(),
            title: visit.title.clone(),
            domain: visit.domain.clone(),
            session_active: visit.session_active,
            ..Default::default()
        };
        let result = self.scorer.classify(&page);
        let domain = page.resolved_domain();

        let mut is_distraction = result.classification == Classification::Distraction;
        let mut distraction_score = (-result.context_score).max(0.0);

        let listed = domain
            .as_deref()
            .and_then(|d| self.scorer.catalog().category_of(d))
            == Some(DomainCategory::Distraction);
        if !is_distraction && listed {
            is_distraction = true;
            distraction_score = distraction_score.max(LISTED_DISTRACTION_SCORE);
        }

        let category = visit
            .category
            .clone()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| result.classification.as_str().to_string());

        LabeledEvent {
            event: BrowsingEvent {
                url: visit.url.clone(),
                domain,
                title: visit.title.clone(),
                duration: visit.duration.max(0),
                timestamp: visit.timestamp.clone(),
                is_distraction,
                category: Some(category),
            },
            distraction_score,
            classification: result.classification,
        }
    }

    pub fn label_all(&self, visits: &[RawVisit]) -> Vec<LabeledEvent> {
        visits.iter().map(|v| self.label(v)).collect()
    }
}
