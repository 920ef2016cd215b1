//! Hostname classification

use crate::agent::Agent;
use crate::catalog::{DomainCatalog, DomainCategory, MatchKind};
use std::sync::Arc;
use url::Url;

/// Score for a severe (adult) domain; short-circuits aggregation downstream
pub const SEVERE_SCORE: f64 = -2.0;

/// Maps a hostname to a signed relevance score using the domain catalog
#[derive(Debug, Clone)]
pub struct DomainClassifier {
    catalog: Arc<DomainCatalog>,
}

impl Default for DomainClassifier {
    fn default() -> Self {
        Self::new(Arc::new(DomainCatalog::default()))
    }
}

impl DomainClassifier {
    pub fn new(catalog: Arc<DomainCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &DomainCatalog {
        &self.catalog
    }

    /// Score a hostname.
    ///
    /// | match  | severe | study | ambiguous | distraction |
    /// |--------|--------|-------|-----------|-------------|
    /// | exact  | -2.0   | 0.8   | 0.0       | -0.8        |
    /// | suffix | -2.0   | 0.6   | 0.0       | -0.6        |
    ///
    /// Unknown or empty hostnames score 0.0.
    pub fn score(&self, host: Option<&str>) -> f64 {
        let Some(host) = host else {
            return 0.0;
        };
        match self.catalog.lookup(host) {
            Some((category, kind)) => category_score(category, kind),
            None => 0.0,
        }
    }

    pub fn category(&self, host: Option<&str>) -> Option<DomainCategory> {
        host.and_then(|h| self.catalog.category_of(h))
    }
}

fn category_score(category: DomainCategory, kind: MatchKind) -> f64 {
    match (category, kind) {
        (DomainCategory::Severe, _) => SEVERE_SCORE,
        (DomainCategory::Study, MatchKind::Exact) => 0.8,
        (DomainCategory::Study, MatchKind::Suffix) => 0.6,
        (DomainCategory::Ambiguous, _) => 0.0,
        (DomainCategory::Distraction, MatchKind::Exact) => -0.8,
        (DomainCategory::Distraction, MatchKind::Suffix) => -0.6,
    }
}

impl Agent<str> for DomainClassifier {
    type Output = f64;

    fn name(&self) -> &'static str {
        "Domain Classifier"
    }

    fn analyze(&self, input: &str) -> f64 {
        self.score(normalize_host(input).as_deref())
    }
}

/// Lower-case a hostname and strip a leading `www.`. Blank input yields `None`.
pub fn normalize_host(host: &str) -> Option<String> {
    let host = host.trim().trim_end_matches('.').to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

/// Extract the normalized host from a URL; unparseable URLs yield `None`
pub fn extract_domain(raw_url: &str) -> Option<String> {
    let parsed = Url::parse(raw_url.trim()).ok()?;
    parsed.host_str().and_then(normalize_host)
}
