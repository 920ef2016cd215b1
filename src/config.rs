//! Engine configuration
//!
//! [`EngineConfig`] is loaded once at startup (TOML or JSON) and shared by every
//! component. Any field left out of a file keeps its built-in default, and the
//! `extend` table appends to the default catalogs instead of replacing them.

use crate::catalog::{
    default_history_distraction_domains, DomainCatalog, DomainCategory, KeywordCatalog,
};
use crate::error::EngineError;
use crate::types::InterventionLevel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Default minimum average dwell (seconds) for a long-dwell pattern
pub const DEFAULT_LONG_DWELL_SECONDS: u64 = 120;

/// Default capacity of the semantic verdict cache
pub const DEFAULT_VERDICT_CACHE_CAPACITY: usize = 500;

/// Default timeout for one semantic classifier call (milliseconds)
pub const DEFAULT_SEMANTIC_TIMEOUT_MS: u64 = 2_000;

/// Base dwell thresholds in seconds, before risk and session adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterventionThresholds {
    pub nudge: u64,
    pub warn: u64,
    pub soft_block: u64,
    pub hard_block: u64,
}

impl Default for InterventionThresholds {
    fn default() -> Self {
        Self {
            nudge: 30,
            warn: 120,
            soft_block: 300,
            hard_block: 600,
        }
    }
}

impl InterventionThresholds {
    /// Thresholds must ascend strictly: nudge < warn < soft_block < hard_block
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.nudge < self.warn && self.warn < self.soft_block && self.soft_block < self.hard_block
        {
            Ok(())
        } else {
            Err(EngineError::InvalidThresholds(format!(
                "expected nudge < warn < soft_block < hard_block, got {} / {} / {} / {}",
                self.nudge, self.warn, self.soft_block, self.hard_block
            )))
        }
    }
}

/// Message templates per intervention level.
///
/// `{duration}` in a template is replaced with the formatted dwell time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagePools {
    pub nudge: Vec<String>,
    pub warn: Vec<String>,
    pub soft_block: Vec<String>,
    pub hard_block: Vec<String>,
}

impl Default for MessagePools {
    fn default() -> Self {
        Self {
            nudge: vec![
                "📚 Gentle reminder: you're in a study session. Ready to refocus?".to_string(),
                "💡 Quick check-in: is this helping you with your study goal?".to_string(),
                "🎯 You started a focused session. Want to get back on track?".to_string(),
            ],
            warn: vec![
                "⚠️ You've been on a distracting site for {duration}. Your focus score is dropping."
                    .to_string(),
                "📉 Focus alert: {duration} on non-study content. Your study goal is at risk."
                    .to_string(),
            ],
            soft_block: vec![
                "🛑 Extended distraction detected ({duration}). Take a breath: this page opens in 15 seconds if you choose."
                    .to_string(),
                "⏸️ Focus pause: you've spent {duration} away from your study topic. Continuing in 15 seconds..."
                    .to_string(),
            ],
            hard_block: vec![
                "🚫 Maximum distraction threshold reached ({duration}). This site is blocked for the rest of your study session. Use 'Override' if you genuinely need access."
                    .to_string(),
            ],
        }
    }
}

impl MessagePools {
    /// Message pool for an active level; `None` has no pool
    pub fn pool(&self, level: InterventionLevel) -> &[String] {
        match level {
            InterventionLevel::None => &[],
            InterventionLevel::Nudge => &self.nudge,
            InterventionLevel::Warn => &self.warn,
            InterventionLevel::SoftBlock => &self.soft_block,
            InterventionLevel::HardBlock => &self.hard_block,
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        for level in InterventionLevel::ACTIVE {
            if self.pool(level).is_empty() {
                return Err(EngineError::EmptyMessagePool(level.as_str().to_string()));
            }
        }
        Ok(())
    }
}

/// Additions appended to the built-in (or overridden) catalogs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogExtension {
    pub severe_domains: Vec<String>,
    pub study_domains: Vec<String>,
    pub ambiguous_domains: Vec<String>,
    pub distraction_domains: Vec<String>,
    pub history_distraction_domains: Vec<String>,
    pub severe_keywords: Vec<String>,
    pub study_keywords: Vec<String>,
    pub distraction_keywords: Vec<String>,
}

/// Immutable startup configuration for the whole engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub domains: DomainCatalog,
    pub keywords: KeywordCatalog,
    /// Domains the pattern analyzer treats as distraction without a flag
    pub history_distraction_domains: BTreeSet<String>,
    pub extend: CatalogExtension,
    pub thresholds: InterventionThresholds,
    pub messages: MessagePools,
    pub long_dwell_seconds: u64,
    pub semantic_timeout_ms: u64,
    pub verdict_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            domains: DomainCatalog::default(),
            keywords: KeywordCatalog::default(),
            history_distraction_domains: default_history_distraction_domains(),
            extend: CatalogExtension::default(),
            thresholds: InterventionThresholds::default(),
            messages: MessagePools::default(),
            long_dwell_seconds: DEFAULT_LONG_DWELL_SECONDS,
            semantic_timeout_ms: DEFAULT_SEMANTIC_TIMEOUT_MS,
            verdict_cache_capacity: DEFAULT_VERDICT_CACHE_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Parse a TOML configuration document
    pub fn from_toml_str(raw: &str) -> Result<Self, EngineError> {
        let config: EngineConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON configuration document
    pub fn from_json_str(raw: &str) -> Result<Self, EngineError> {
        let config: EngineConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file, choosing the format by extension (`.json`, otherwise TOML)
    pub fn from_path(path: &Path) -> Result<Self, EngineError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            EngineError::InvalidRequest(format!("cannot read {}: {}", path.display(), e))
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&raw),
            _ => Self::from_toml_str(&raw),
        }
    }

    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        self.thresholds.validate()?;
        self.messages.validate()
    }

    /// Domain catalog with `extend` additions applied
    pub fn resolved_domains(&self) -> DomainCatalog {
        let mut catalog = self.domains.clone();
        catalog.extend(DomainCategory::Severe, &self.extend.severe_domains);
        catalog.extend(DomainCategory::Study, &self.extend.study_domains);
        catalog.extend(DomainCategory::Ambiguous, &self.extend.ambiguous_domains);
        catalog.extend(DomainCategory::Distraction, &self.extend.distraction_domains);
        catalog
    }

    /// History distraction domains with `extend` additions applied
    pub fn resolved_history_domains(&self) -> BTreeSet<String> {
        self.history_distraction_domains
            .iter()
            .chain(&self.extend.history_distraction_domains)
            .map(|d| d.trim().to_lowercase())
            .filter(|d| !d.is_empty())
            .collect()
    }

    /// Keyword catalog with `extend` additions applied
    pub fn resolved_keywords(&self) -> KeywordCatalog {
        let mut keywords = self.keywords.clone();
        keywords
            .severe
            .extend(self.extend.severe_keywords.iter().cloned());
        keywords.study.extend(self.extend.study_keywords.iter().cloned());
        keywords
            .distraction
            .extend(self.extend.distraction_keywords.iter().cloned());
        keywords
    }
}
