//! Title classification
//!
//! Scores page and video titles from keyword pattern hits. On ambiguous
//! domains an optional semantic collaborator may override the keyword score.

use crate::agent::Agent;
use crate::catalog::{DomainCategory, KeywordCatalog};
use crate::classify::semantic::{BoundedSemantic, TitleVerdict};
use crate::error::EngineError;
use regex::{Regex, RegexBuilder, RegexSet, RegexSetBuilder};

/// Score for a title with explicit/adult keywords
pub const SEVERE_TITLE_SCORE: f64 = -2.0;

const HIT_WEIGHT: f64 = 0.2;
const MAX_KEYWORD_SCORE: f64 = 0.7;

/// Keyword catalog compiled to case-insensitive matchers
#[derive(Debug, Clone)]
pub struct CompiledKeywords {
    severe: Vec<Regex>,
    study: RegexSet,
    distraction: RegexSet,
}

impl CompiledKeywords {
    pub fn compile(catalog: &KeywordCatalog) -> Result<Self, EngineError> {
        let severe = catalog
            .severe
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| invalid_pattern(pattern, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            severe,
            study: compile_set(&catalog.study)?,
            distraction: compile_set(&catalog.distraction)?,
        })
    }

    /// First-match check against the severe patterns
    pub fn is_severe(&self, title: &str) -> bool {
        self.severe.iter().any(|re| re.is_match(title))
    }

    /// Number of distinct study patterns that match
    pub fn study_hits(&self, title: &str) -> usize {
        self.study.matches(title).iter().count()
    }

    /// Number of distinct distraction patterns that match
    pub fn distraction_hits(&self, title: &str) -> usize {
        self.distraction.matches(title).iter().count()
    }
}

fn compile_set(patterns: &[String]) -> Result<RegexSet, EngineError> {
    RegexSetBuilder::new(patterns)
        .case_insensitive(true)
        .build()
        .map_err(|e| {
            // Find the offending pattern for a useful message
            let culprit = patterns
                .iter()
                .find(|p| Regex::new(p).is_err())
                .cloned()
                .unwrap_or_default();
            invalid_pattern(&culprit, e)
        })
}

fn invalid_pattern(pattern: &str, err: regex::Error) -> EngineError {
    EngineError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: err.to_string(),
    }
}

/// Which signal produced a title score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleSignal {
    /// No title, or no keyword imbalance
    None,
    Severe,
    Keywords,
    /// The semantic collaborator returned study or distraction
    Semantic(TitleVerdict),
}

/// A title score together with its source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TitleScore {
    pub score: f64,
    pub signal: TitleSignal,
}

impl TitleScore {
    fn none() -> Self {
        Self {
            score: 0.0,
            signal: TitleSignal::None,
        }
    }
}

/// Input for the title classifier's [`Agent`] impl
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TitleQuery {
    pub title: String,
    pub category: Option<DomainCategory>,
}

/// Maps a title to a signed relevance score in [-2.0, 0.8]
#[derive(Debug, Clone)]
pub struct TitleClassifier {
    keywords: CompiledKeywords,
    semantic: Option<BoundedSemantic>,
}

impl TitleClassifier {
    pub fn new(keywords: CompiledKeywords) -> Self {
        Self {
            keywords,
            semantic: None,
        }
    }

    /// Attach a semantic collaborator for ambiguous domains
    pub fn with_semantic(mut self, semantic: BoundedSemantic) -> Self {
        self.semantic = Some(semantic);
        self
    }

    pub fn has_semantic(&self) -> bool {
        self.semantic.is_some()
    }

    /// Keyword-only score.
    ///
    /// Severe keywords short-circuit to -2.0. Otherwise the side with more
    /// distinct pattern hits wins, at 0.2 per hit capped at ±0.7; ties score 0.
    pub fn keyword_score(&self, title: &str) -> f64 {
        if title.is_empty() {
            return 0.0;
        }
        if self.keywords.is_severe(title) {
            return SEVERE_TITLE_SCORE;
        }

        let study = self.keywords.study_hits(title);
        let distraction = self.keywords.distraction_hits(title);

        if study > distraction {
            (study as f64 * HIT_WEIGHT).min(MAX_KEYWORD_SCORE)
        } else if distraction > study {
            (distraction as f64 * -HIT_WEIGHT).max(-MAX_KEYWORD_SCORE)
        } else {
            0.0
        }
    }

    /// Score a title given the category of the domain it was seen on
    pub fn evaluate(&self, title: &str, category: Option<DomainCategory>) -> TitleScore {
        if title.is_empty() {
            return TitleScore::none();
        }

        let keyword = self.keyword_score(title);
        if keyword <= SEVERE_TITLE_SCORE {
            return TitleScore {
                score: keyword,
                signal: TitleSignal::Severe,
            };
        }

        if category == Some(DomainCategory::Ambiguous) {
            if let Some(semantic) = &self.semantic {
                if let Some(verdict) = semantic.verdict(title) {
                    if let Some(score) = verdict.score() {
                        return TitleScore {
                            score,
                            signal: TitleSignal::Semantic(verdict),
                        };
                    }
                }
            }
        }

        if keyword == 0.0 {
            TitleScore::none()
        } else {
            TitleScore {
                score: keyword,
                signal: TitleSignal::Keywords,
            }
        }
    }
}

impl Agent<TitleQuery> for TitleClassifier {
    type Output = f64;

    fn name(&self) -> &'static str {
        "Title Classifier"
    }

    fn analyze(&self, input: &TitleQuery) -> f64 {
        self.evaluate(&input.title, input.category).score
    }
}
