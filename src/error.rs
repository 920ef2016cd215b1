//! Error types for the AdaptiFocus engine
//!
//! Request-path operations never fail; these errors only surface while
//! loading configuration or decoding JSON at the edges of the crate.

use thiserror::Error;

/// Errors that can occur while building the engine or decoding its inputs
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid TOML configuration: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid keyword pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Invalid thresholds: {0}")]
    InvalidThresholds(String),

    #[error("Empty message pool for level: {0}")]
    EmptyMessagePool(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Failures reported by a semantic title classifier collaborator.
///
/// These are absorbed by [`crate::classify::TitleClassifier`] and never
/// reach callers of the pipeline.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SemanticError {
    #[error("semantic classifier unavailable")]
    Unavailable,

    #[error("semantic classifier timed out after {0} ms")]
    Timeout(u64),

    #[error("semantic classifier failed: {0}")]
    Failed(String),

    #[error("semantic classifier busy: {0} calls still running")]
    Busy(usize),
}
