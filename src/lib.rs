//! AdaptiFocus engine - decision core for study-focus browsing
//!
//! The engine classifies what a student is looking at, mines their browsing
//! history for distraction patterns, and decides whether to intervene:
//! patterns → context → graduated intervention.
//!
//! ## Modules
//!
//! - **Classification**: domain and title scorers, combined by [`ContextScorer`]
//! - **Patterns**: time vulnerability, domain risk, chains and long dwell
//! - **Intervention**: risk-adjusted thresholds and round-robin messages
//! - **Pipeline**: the [`Coordinator`] composing all three, plus JSON entry points

pub mod agent;
pub mod catalog;
pub mod classify;
pub mod config;
pub mod context;
pub mod error;
pub mod intervention;
pub mod labeling;
pub mod patterns;
pub mod pipeline;
pub mod summary;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use agent::Agent;
pub use catalog::{DomainCatalog, DomainCategory, KeywordCatalog};
pub use classify::{BoundedSemantic, SemanticClassifier, TitleVerdict, VerdictCache};
pub use config::EngineConfig;
pub use context::ContextScorer;
pub use error::{EngineError, SemanticError};
pub use intervention::InterventionPolicy;
pub use patterns::PatternAnalyzer;
pub use pipeline::{analyze_json, classify_json, coordinate_json, Coordinator, CoordinatorBuilder};

pub use types::{
    BrowsingEvent, Classification, ClassificationResult, CoordinatorOutput, CoordinatorRequest,
    CurrentPageState, DecisionRequest, InterventionDecision, InterventionLevel, Pattern,
    PatternKind, PatternReport,
};

/// Engine version reported by the CLI and FFI
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by diagnostics
pub const PRODUCER_NAME: &str = "adaptifocus-engine";
