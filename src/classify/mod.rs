//! Domain and title classification
//!
//! Leaf scorers used by the context scorer: hostname → signed relevance, and
//! title text → signed relevance (with an optional semantic collaborator).

mod domain;
mod semantic;
mod title;

pub use domain::{extract_domain, normalize_host, DomainClassifier};
pub use semantic::{BoundedSemantic, SemanticClassifier, TitleVerdict, VerdictCache};
pub use title::{CompiledKeywords, TitleClassifier, TitleQuery, TitleScore, TitleSignal};
