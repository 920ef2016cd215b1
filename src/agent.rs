//! Shared contract for pipeline components
//!
//! Every scoring and analysis component implements [`Agent`] for its input type.
//! The coordinator holds its collaborators as `Box<dyn Agent<..>>`, so a richer
//! pattern engine or a different policy can be swapped in without touching it.

/// A named, synchronous analysis step.
///
/// Implementations must be re-entrant: `analyze` takes `&self` and may be
/// called from several threads at once.
pub trait Agent<I: ?Sized>: Send + Sync {
    type Output;

    /// Human-readable component name
    fn name(&self) -> &'static str;

    /// Run the analysis. Never fails; degraded inputs yield neutral output.
    fn analyze(&self, input: &I) -> Self::Output;
}
