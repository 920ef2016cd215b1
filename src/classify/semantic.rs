//! Optional semantic title classification
//!
//! A [`SemanticClassifier`] is an external collaborator (for example a hosted
//! language model) that labels ambiguous titles. Calls are bounded by a
//! timeout, memoized in an injectable [`VerdictCache`], and any failure is
//! reported as "no verdict" so the caller falls back to keyword scoring.
//!
//! A call that times out keeps running on its worker thread until the
//! collaborator returns. At most [`MAX_IN_FLIGHT`] such workers exist per
//! [`BoundedSemantic`] (clones included); past that, calls fall back at once.

use crate::error::SemanticError;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

/// Titles shorter than this are never sent to the collaborator
const MIN_TITLE_CHARS: usize = 5;

/// Collaborator calls allowed to run at once, timed-out ones included
pub const MAX_IN_FLIGHT: usize = 4;

/// Label returned by a semantic classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleVerdict {
    Study,
    Distraction,
    Neutral,
}

impl TitleVerdict {
    /// Lenient parse of a free-text label ("Distraction.", " study\n", ...)
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().to_lowercase();
        if label.contains("distraction") {
            TitleVerdict::Distraction
        } else if label.contains("study") {
            TitleVerdict::Study
        } else {
            TitleVerdict::Neutral
        }
    }

    /// Title score implied by the verdict; `Neutral` defers to keywords
    pub fn score(&self) -> Option<f64> {
        match self {
            TitleVerdict::Study => Some(0.8),
            TitleVerdict::Distraction => Some(-0.8),
            TitleVerdict::Neutral => None,
        }
    }
}

/// External collaborator that labels a title
pub trait SemanticClassifier: Send + Sync {
    fn classify(&self, title: &str) -> Result<TitleVerdict, SemanticError>;
}

/// Size-bounded verdict memo shared across requests.
///
/// Keyed by exact title text; the oldest insertion is evicted first.
#[derive(Debug)]
pub struct VerdictCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<String, TitleVerdict>,
    order: VecDeque<String>,
}

impl Default for VerdictCache {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_VERDICT_CACHE_CAPACITY)
    }
}

impl VerdictCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, title: &str) -> Option<TitleVerdict> {
        self.lock().entries.get(title).copied()
    }

    pub fn insert(&self, title: &str, verdict: TitleVerdict) {
        if self.capacity == 0 {
            return;
        }
        let mut inner = self.lock();
        if inner.entries.insert(title.to_string(), verdict).is_none() {
            inner.order.push_back(title.to_string());
        }
        while inner.order.len() > self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }
}

/// A semantic classifier wrapped with a timeout and a verdict cache
#[derive(Clone)]
pub struct BoundedSemantic {
    classifier: Arc<dyn SemanticClassifier>,
    cache: Arc<VerdictCache>,
    timeout: Duration,
    in_flight: Arc<AtomicUsize>,
}

impl std::fmt::Debug for BoundedSemantic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedSemantic")
            .field("cache_len", &self.cache.len())
            .field("timeout", &self.timeout)
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl BoundedSemantic {
    pub fn new(
        classifier: Arc<dyn SemanticClassifier>,
        cache: Arc<VerdictCache>,
        timeout: Duration,
    ) -> Self {
        Self {
            classifier,
            cache,
            timeout,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn cache(&self) -> &Arc<VerdictCache> {
        &self.cache
    }

    /// Collaborator calls currently running, including timed-out ones
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Verdict for a title, or `None` if the collaborator failed or timed out.
    ///
    /// Successful verdicts are cached; failures are not, so a transient
    /// outage does not pin a title to the fallback score.
    pub fn verdict(&self, title: &str) -> Option<TitleVerdict> {
        if title.chars().count() < MIN_TITLE_CHARS {
            return Some(TitleVerdict::Neutral);
        }

        if let Some(cached) = self.cache.get(title) {
            debug!("semantic verdict cache hit for {:?}", title);
            return Some(cached);
        }

        match self.call_with_timeout(title) {
            Ok(verdict) => {
                self.cache.insert(title, verdict);
                Some(verdict)
            }
            Err(e) => {
                warn!("semantic classifier fallback to keywords: {}", e);
                None
            }
        }
    }

    fn call_with_timeout(&self, title: &str) -> Result<TitleVerdict, SemanticError> {
        let slot = InFlightSlot::acquire(&self.in_flight)?;
        let (tx, rx) = mpsc::channel();
        let classifier = Arc::clone(&self.classifier);
        let owned_title = title.to_string();

        thread::Builder::new()
            .name("semantic-classifier".to_string())
            .spawn(move || {
                let _slot = slot;
                // Receiver may be gone after a timeout
                let _ = tx.send(classifier.classify(&owned_title));
            })
            .map_err(|_| SemanticError::Unavailable)?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                Err(SemanticError::Timeout(self.timeout.as_millis() as u64))
            }
            Err(RecvTimeoutError::Disconnected) => Err(SemanticError::Failed(
                "classifier worker exited without a result".to_string(),
            )),
        }
    }
}

/// One reserved worker slot, released on drop
struct InFlightSlot(Arc<AtomicUsize>);

impl InFlightSlot {
    fn acquire(counter: &Arc<AtomicUsize>) -> Result<Self, SemanticError> {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < MAX_IN_FLIGHT).then_some(n + 1)
            })
            .map_err(SemanticError::Busy)?;
        Ok(Self(Arc::clone(counter)))
    }
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::Receiver;

    struct CountingClassifier {
        calls: AtomicUsize,
        verdict: Result<TitleVerdict, SemanticError>,
    }

    impl SemanticClassifier for CountingClassifier {
        fn classify(&self, _title: &str) -> Result<TitleVerdict, SemanticError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.verdict.clone()
        }
    }

    struct SlowClassifier;

    impl SemanticClassifier for SlowClassifier {
        fn classify(&self, _title: &str) -> Result<TitleVerdict, SemanticError> {
            thread::sleep(Duration::from_millis(500));
            Ok(TitleVerdict::Study)
        }
    }

    fn bounded(classifier: Arc<dyn SemanticClassifier>) -> BoundedSemantic {
        BoundedSemantic::new(
            classifier,
            Arc::new(VerdictCache::new(10)),
            Duration::from_secs(2),
        )
    }

    #[test]
    fn test_from_label() {
        assert_eq!(TitleVerdict::from_label(" Distraction.\n"), TitleVerdict::Distraction);
        assert_eq!(TitleVerdict::from_label("STUDY"), TitleVerdict::Study);
        assert_eq!(TitleVerdict::from_label("unsure"), TitleVerdict::Neutral);
    }

    #[test]
    fn test_cache_evicts_oldest() {
        let cache = VerdictCache::new(2);
        cache.insert("a", TitleVerdict::Study);
        cache.insert("b", TitleVerdict::Neutral);
        cache.insert("c", TitleVerdict::Distraction);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("c"), Some(TitleVerdict::Distraction));
    }

    #[test]
    fn test_cache_reinsert_does_not_duplicate_order() {
        let cache = VerdictCache::new(2);
        cache.insert("a", TitleVerdict::Study);
        cache.insert("a", TitleVerdict::Distraction);
        cache.insert("b", TitleVerdict::Neutral);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some(TitleVerdict::Distraction));
    }

    #[test]
    fn test_zero_capacity_cache_stores_nothing() {
        let cache = VerdictCache::new(0);
        cache.insert("a", TitleVerdict::Study);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_repeated_titles_hit_cache() {
        let classifier = Arc::new(CountingClassifier {
            calls: AtomicUsize::new(0),
            verdict: Ok(TitleVerdict::Distraction),
        });
        let semantic = bounded(classifier.clone());

        for _ in 0..3 {
            assert_eq!(
                semantic.verdict("Top 10 anime fights"),
                Some(TitleVerdict::Distraction)
            );
        }
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let classifier = Arc::new(CountingClassifier {
            calls: AtomicUsize::new(0),
            verdict: Err(SemanticError::Unavailable),
        });
        let semantic = bounded(classifier.clone());

        assert_eq!(semantic.verdict("Some long video title"), None);
        assert_eq!(semantic.verdict("Some long video title"), None);
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 2);
        assert!(semantic.cache().is_empty());
    }

    #[test]
    fn test_short_titles_skip_collaborator() {
        let classifier = Arc::new(CountingClassifier {
            calls: AtomicUsize::new(0),
            verdict: Ok(TitleVerdict::Study),
        });
        let semantic = bounded(classifier.clone());

        assert_eq!(semantic.verdict("Home"), Some(TitleVerdict::Neutral));
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_timeout_yields_no_verdict() {
        let semantic = BoundedSemantic::new(
            Arc::new(SlowClassifier),
            Arc::new(VerdictCache::new(10)),
            Duration::from_millis(20),
        );
        assert_eq!(semantic.verdict("A slow lecture title"), None);
    }

    /// Blocks every call until the test releases it
    struct GatedClassifier {
        calls: AtomicUsize,
        gate: Mutex<Receiver<()>>,
    }

    impl SemanticClassifier for GatedClassifier {
        fn classify(&self, _title: &str) -> Result<TitleVerdict, SemanticError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let _ = self.gate.lock().unwrap().recv();
            Ok(TitleVerdict::Study)
        }
    }

    #[test]
    fn test_hung_collaborator_is_capped() {
        let (release, gate) = mpsc::channel();
        let classifier = Arc::new(GatedClassifier {
            calls: AtomicUsize::new(0),
            gate: Mutex::new(gate),
        });
        let semantic = BoundedSemantic::new(
            classifier.clone(),
            Arc::new(VerdictCache::new(10)),
            Duration::from_millis(10),
        );

        for i in 0..(MAX_IN_FLIGHT * 3) {
            assert_eq!(semantic.verdict(&format!("Hanging title number {i}")), None);
        }
        assert_eq!(semantic.in_flight(), MAX_IN_FLIGHT);
        assert!(classifier.calls.load(Ordering::SeqCst) <= MAX_IN_FLIGHT);

        // Releasing the collaborator frees every slot
        drop(release);
        for _ in 0..200 {
            if semantic.in_flight() == 0 {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(semantic.in_flight(), 0);
    }

    #[test]
    fn test_cache_is_shared_across_threads() {
        let cache = Arc::new(VerdictCache::new(50));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..20 {
                        cache.insert(&format!("title-{t}-{i}"), TitleVerdict::Study);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 50);
    }
}
