//! Crawl progress observable.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared, monotonically increasing crawl counters.
///
/// The handle is cheap to clone and safe to read from another task while
/// the crawl runs; the job layer polls it to report percentage-complete.
#[derive(Debug, Clone, Default)]
pub struct CrawlProgress {
    inner: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    max_results: AtomicUsize,
    yielded: AtomicUsize,
    pages: AtomicUsize,
    malformed_pages: AtomicUsize,
    dropped_records: AtomicUsize,
}

impl CrawlProgress {
    /// The crawl's record cap.
    pub fn max_results(&self) -> usize {
        self.inner.max_results.load(Ordering::Relaxed)
    }

    /// Records yielded so far.
    pub fn records_yielded(&self) -> usize {
        self.inner.yielded.load(Ordering::Relaxed)
    }

    /// Pages consumed so far (including malformed ones).
    pub fn pages_fetched(&self) -> usize {
        self.inner.pages.load(Ordering::Relaxed)
    }

    /// Pages dropped because their body failed to parse.
    pub fn malformed_pages(&self) -> usize {
        self.inner.malformed_pages.load(Ordering::Relaxed)
    }

    /// Individual records dropped inside otherwise valid pages.
    pub fn dropped_records(&self) -> usize {
        self.inner.dropped_records.load(Ordering::Relaxed)
    }

    /// Completion estimate in [0, 100].
    pub fn percent(&self) -> f64 {
        let max = self.max_results();
        if max == 0 {
            return 0.0;
        }
        (self.records_yielded() as f64 / max as f64 * 100.0).min(100.0)
    }

    pub(crate) fn set_max_results(&self, max: usize) {
        self.inner.max_results.store(max, Ordering::Relaxed);
    }

    pub(crate) fn record_yielded(&self) {
        self.inner.yielded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn page_fetched(&self) {
        self.inner.pages.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn malformed_page(&self) {
        self.inner.malformed_pages.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn records_dropped(&self, count: usize) {
        if count > 0 {
            self.inner.dropped_records.fetch_add(count, Ordering::Relaxed);
        }
    }
}
