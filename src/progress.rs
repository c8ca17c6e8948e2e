//! Progress-callback trait for per-page extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the OCR pipeline works through the pages of a document. Plain
//! images are reported as a one-page document.
//!
//! # Example
//!
//! ```rust
//! use ocr_extract::{ExtractionConfig, ExtractionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ExtractionProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, region_count: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Page {}/{}: {} regions", page_num, total_pages, region_count);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ExtractionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the extraction pipeline as it processes each page.
///
/// With `page_concurrency > 1` the page methods may be called concurrently
/// from different threads and out of page order. All methods default to
/// no-ops.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once after rasterisation, before any page is recognised.
    ///
    /// `total_pages` is the number of pages that will be processed (after
    /// truncation to `max_pdf_pages`).
    fn on_extraction_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before a page is handed to the recognizer.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page has been recognised (and face-cropped, if asked).
    fn on_page_complete(&self, page_num: usize, total_pages: usize, region_count: usize) {
        let _ = (page_num, total_pages, region_count);
    }

    /// Called once after every page succeeded.
    fn on_extraction_complete(&self, pages_processed: usize) {
        let _ = pages_processed;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        regions: AtomicUsize,
        total: AtomicUsize,
    }

    impl ExtractionProgressCallback for TrackingCallback {
        fn on_extraction_start(&self, total_pages: usize) {
            self.total.store(total_pages, Ordering::SeqCst);
        }

        fn on_page_start(&self, _page_num: usize, _total_pages: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_complete(&self, _page_num: usize, _total_pages: usize, region_count: usize) {
            self.regions.fetch_add(region_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_extraction_start(2);
        cb.on_page_start(1, 2);
        cb.on_page_complete(1, 2, 7);
        cb.on_extraction_complete(2);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_extraction_start(2);
        tracker.on_page_start(1, 2);
        tracker.on_page_complete(1, 2, 3);
        tracker.on_page_start(2, 2);
        tracker.on_page_complete(2, 2, 4);
        tracker.on_extraction_complete(2);

        assert_eq!(tracker.total.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.regions.load(Ordering::SeqCst), 7);
    }
}
