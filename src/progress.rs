//! Progress-callback trait for batch extraction events.
//!
//! Pass an [`Arc<dyn ExtractionProgressCallback>`] to
//! [`crate::stream::extract_stream`] to receive events as each upload in a
//! batch is processed.
//!
//! # Example
//!
//! ```rust
//! use resume_lens::ExtractionProgressCallback;
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: Arc<AtomicUsize>,
//! }
//!
//! impl ExtractionProgressCallback for CountingCallback {
//!     fn on_document_complete(&self, index: usize, total: usize, file_name: &str, text_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}/{} {} ({} chars)", index + 1, total, file_name, text_len);
//!     }
//! }
//!
//! let cb: Arc<dyn ExtractionProgressCallback> = Arc::new(CountingCallback {
//!     completed: Arc::new(AtomicUsize::new(0)),
//! });
//! cb.on_document_complete(0, 1, "cv.pdf", 1200);
//! ```

use std::sync::Arc;

/// Called by batch extraction as each upload is processed.
///
/// Uploads are processed concurrently, so `on_document_complete` and
/// `on_document_error` may be called from different tasks at once.
/// Implementations must protect shared mutable state (e.g. `Mutex`,
/// `AtomicUsize`). All methods default to no-ops.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once before any upload is processed.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called when an upload produced a document.
    ///
    /// # Arguments
    /// * `index`: 0-based position of the upload in the batch
    /// * `total`: batch size
    /// * `file_name`: the upload's file name
    /// * `text_len`: byte length of the extracted text
    fn on_document_complete(&self, index: usize, total: usize, file_name: &str, text_len: usize) {
        let _ = (index, total, file_name, text_len);
    }

    /// Called when every extractor failed for an upload.
    fn on_document_error(&self, index: usize, total: usize, file_name: &str, error: &str) {
        let _ = (index, total, file_name, error);
    }

    /// Called once after every upload has been attempted.
    fn on_batch_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Shared handle to a progress callback.
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        started_total: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        success_total: AtomicUsize,
    }

    impl ExtractionProgressCallback for TrackingCallback {
        fn on_batch_start(&self, total: usize) {
            self.started_total.store(total, Ordering::SeqCst);
        }

        fn on_document_complete(&self, _index: usize, _total: usize, _name: &str, _len: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_error(&self, _index: usize, _total: usize, _name: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_batch_complete(&self, _total: usize, success_count: usize) {
            self.success_total.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_document_complete(0, 2, "a.pdf", 42);
        cb.on_document_error(1, 2, "b.pdf", "ocr_extraction");
        cb.on_batch_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_batch_start(3);
        tracker.on_document_complete(0, 3, "a.txt", 100);
        tracker.on_document_complete(2, 3, "c.txt", 80);
        tracker.on_document_error(1, 3, "b.gif", "unsupported");
        tracker.on_batch_complete(3, 2);

        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.success_total.load(Ordering::SeqCst), 2);
    }
}
