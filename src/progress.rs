//! Progress-callback trait for per-page decomposition events.
//!
//! Inject an [`Arc<dyn DecomposeProgressCallback>`] via
//! [`crate::config::DecomposeConfigBuilder::progress_callback`] to receive
//! events as the decomposer walks the document.
//!
//! The trait is `Send + Sync` so a single callback can be shared between
//! the two documents of a primary/answer-key run, or handed to a thread
//! that decomposes pages on its own.
//!
//! # Example
//!
//! ```rust
//! use pdf_decomposer::{DecomposeConfig, DecomposeProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct ImageCounter {
//!     images: AtomicUsize,
//! }
//!
//! impl DecomposeProgressCallback for ImageCounter {
//!     fn on_page_complete(&self, _page: usize, _total: usize, _text: usize, images: usize) {
//!         self.images.fetch_add(images, Ordering::SeqCst);
//!     }
//! }
//!
//! let counter = Arc::new(ImageCounter { images: AtomicUsize::new(0) });
//!
//! let config = DecomposeConfig::builder()
//!     .progress_callback(counter as Arc<dyn DecomposeProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::PageWarning;
use std::sync::Arc;

/// Called by the decomposer as it processes each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Page numbers are 1-indexed.
pub trait DecomposeProgressCallback: Send + Sync {
    /// Called once before the first page, with the number of selected pages.
    fn on_document_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before a page is extracted.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called after a page's blocks have been ordered.
    fn on_page_complete(
        &self,
        page_num: usize,
        total_pages: usize,
        text_blocks: usize,
        image_blocks: usize,
    ) {
        let _ = (page_num, total_pages, text_blocks, image_blocks);
    }

    /// Called for every recovered failure on a page.
    fn on_page_warning(&self, page_num: usize, warning: &PageWarning) {
        let _ = (page_num, warning);
    }

    /// Called once after every selected page has been attempted.
    fn on_document_complete(&self, total_pages: usize, warning_count: usize) {
        let _ = (total_pages, warning_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl DecomposeProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::DecomposeConfig`].
pub type ProgressCallback = Arc<dyn DecomposeProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        warnings: AtomicUsize,
        images: AtomicUsize,
        document_total: AtomicUsize,
    }

    impl DecomposeProgressCallback for TrackingCallback {
        fn on_document_start(&self, total_pages: usize) {
            self.document_total.store(total_pages, Ordering::SeqCst);
        }

        fn on_page_start(&self, _page_num: usize, _total_pages: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_complete(&self, _page: usize, _total: usize, _text: usize, images: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
            self.images.fetch_add(images, Ordering::SeqCst);
        }

        fn on_page_warning(&self, _page_num: usize, _warning: &PageWarning) {
            self.warnings.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_document_start(5);
        cb.on_page_start(1, 5);
        cb.on_page_complete(1, 5, 12, 2);
        cb.on_page_warning(
            2,
            &PageWarning::PageParseFailure {
                page: 2,
                detail: "x".into(),
            },
        );
        cb.on_document_complete(5, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_document_start(2);
        tracker.on_page_start(1, 2);
        tracker.on_page_complete(1, 2, 10, 1);
        tracker.on_page_start(2, 2);
        tracker.on_page_warning(
            2,
            &PageWarning::RasterizationFailure {
                page: 2,
                block: 0,
                detail: "render failed".into(),
            },
        );
        tracker.on_page_complete(2, 2, 3, 2);

        assert_eq!(tracker.document_total.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.warnings.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.images.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: Arc<dyn DecomposeProgressCallback> = Arc::new(NoopProgressCallback);
        cb.on_document_start(10);
        cb.on_page_start(1, 10);
        cb.on_page_complete(1, 10, 4, 0);
    }
}
