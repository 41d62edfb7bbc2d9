//! Progress-callback trait for per-entry description events.
//!
//! Inject an [`Arc<dyn RunProgressCallback>`] via
//! [`crate::config::CatalogConfigBuilder::progress_callback`] to receive
//! events while the run generates one description per style number. The CLI
//! uses it to drive a terminal progress bar.
//!
//! # Example
//!
//! ```rust
//! use catalog_sheets::RunProgressCallback;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl RunProgressCallback for CountingCallback {
//!     fn on_entry_complete(&self, index: usize, total: usize, style_number: &str) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{style_number} done ({index}/{total})");
//!     }
//! }
//! ```

use std::sync::Arc;

/// Called by the pipeline as it describes each extracted entry.
///
/// All methods default to no-ops so callers only override what they need.
/// Entries are processed one at a time, in extraction order.
pub trait RunProgressCallback: Send + Sync {
    /// Called once before the first description request.
    ///
    /// # Arguments
    /// * `total_entries`: number of style numbers that will be described
    fn on_run_start(&self, total_entries: usize) {
        let _ = total_entries;
    }

    /// Called just before the LLM request for an entry.
    ///
    /// `index` is 1-based.
    fn on_entry_start(&self, index: usize, total: usize, style_number: &str) {
        let _ = (index, total, style_number);
    }

    /// Called when an entry's description came back.
    fn on_entry_complete(&self, index: usize, total: usize, style_number: &str) {
        let _ = (index, total, style_number);
    }

    /// Called when an entry's description failed. The run aborts afterwards.
    fn on_entry_error(&self, index: usize, total: usize, style_number: &str, error: &str) {
        let _ = (index, total, style_number, error);
    }

    /// Called once after every entry has been described.
    fn on_run_complete(&self, total_entries: usize) {
        let _ = total_entries;
    }
}

/// A no-op implementation, the default when no callback is configured.
pub struct NoopProgressCallback;

impl RunProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::CatalogConfig`].
pub type ProgressCallback = Arc<dyn RunProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        started_total: AtomicUsize,
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        styles: Mutex<Vec<String>>,
    }

    impl RunProgressCallback for TrackingCallback {
        fn on_run_start(&self, total_entries: usize) {
            self.started_total.store(total_entries, Ordering::SeqCst);
        }

        fn on_entry_start(&self, _index: usize, _total: usize, _style_number: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_entry_complete(&self, _index: usize, _total: usize, style_number: &str) {
            self.completes.fetch_add(1, Ordering::SeqCst);
            self.styles.lock().unwrap().push(style_number.to_string());
        }

        fn on_entry_error(&self, _index: usize, _total: usize, _style: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(2);
        cb.on_entry_start(1, 2, "A-100");
        cb.on_entry_complete(1, 2, "A-100");
        cb.on_entry_error(2, 2, "B-200", "timeout");
        cb.on_run_complete(2);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_run_start(2);
        tracker.on_entry_start(1, 2, "A-100");
        tracker.on_entry_complete(1, 2, "A-100");
        tracker.on_entry_start(2, 2, "B-200");
        tracker.on_entry_error(2, 2, "B-200", "LLM unavailable");

        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(*tracker.styles.lock().unwrap(), vec!["A-100".to_string()]);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_run_start(10);
        cb.on_entry_complete(1, 10, "X1");
    }
}
