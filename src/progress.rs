//! Progress-callback trait for per-item batch events.
//!
//! Pass an [`Arc<dyn BatchProgressCallback>`] in
//! [`crate::execute::BatchOptions::progress`] to receive events as
//! [`crate::execute::run_batch`] works through its items.
//!
//! Callers can forward events to a terminal progress bar, a log, or a
//! channel without the library knowing how the host reports progress.
//!
//! # Example
//!
//! ```rust
//! use cloudconvert_jobs::{BatchOptions, BatchProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     downloaded: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_file_downloaded(&self, item: usize, file_name: &str, bytes: usize) {
//!         self.downloaded.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("item {item}: {file_name} ({bytes} bytes)");
//!     }
//! }
//!
//! let options = BatchOptions {
//!     continue_on_fail: true,
//!     progress: Arc::new(CountingCallback { downloaded: AtomicUsize::new(0) }),
//! };
//! ```

use std::sync::Arc;

/// Called by the batch executor as it processes each item.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Item indices are 0-based.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before the first item.
    fn on_batch_start(&self, total_items: usize) {
        let _ = total_items;
    }

    /// Called before an item's first request.
    ///
    /// # Arguments
    /// * `item`   - index of the item
    /// * `action` - the request's action tag, e.g. `convert` or `get_job`
    fn on_item_start(&self, item: usize, action: &str) {
        let _ = (item, action);
    }

    /// Called when a job has been created for the item.
    fn on_job_submitted(&self, item: usize, job_id: &str) {
        let _ = (item, job_id);
    }

    /// Called after each downloaded result file.
    fn on_file_downloaded(&self, item: usize, file_name: &str, bytes: usize) {
        let _ = (item, file_name, bytes);
    }

    /// Called when an item produced its records.
    fn on_item_complete(&self, item: usize, records: usize) {
        let _ = (item, records);
    }

    /// Called when an item failed, whether or not the batch continues.
    fn on_item_error(&self, item: usize, error: &str) {
        let _ = (item, error);
    }

    /// Called once after the last item (not called when a failure aborts
    /// the batch).
    fn on_batch_complete(&self, total_items: usize, succeeded: usize) {
        let _ = (total_items, succeeded);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in
/// [`crate::execute::BatchOptions`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: Mutex<Vec<String>>,
        succeeded: AtomicUsize,
    }

    impl BatchProgressCallback for TrackingCallback {
        fn on_item_start(&self, _item: usize, _action: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_item_complete(&self, _item: usize, _records: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_item_error(&self, _item: usize, error: &str) {
            self.errors.lock().unwrap().push(error.to_string());
        }

        fn on_batch_complete(&self, _total_items: usize, succeeded: usize) {
            self.succeeded.store(succeeded, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_compiles_and_runs() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(3);
        cb.on_item_start(0, "convert");
        cb.on_job_submitted(0, "job-1");
        cb.on_file_downloaded(0, "out.pdf", 1024);
        cb.on_item_complete(0, 1);
        cb.on_item_error(1, "boom");
        cb.on_batch_complete(3, 2);
    }

    #[test]
    fn tracking_callback_counts_events() {
        let cb = TrackingCallback::default();
        cb.on_batch_start(2);
        cb.on_item_start(0, "get_job");
        cb.on_item_complete(0, 1);
        cb.on_item_start(1, "convert");
        cb.on_item_error(1, "API error 422");
        cb.on_batch_complete(2, 1);

        assert_eq!(cb.starts.load(Ordering::SeqCst), 2);
        assert_eq!(cb.completes.load(Ordering::SeqCst), 1);
        assert_eq!(cb.errors.lock().unwrap().as_slice(), ["API error 422"]);
        assert_eq!(cb.succeeded.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn callback_is_object_safe() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_item_complete(0, 0);
    }
}
