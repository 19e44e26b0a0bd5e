//! Progress-callback trait for per-file conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConverterConfigBuilder::progress_callback`] to receive
//! events as the dispatcher walks the queue.
//!
//! # Example
//!
//! ```rust
//! use gr_convert::{ConversionProgressCallback, ConverterConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_file_complete(&self, index: usize, total: usize, artifact: &str, byte_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("[{}/{}] wrote {} ({} bytes)", index + 1, total, artifact, byte_len);
//!     }
//! }
//!
//! let config = ConverterConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { completed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the dispatcher as it processes each queued file.
///
/// Files are processed one at a time, but the trait is `Send + Sync` so a
/// callback can be shared with the task spawned by
/// [`crate::stream::run_stream`]. All methods default to no-ops.
///
/// `index` is the 0-based queue position; `total` is the queue length at
/// the start of the run.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before the first file is classified.
    fn on_run_start(&self, total: usize) {
        let _ = total;
    }

    /// Called before a routed file's converter runs.
    fn on_file_start(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called after an artifact has been delivered.
    fn on_file_complete(&self, index: usize, total: usize, artifact: &str, byte_len: usize) {
        let _ = (index, total, artifact, byte_len);
    }

    /// Called when a route fails.
    fn on_file_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Called for files that have no route (or no image content).
    fn on_file_skipped(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called once after the last route resolved.
    fn on_run_complete(&self, routed: usize, succeeded: usize) {
        let _ = (routed, succeeded);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConverterConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        skips: AtomicUsize,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_file_start(&self, _index: usize, _total: usize, _name: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_file_complete(&self, _index: usize, _total: usize, _artifact: &str, _len: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_file_error(&self, _index: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_file_skipped(&self, _index: usize, _total: usize, _name: &str) {
            self.skips.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(2);
        cb.on_file_start(0, 2, "a.png");
        cb.on_file_complete(0, 2, "a_GR.jpeg", 42);
        cb.on_file_error(1, 2, "decode failed");
        cb.on_file_skipped(1, 2, "notes.txt");
        cb.on_run_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_file_start(0, 3, "a.png");
        tracker.on_file_complete(0, 3, "a_GR.png", 10);
        tracker.on_file_start(1, 3, "b.png");
        tracker.on_file_error(1, 3, "bad bytes");
        tracker.on_file_skipped(2, 3, "c.txt");

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.skips.load(Ordering::SeqCst), 1);
    }
}
