//! Progress-callback trait for per-image analysis events.
//!
//! Inject an [`Arc<dyn AnalysisProgressCallback>`] via
//! [`crate::config::AnalyzerConfigBuilder::progress_callback`] to receive
//! events as [`crate::batch::analyze_batch`] works through a batch.
//!
//! # Example
//!
//! ```rust
//! use medscan_report::{AnalysisProgressCallback, AnalyzerConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: Arc<AtomicUsize>,
//! }
//!
//! impl AnalysisProgressCallback for CountingCallback {
//!     fn on_image_complete(&self, index: usize, total: usize, text_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Image {}/{} done ({} bytes)", index, total, text_len);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     completed: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = AnalyzerConfig::builder()
//!     .api_key("test")
//!     .progress_callback(counter as Arc<dyn AnalysisProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the batch runner as it processes each image.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Images are processed one at a time, so events for a
/// batch never interleave.
pub trait AnalysisProgressCallback: Send + Sync {
    /// Called once before the first request.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called just before the request for an image is sent.
    ///
    /// # Arguments
    /// * `index`: 1-indexed position in the batch
    /// * `total`: batch size
    /// * `file_name`: original name of the image
    fn on_image_start(&self, index: usize, total: usize, file_name: &str) {
        let _ = (index, total, file_name);
    }

    /// Called when an image was analysed successfully.
    ///
    /// `text_len` is the byte length of the returned analysis.
    fn on_image_complete(&self, index: usize, total: usize, text_len: usize) {
        let _ = (index, total, text_len);
    }

    /// Called when an image failed. The batch stops after this event.
    fn on_image_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Called once when the batch is over, whether or not it aborted.
    fn on_batch_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AnalyzerConfig`].
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;
