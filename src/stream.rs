//! Streaming analysis API: emit analyses as they complete.
//!
//! [`analyze_stream`] follows the same rules as
//! [`crate::batch::analyze_batch`] (one request at a time, submission order,
//! stop at the first failure) but yields each result as soon as it is
//! available. After an `Err` item the stream ends and no further image is
//! submitted.

use crate::error::MedScanError;
use crate::output::ImageAnalysis;
use crate::pipeline::input::ReportImage;
use crate::pipeline::llm::ReportAnalyzer;
use futures::stream;
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::{debug, warn};

/// A boxed stream of per-image results.
pub type AnalysisStream = Pin<Box<dyn Stream<Item = Result<ImageAnalysis, MedScanError>> + Send>>;

struct StreamState {
    analyzer: Arc<dyn ReportAnalyzer>,
    images: std::vec::IntoIter<ReportImage>,
    failed: bool,
}

/// Analyse `images` lazily; nothing is sent until the stream is polled.
pub fn analyze_stream(analyzer: Arc<dyn ReportAnalyzer>, images: Vec<ReportImage>) -> AnalysisStream {
    let state = StreamState {
        analyzer,
        images: images.into_iter(),
        failed: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        if state.failed {
            return None;
        }
        let image = state.images.next()?;

        let result = state
            .analyzer
            .analyze(&image)
            .await
            .map(|text| ImageAnalysis {
                file_name: image.file_name.clone(),
                text,
            });

        match &result {
            Ok(a) => debug!("{}: streamed {} chars", a.file_name, a.text.len()),
            Err(e) => {
                warn!("{}: stream stopped: {}", image.file_name, e);
                state.failed = true;
            }
        }
        Some((result, state))
    }))
}
