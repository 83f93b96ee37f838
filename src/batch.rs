//! Sequential batch analysis.
//!
//! Images are sent one at a time, in submission order, so there is never
//! more than one request in flight. The first failure ends the batch: the
//! analyses obtained so far are kept and the remaining images are never
//! submitted. Use [`crate::stream::analyze_stream`] to receive analyses as
//! they arrive instead of at the end.

use crate::config::AnalyzerConfig;
use crate::output::{BatchOutcome, BatchStats, ImageAnalysis};
use crate::pipeline::input::ReportImage;
use crate::pipeline::llm::ReportAnalyzer;
use std::time::Instant;
use tracing::{info, warn};

/// Analyse `images` in order with `analyzer`.
///
/// Never returns `Err`: a failure is recorded in [`BatchOutcome::error`]
/// alongside the analyses that completed before it.
pub async fn analyze_batch(
    analyzer: &dyn ReportAnalyzer,
    images: &[ReportImage],
    config: &AnalyzerConfig,
) -> BatchOutcome {
    let start = Instant::now();
    let total = images.len();
    info!("Starting analysis of {} image(s)", total);

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let mut analyses = Vec::with_capacity(total);
    let mut error = None;

    for (idx, image) in images.iter().enumerate() {
        let index = idx + 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_image_start(index, total, &image.file_name);
        }

        match analyzer.analyze(image).await {
            Ok(text) => {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_image_complete(index, total, text.len());
                }
                analyses.push(ImageAnalysis {
                    file_name: image.file_name.clone(),
                    text,
                });
            }
            Err(e) => {
                warn!(
                    "{}: analysis failed, {} image(s) not submitted: {}",
                    image.file_name,
                    total - index,
                    e
                );
                if let Some(ref cb) = config.progress_callback {
                    cb.on_image_error(index, total, &e.to_string());
                }
                error = Some(e);
                break;
            }
        }
    }

    let analyzed = analyses.len();
    let stats = BatchStats {
        total,
        analyzed,
        not_submitted: total - analyzed - usize::from(error.is_some()),
        duration_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        "Batch finished: {}/{} analysed in {}ms",
        analyzed, total, stats.duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, analyzed);
    }

    BatchOutcome {
        analyses,
        error,
        stats,
    }
}
