//! Result types produced by batch analysis.

use crate::error::MedScanError;
use serde::{Deserialize, Serialize};

/// The analysis text returned for one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAnalysis {
    /// Original file name of the image.
    pub file_name: String,
    /// Raw model reply.
    pub text: String,
}

/// Counters for one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    /// Images handed to the batch.
    pub total: usize,
    /// Images analysed successfully.
    pub analyzed: usize,
    /// Images never submitted because an earlier one failed.
    pub not_submitted: usize,
    /// Wall-clock time of the whole batch.
    pub duration_ms: u64,
}

/// Outcome of [`crate::batch::analyze_batch`].
///
/// `analyses[i]` always belongs to the i-th input image: the batch runs in
/// order and stops at the first failure, so successes form a prefix.
#[derive(Debug)]
pub struct BatchOutcome {
    pub analyses: Vec<ImageAnalysis>,
    /// The error that aborted the batch, if any.
    pub error: Option<MedScanError>,
    pub stats: BatchStats,
}

impl BatchOutcome {
    /// True when every image was analysed.
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Treat an aborted batch as an error, discarding partial results.
    pub fn into_result(self) -> Result<Vec<ImageAnalysis>, MedScanError> {
        match self.error {
            None => Ok(self.analyses),
            Some(e) => Err(e),
        }
    }
}
