//! Error types for the medscan-report library.
//!
//! [`MedScanError`] covers every failure the library can report. Its
//! `Display` output is the message shown to the end user, so the analysis
//! variants carry plain-language text rather than debugging detail; the raw
//! API body of a rejected request goes to the log instead.
//!
//! The report formatter has no error type at all: it accepts any string.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the medscan-report library.
#[derive(Debug, Error)]
pub enum MedScanError {
    // ── Analysis errors ──────────────────────────────────────────────────
    /// The image was rejected before any network call (wrong media type,
    /// file too large).
    #[error("{reason}")]
    InvalidInput { reason: String },

    /// The raw file passed the size check but its base64 form is over the
    /// encoded-payload limit.
    #[error("Image is too large after conversion. Please use a smaller image.")]
    PayloadTooLarge { encoded_bytes: usize, limit: usize },

    /// The API answered with a non-2xx status.
    #[error("{message}")]
    RemoteRejected { status: u16, message: String },

    /// The API answered 2xx but the body has no `choices[0].message.content`.
    #[error("Invalid response format from API")]
    MalformedResponse { detail: String },

    /// Transport or encoding failure with no more specific category.
    #[error("An unexpected error occurred while analyzing the image: {0}")]
    Unknown(String),

    // ── Input errors ─────────────────────────────────────────────────────
    /// Image file was not found at the given path.
    #[error("Image file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// The file exists but could not be read.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Output errors ────────────────────────────────────────────────────
    /// Could not create or write the HTML report.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Coarse classification of a [`MedScanError`] for callers that branch on
/// the kind of failure rather than on the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorCategory {
    InvalidInput,
    PayloadTooLarge,
    RemoteRejected,
    MalformedResponse,
    Unknown,
    Io,
    Config,
}

impl MedScanError {
    /// The category this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            MedScanError::InvalidInput { .. } => ErrorCategory::InvalidInput,
            MedScanError::PayloadTooLarge { .. } => ErrorCategory::PayloadTooLarge,
            MedScanError::RemoteRejected { .. } => ErrorCategory::RemoteRejected,
            MedScanError::MalformedResponse { .. } => ErrorCategory::MalformedResponse,
            MedScanError::Unknown(_) => ErrorCategory::Unknown,
            MedScanError::FileNotFound { .. }
            | MedScanError::PermissionDenied { .. }
            | MedScanError::ReadFailed { .. }
            | MedScanError::OutputWriteFailed { .. } => ErrorCategory::Io,
            MedScanError::InvalidConfig(_) => ErrorCategory::Config,
        }
    }

    /// Build a [`MedScanError::RemoteRejected`] with the user-facing message
    /// for `status`.
    pub fn remote_rejected(status: u16) -> Self {
        MedScanError::RemoteRejected {
            status,
            message: rejection_message(status),
        }
    }

    /// HTTP status of a rejected request, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            MedScanError::RemoteRejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// User-facing message for a non-2xx status from the completion endpoint.
pub fn rejection_message(status: u16) -> String {
    match status {
        412 => "The image format is not supported or the image is corrupted. \
                Please try a different image."
            .to_string(),
        413 => "The image is too large. Please use a smaller image.".to_string(),
        429 => "Too many requests. Please try again in a few moments.".to_string(),
        401 => "API authentication failed. Please check your API key.".to_string(),
        other => format!(
            "API request failed: {other} - Please try a different image or try again later."
        ),
    }
}
