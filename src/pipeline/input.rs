//! Input loading: read a report image from disk and work out its media type.
//!
//! The media type is what the analysis client validates, so it is detected
//! here from the extension first and from the file's magic bytes second.
//! Anything unrecognised becomes `application/octet-stream` and is rejected
//! by the client as invalid input, without a request being sent.
//!
//! The upload boundary is narrower than what the client accepts: only PNG
//! and JPEG files, by extension and by media type. [`partition_uploads`] and
//! [`ReportImage::is_supported_upload`] enforce it; other images never reach
//! a session.

use crate::error::MedScanError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extensions accepted by the upload boundary (PNG and JPEG only).
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Media types accepted by the upload boundary.
pub const SUPPORTED_MEDIA_TYPES: [&str; 2] = ["image/png", "image/jpeg"];

/// One uploaded report image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportImage {
    /// Original file name (no directory part).
    pub file_name: String,
    /// Declared media type, e.g. `image/png`.
    pub media_type: String,
    /// Raw file content.
    pub bytes: Vec<u8>,
}

impl ReportImage {
    pub fn new(
        file_name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Size of the raw content in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the declared media type is an image type.
    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    /// Whether this image passes the upload boundary: a PNG/JPEG extension
    /// on the file name and a PNG/JPEG media type.
    pub fn is_supported_upload(&self) -> bool {
        is_supported_upload(Path::new(&self.file_name))
            && SUPPORTED_MEDIA_TYPES.contains(&self.media_type.as_str())
    }

    /// Read an image file, detecting its media type.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, MedScanError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => MedScanError::FileNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => MedScanError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => MedScanError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        let media_type = detect_media_type(path, &bytes).to_string();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        debug!(
            "Loaded {} ({}, {} bytes)",
            file_name,
            media_type,
            bytes.len()
        );
        Ok(Self {
            file_name,
            media_type,
            bytes,
        })
    }
}

/// Detect a media type by file extension, falling back to content sniffing.
pub fn detect_media_type(path: &Path, bytes: &[u8]) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let by_ext = match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "tiff" | "tif" => Some("image/tiff"),
        "pdf" => Some("application/pdf"),
        "txt" => Some("text/plain"),
        "json" => Some("application/json"),
        _ => None,
    };
    if let Some(mime) = by_ext {
        return mime;
    }

    match image::guess_format(bytes) {
        Ok(format) => format.to_mime_type(),
        Err(_) => "application/octet-stream",
    }
}

/// Whether `path` has one of the [`SUPPORTED_EXTENSIONS`].
pub fn is_supported_upload(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_lowercase();
            SUPPORTED_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

/// Split `paths` into (accepted, skipped) by [`is_supported_upload`],
/// keeping the input order in both.
pub fn partition_uploads(paths: &[PathBuf]) -> (Vec<PathBuf>, Vec<PathBuf>) {
    paths.iter().cloned().partition(|p| is_supported_upload(p))
}

/// Load several images in order, stopping at the first unreadable file.
pub async fn load_images(paths: &[PathBuf]) -> Result<Vec<ReportImage>, MedScanError> {
    let mut images = Vec::with_capacity(paths.len());
    for path in paths {
        images.push(ReportImage::from_path(path).await?);
    }
    Ok(images)
}
