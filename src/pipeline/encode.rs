//! Image encoding: validate a [`ReportImage`] and wrap it as a base64 data-URL.
//!
//! Chat-completion APIs accept images inline as `data:<mime>;base64,<data>`
//! URLs inside the JSON body. Both size limits are checked here so that an
//! oversized image never reaches the network.

use crate::error::MedScanError;
use crate::pipeline::input::ReportImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

/// A validated image ready for the request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub media_type: String,
    pub base64: String,
}

impl EncodedImage {
    /// `data:{media_type};base64,{data}`
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.base64)
    }
}

/// Check media type and raw size before any encoding work.
pub fn validate_image(image: &ReportImage, max_image_bytes: usize) -> Result<(), MedScanError> {
    if !image.is_image() {
        return Err(MedScanError::InvalidInput {
            reason: "Please upload an image file (JPEG, PNG)".to_string(),
        });
    }
    if image.size() > max_image_bytes {
        return Err(MedScanError::InvalidInput {
            reason: format!(
                "Image size must be less than {}",
                human_size(max_image_bytes)
            ),
        });
    }
    Ok(())
}

/// Validate and base64-encode an image.
///
/// Fails with [`MedScanError::InvalidInput`] for a non-image or oversized
/// file and [`MedScanError::PayloadTooLarge`] when the encoded form is over
/// `max_encoded_bytes`.
pub fn encode_image(
    image: &ReportImage,
    max_image_bytes: usize,
    max_encoded_bytes: usize,
) -> Result<EncodedImage, MedScanError> {
    validate_image(image, max_image_bytes)?;

    let b64 = STANDARD.encode(&image.bytes);
    debug!(
        "Encoded {} → {} bytes base64",
        image.file_name,
        b64.len()
    );

    if b64.len() > max_encoded_bytes {
        return Err(MedScanError::PayloadTooLarge {
            encoded_bytes: b64.len(),
            limit: max_encoded_bytes,
        });
    }

    Ok(EncodedImage {
        media_type: image.media_type.clone(),
        base64: b64,
    })
}

/// Render a byte limit the way the user-facing messages do ("10MB").
fn human_size(bytes: usize) -> String {
    const MIB: usize = 1024 * 1024;
    const KIB: usize = 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else if bytes >= KIB && bytes % KIB == 0 {
        format!("{}KB", bytes / KIB)
    } else {
        format!("{bytes} bytes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    #[test]
    fn encode_small_image() {
        let img = ReportImage::new("a.png", "image/png", vec![0xFF; 10]);
        let data = encode_image(&img, 1024, 1024).expect("encode should succeed");
        assert_eq!(data.media_type, "image/png");
        let decoded = STANDARD.decode(&data.base64).expect("valid base64");
        assert_eq!(decoded, vec![0xFF; 10]);
        assert!(data.data_url().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn pdf_is_invalid_input() {
        let img = ReportImage::new("a.pdf", "application/pdf", vec![1]);
        let err = encode_image(&img, 1024, 1024).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::InvalidInput);
        assert!(err.to_string().contains("JPEG, PNG"));
    }

    #[test]
    fn oversize_is_invalid_input() {
        let img = ReportImage::new("a.png", "image/png", vec![0; 11]);
        let err = encode_image(&img, 10, 1024).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::InvalidInput);
    }

    #[test]
    fn size_message_uses_megabytes() {
        let img = ReportImage::new("a.png", "image/png", vec![0; 11]);
        let err = validate_image(&img, 10).unwrap_err();
        assert!(err.to_string().contains("10 bytes"));
        assert_eq!(human_size(10 * 1024 * 1024), "10MB");
    }

    #[test]
    fn encoded_limit_is_checked_separately() {
        // 9 raw bytes → 12 base64 characters.
        let img = ReportImage::new("a.png", "image/png", vec![0; 9]);
        let err = encode_image(&img, 9, 11).unwrap_err();
        match err {
            MedScanError::PayloadTooLarge {
                encoded_bytes,
                limit,
            } => {
                assert_eq!(encoded_bytes, 12);
                assert_eq!(limit, 11);
            }
            other => panic!("expected PayloadTooLarge, got {other:?}"),
        }
    }
}
