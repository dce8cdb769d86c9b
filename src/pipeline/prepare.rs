//! Image preparation for upload to the classifier.
//!
//! A selected photo is decoded, EXIF-corrected, downscaled so its longest
//! side fits the transport budget, and re-encoded as JPEG. Small images on
//! the desktop flow pass through byte-for-byte; the always-re-encode flow
//! (camera capture) normalizes every photo to JPEG regardless of size.
//!
//! Pure bytes-to-bytes transform, no I/O and no network.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageOutputFormat, RgbImage};
use thiserror::Error;
use tracing::debug;

// ═══════════════════════════════════════════════════════════
// Configuration
// ═══════════════════════════════════════════════════════════

/// Transport-side preparation limits. Bounds upload size, not model quality.
#[derive(Debug, Clone)]
pub struct PrepareConfig {
    /// Reject files above this many megabytes before decoding.
    pub max_upload_mb: u32,
    /// Longest side of the upload after downscaling.
    pub max_dimension_px: u32,
    /// JPEG quality for re-encoded output (0-100).
    pub jpeg_quality: u8,
    /// Re-encode even when the image already fits the dimension budget.
    /// Camera captures arrive in arbitrary formats, so the capture flow
    /// normalizes everything to JPEG.
    pub always_reencode: bool,
}

impl PrepareConfig {
    /// Desktop picker flow: small images pass through untouched.
    pub fn desktop() -> Self {
        Self {
            max_upload_mb: crate::config::MAX_UPLOAD_MB,
            max_dimension_px: crate::config::MAX_DIMENSION_PX,
            jpeg_quality: crate::config::JPEG_QUALITY,
            always_reencode: false,
        }
    }

    /// Gallery/camera flow: every photo is normalized to JPEG.
    pub fn mobile() -> Self {
        Self {
            always_reencode: true,
            ..Self::desktop()
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb as usize * 1024 * 1024
    }
}

// ═══════════════════════════════════════════════════════════
// Data types
// ═══════════════════════════════════════════════════════════

/// A photo as selected by the user, before any processing.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// The blob actually sent to the classifier. Either the source bytes
/// untouched (passthrough) or a fresh JPEG.
#[derive(Debug, Clone)]
pub struct UploadArtifact {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
    /// Dimensions of the artifact after orientation and scaling.
    pub width: u32,
    pub height: u32,
    pub reencoded: bool,
}

#[derive(Debug, Error)]
pub enum PrepareError {
    /// Display text doubles as the user-facing alert.
    #[error("That file is {actual_mb:.2} MB. Please choose a file under ~{limit_mb} MB.")]
    FileTooLarge { actual_mb: f64, limit_mb: u32 },

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("JPEG encoding failed: {0}")]
    Encode(String),
}

// ═══════════════════════════════════════════════════════════
// Preparation
// ═══════════════════════════════════════════════════════════

/// Prepare a selected photo for upload.
///
/// The size guard runs before any decode work, so an oversized file is
/// rejected without touching the image data. Orientation is read from
/// EXIF tag 0x0112 and applied before dimensions are measured, matching
/// what the user saw in their viewer.
pub fn prepare(source: &SourceImage, config: &PrepareConfig) -> Result<UploadArtifact, PrepareError> {
    if source.bytes.len() > config.max_upload_bytes() {
        return Err(PrepareError::FileTooLarge {
            actual_mb: bytes_to_mb(source.bytes.len()),
            limit_mb: config.max_upload_mb,
        });
    }

    let decoded = image::load_from_memory(&source.bytes)
        .map_err(|e| PrepareError::Decode(e.to_string()))?;
    let oriented = apply_orientation(decoded, read_exif_orientation(&source.bytes));
    let (width, height) = oriented.dimensions();

    let needs_downscale = width.max(height) > config.max_dimension_px;

    if !needs_downscale && !config.always_reencode {
        debug!(
            file = %source.file_name,
            width,
            height,
            "Image within bounds, passing through untouched"
        );
        return Ok(UploadArtifact {
            file_name: source.file_name.clone(),
            mime: source.mime.clone(),
            bytes: source.bytes.clone(),
            width,
            height,
            reencoded: false,
        });
    }

    let (target_w, target_h) = compute_fit_dimensions(width, height, config.max_dimension_px);
    let rgb = oriented.to_rgb8();
    let scaled = if needs_downscale {
        image::imageops::resize(&rgb, target_w, target_h, FilterType::Triangle)
    } else {
        rgb
    };

    let bytes = encode_jpeg(&scaled, config.jpeg_quality)?;
    let suffix = if config.always_reencode {
        ".jpg"
    } else {
        "_scaled.jpg"
    };
    let file_name = jpeg_file_name(&source.file_name, suffix);

    debug!(
        file = %file_name,
        from = format!("{width}x{height}"),
        to = format!("{target_w}x{target_h}"),
        jpeg_size = bytes.len(),
        "Image re-encoded for upload"
    );

    Ok(UploadArtifact {
        file_name,
        mime: "image/jpeg".to_string(),
        bytes,
        width: target_w,
        height: target_h,
        reencoded: true,
    })
}

// ═══════════════════════════════════════════════════════════
// EXIF orientation
// ═══════════════════════════════════════════════════════════

/// Read EXIF orientation tag from raw image bytes.
/// Returns 1 (normal) if no EXIF data or tag not present.
pub fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let reader = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(r) => r,
        Err(_) => return 1,
    };

    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1)
}

/// Apply EXIF orientation transform to a `DynamicImage`.
///
/// Values: 1 = normal, 2 = mirrored, 3 = 180 deg, 4 = flipped V,
/// 5 = mirrored + 90 CW, 6 = 90 CW, 7 = mirrored + 270 CW, 8 = 270 CW.
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        1 => img,
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

// ═══════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════

/// Compute dimensions whose longest side fits `max_dimension`,
/// preserving aspect ratio. Small images are NOT upscaled.
pub fn compute_fit_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (1, 1);
    }

    let scale = (max_dimension as f64 / width.max(height) as f64).min(1.0);
    let new_w = ((width as f64 * scale).round() as u32).max(1);
    let new_h = ((height as f64 * scale).round() as u32).max(1);

    (new_w, new_h)
}

/// Megabytes with the binary divisor used everywhere in the UI.
pub fn bytes_to_mb(bytes: usize) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

/// Encode an RGB image as JPEG at the given quality.
///
/// The dedicated encoder is tried first; if it errors or yields nothing,
/// the generic writer path is attempted before giving up.
pub fn encode_jpeg(img: &RgbImage, quality: u8) -> Result<Vec<u8>, PrepareError> {
    let mut primary = Vec::new();
    let ok = JpegEncoder::new_with_quality(&mut primary, quality)
        .encode_image(img)
        .is_ok();
    if ok && !primary.is_empty() {
        return Ok(primary);
    }

    let dynamic = DynamicImage::ImageRgb8(img.clone());
    let mut cursor = Cursor::new(Vec::new());
    dynamic
        .write_to(&mut cursor, ImageOutputFormat::Jpeg(quality))
        .map_err(|e| PrepareError::Encode(e.to_string()))?;
    let bytes = cursor.into_inner();
    if bytes.is_empty() {
        return Err(PrepareError::Encode("encoder produced no output".into()));
    }
    Ok(bytes)
}

/// Replace a trailing `.ext` (word characters only) with the given suffix.
/// Names without a recognizable extension get the suffix appended.
fn jpeg_file_name(original: &str, suffix: &str) -> String {
    let stem = match original.rfind('.') {
        Some(idx) => {
            let ext = &original[idx + 1..];
            if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                &original[..idx]
            } else {
                original
            }
        }
        None => original,
    };
    format!("{stem}{suffix}")
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
