#![warn(missing_docs)]
//! # hemoscan-capture
//!
//! ## Purpose
//! Turns an operator-selected photo into a canonical [`CapturedImage`].
//!
//! ## Responsibilities
//! - Accept file paths, raw bytes, or browser-style data URLs.
//! - Strip any data-URI prefix and decode the underlying image.
//! - Downscale oversized photos and re-encode them as JPEG so the declared
//!   MIME type always matches the payload.
//! - Provide deterministic synthetic captures for tests and CI.
//!
//! ## Data flow
//! Operator picks a file -> [`capture_image`] -> [`CapturedImage`] stored in
//! the session until the operator confirms or retakes.
//!
//! ## Ownership and lifetimes
//! Input buffers are consumed; the returned image owns its encoded payload.
//!
//! ## Error model
//! Missing selections, unreadable files, and undecodable bytes are reported
//! as [`CaptureError`]. The session keeps its state on every error.
//!
//! ## Security and privacy notes
//! Captures stay in memory. Nothing here writes image bytes to disk or
//! performs network calls.

use std::io::Cursor;
use std::path::PathBuf;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use hemoscan_core::{CapturedImage, CoreError};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use thiserror::Error;
use tracing::debug;

/// Longest side, in pixels, kept after downscaling.
pub const DEFAULT_MAX_DIMENSION: u32 = 1_600;

/// JPEG quality used for re-encoding.
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// One operator-provided image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureInput {
    /// Image file on the local filesystem.
    Path(PathBuf),
    /// Encoded image bytes in any supported format.
    Bytes(Vec<u8>),
    /// `data:<mime>;base64,<payload>` URL, or bare base64.
    DataUrl(String),
}

/// Encoding parameters for captured images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConfig {
    max_dimension: u32,
    jpeg_quality: u8,
}

impl CaptureConfig {
    /// Creates validated capture configuration.
    ///
    /// # Errors
    /// Returns [`CaptureError::InvalidConfig`] when `max_dimension == 0` or
    /// `jpeg_quality` is outside `1..=100`.
    pub fn new(max_dimension: u32, jpeg_quality: u8) -> Result<Self, CaptureError> {
        if max_dimension == 0 {
            return Err(CaptureError::InvalidConfig(
                "max dimension must be greater than zero".to_string(),
            ));
        }
        if !(1..=100).contains(&jpeg_quality) {
            return Err(CaptureError::InvalidConfig(format!(
                "jpeg quality must be within 1..=100, got {jpeg_quality}"
            )));
        }
        Ok(Self {
            max_dimension,
            jpeg_quality,
        })
    }

    /// Longest side kept after downscaling.
    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    /// JPEG re-encoding quality.
    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Builds a captured image from the operator's selection with default
/// encoding parameters.
///
/// # Errors
/// See [`capture_image_with`].
pub fn capture_image(selection: Option<CaptureInput>) -> Result<CapturedImage, CaptureError> {
    capture_image_with(selection, CaptureConfig::default())
}

/// Builds a captured image from the operator's selection.
///
/// `None` models a dismissed file picker.
///
/// # Errors
/// Returns [`CaptureError::NoFile`] when nothing was selected,
/// [`CaptureError::Read`] when a file cannot be read,
/// [`CaptureError::InvalidDataUrl`] for malformed data URLs and
/// [`CaptureError::Decode`] when the bytes are not an image.
pub fn capture_image_with(
    selection: Option<CaptureInput>,
    config: CaptureConfig,
) -> Result<CapturedImage, CaptureError> {
    let bytes = match selection.ok_or(CaptureError::NoFile)? {
        CaptureInput::Path(path) => {
            std::fs::read(&path).map_err(|source| CaptureError::Read { path, source })?
        }
        CaptureInput::Bytes(bytes) => bytes,
        CaptureInput::DataUrl(url) => decode_data_url(&url)?,
    };

    if bytes.is_empty() {
        return Err(CaptureError::NoFile);
    }

    let decoded =
        image::load_from_memory(&bytes).map_err(|error| CaptureError::Decode(error.to_string()))?;
    encode_jpeg(decoded, config)
}

/// Strips a data-URI prefix and decodes the base64 payload.
///
/// Bare base64 without a prefix is accepted as well.
///
/// # Errors
/// Returns [`CaptureError::InvalidDataUrl`] when the prefix is not a base64
/// data URI or the payload is not valid base64.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, CaptureError> {
    let url = url.trim();
    let payload = match url.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest.split_once(',').ok_or_else(|| {
                CaptureError::InvalidDataUrl("missing ',' separator".to_string())
            })?;
            if !header.ends_with(";base64") {
                return Err(CaptureError::InvalidDataUrl(
                    "only base64 data urls are supported".to_string(),
                ));
            }
            payload
        }
        None => url,
    };

    STANDARD
        .decode(payload)
        .map_err(|error| CaptureError::InvalidDataUrl(error.to_string()))
}

/// Produces a deterministic solid-color capture for tests and CI.
///
/// # Errors
/// Returns [`CaptureError::Encode`] when JPEG encoding fails.
pub fn synthetic_capture(width: u32, height: u32, rgb: [u8; 3]) -> Result<CapturedImage, CaptureError> {
    let buffer = RgbImage::from_pixel(width.max(1), height.max(1), Rgb(rgb));
    encode_jpeg(DynamicImage::ImageRgb8(buffer), CaptureConfig::default())
}

fn encode_jpeg(image: DynamicImage, config: CaptureConfig) -> Result<CapturedImage, CaptureError> {
    let source_width = image.width();
    let source_height = image.height();

    let image = if source_width.max(source_height) > config.max_dimension {
        image.resize(config.max_dimension, config.max_dimension, FilterType::Triangle)
    } else {
        image
    };

    // JPEG has no alpha channel.
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut jpeg = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut jpeg, config.jpeg_quality)
        .encode_image(&rgb)
        .map_err(|error| CaptureError::Encode(error.to_string()))?;
    let jpeg = jpeg.into_inner();

    let captured = CapturedImage::from_jpeg(&jpeg, width, height)?;
    debug!(
        source_width,
        source_height,
        width,
        height,
        bytes = captured.byte_len(),
        image_digest = captured.digest(),
        "image captured"
    );
    Ok(captured)
}

/// Capture layer error type.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Operator dismissed the picker or supplied an empty file.
    #[error("no image was provided")]
    NoFile,
    /// File could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// Path that failed.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Data URL is malformed.
    #[error("invalid data url: {0}")]
    InvalidDataUrl(String),
    /// Bytes are not a supported image.
    #[error("image decode failure: {0}")]
    Decode(String),
    /// JPEG re-encoding failed.
    #[error("image encode failure: {0}")]
    Encode(String),
    /// Capture configuration is out of range.
    #[error("invalid capture config: {0}")]
    InvalidConfig(String),
    /// Encoded image violated core invariants.
    #[error("captured image rejected: {0}")]
    Core(#[from] CoreError),
}
