#![warn(missing_docs)]
//! # hemoscan-core
//!
//! ## Purpose
//! Defines the pure data model shared across the `hemoscan` workspace.
//!
//! ## Responsibilities
//! - Enumerate scan targets and the closed result vocabularies
//!   (prediction, pallor level).
//! - Represent captured images as canonical JPEG/base64 payloads.
//! - Define the normalized [`AnalysisResult`] and the canonical fallback.
//! - Define the per-call [`AnalysisRequest`] pairing image and prompt.
//!
//! ## Data flow
//! Capture code builds [`CapturedImage`] values. The session combines one
//! image with a target-specific prompt into an [`AnalysisRequest`]. The
//! response normalizer emits an [`AnalysisResult`] for display.
//!
//! ## Ownership and lifetimes
//! All values own their buffers (`String`) so a request can travel into an
//! async inference task without borrowing from the session.
//!
//! ## Error model
//! Construction failures (unknown target names, empty images) return
//! [`CoreError`] variants.
//!
//! ## Security and privacy notes
//! Image payloads are never formatted into logs. Callers correlate images by
//! [`CapturedImage::digest`] instead.
//!
//! ## Example
//! ```rust
//! use hemoscan_core::{AnalysisResult, Prediction, ScanTarget};
//!
//! let target: ScanTarget = "conjunctiva".parse().expect("known target");
//! assert_eq!(target, ScanTarget::Conjunctiva);
//!
//! let fallback = AnalysisResult::fallback();
//! assert_eq!(fallback.prediction, Prediction::Uncertain);
//! assert_eq!(fallback.confidence, 0);
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// MIME type declared for every image part sent to the inference provider.
pub const IMAGE_MIME_TYPE: &str = "image/jpeg";

/// Upper bound of the confidence scale.
pub const MAX_CONFIDENCE: u8 = 100;

/// Reasoning substituted when the model omits or blanks the field.
pub const DEFAULT_REASONING: &str =
    "Analysis completed, but no detailed reasoning was returned.";

/// Reasoning carried by the canonical fallback result.
pub const FALLBACK_REASONING: &str = "The AI could not process the image with high confidence. \
This may be due to poor lighting, blurriness, or network issues.";

/// Capture-quality tips carried by the canonical fallback result.
pub const FALLBACK_RECOMMENDATIONS: [&str; 3] = [
    "Ensure the image is well-lit (natural light is best)",
    "Hold the camera steady to avoid blur",
    "Focus specifically on the nail bed or inner eyelid",
];

/// Canonical `Uncertain` result used for every unrecoverable failure.
///
/// Inference failures, timeouts and unparsable responses all resolve to this
/// exact value.
pub static FALLBACK_RESULT: LazyLock<AnalysisResult> = LazyLock::new(|| AnalysisResult {
    prediction: Prediction::Uncertain,
    confidence: 0,
    pallor_level: PallorLevel::None,
    reasoning: FALLBACK_REASONING.to_string(),
    recommendations: FALLBACK_RECOMMENDATIONS
        .iter()
        .map(|tip| (*tip).to_string())
        .collect(),
});

/// Body region photographed for screening.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanTarget {
    /// Fingernail beds.
    #[default]
    NailBed,
    /// Lower palpebral conjunctiva (inner eyelid).
    Conjunctiva,
    /// Palm of the hand, including the palmar creases.
    Palm,
}

impl ScanTarget {
    /// Every supported target in presentation order.
    pub const ALL: [ScanTarget; 3] = [ScanTarget::NailBed, ScanTarget::Conjunctiva, ScanTarget::Palm];

    /// Returns the stable identifier used on the wire and in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ScanTarget::NailBed => "NailBed",
            ScanTarget::Conjunctiva => "Conjunctiva",
            ScanTarget::Palm => "Palm",
        }
    }

    /// Returns the anatomical description embedded in prompts.
    pub fn anatomical_name(self) -> &'static str {
        match self {
            ScanTarget::NailBed => "Fingernails (Nail Beds)",
            ScanTarget::Conjunctiva => "Eye (Lower Palpebral Conjunctiva)",
            ScanTarget::Palm => "Palm of Hand",
        }
    }
}

impl fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanTarget {
    type Err = CoreError;

    /// Accepts the wire identifier as well as kebab/snake case spellings,
    /// case-insensitively.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized: String = raw
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "nailbed" | "nail" | "nails" => Ok(ScanTarget::NailBed),
            "conjunctiva" | "eye" => Ok(ScanTarget::Conjunctiva),
            "palm" => Ok(ScanTarget::Palm),
            _ => Err(CoreError::UnknownScanTarget(raw.to_string())),
        }
    }
}

/// Screening verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Prediction {
    /// Significant pallor consistent with anemia.
    Anemic,
    /// Healthy perfusion.
    Normal,
    /// Image could not be assessed with confidence.
    Uncertain,
}

impl Prediction {
    /// Matches a model-provided label, ignoring case and surrounding space.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        [Prediction::Anemic, Prediction::Normal, Prediction::Uncertain]
            .into_iter()
            .find(|candidate| candidate.as_str().eq_ignore_ascii_case(label))
    }

    /// Returns the wire label.
    pub fn as_str(self) -> &'static str {
        match self {
            Prediction::Anemic => "Anemic",
            Prediction::Normal => "Normal",
            Prediction::Uncertain => "Uncertain",
        }
    }
}

/// Ordinal severity of detected paleness.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum PallorLevel {
    /// No visible pallor.
    #[default]
    None,
    /// Mild pallor.
    Mild,
    /// Moderate pallor.
    Moderate,
    /// Severe pallor.
    Severe,
}

impl PallorLevel {
    /// Matches a model-provided label, ignoring case and surrounding space.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        [
            PallorLevel::None,
            PallorLevel::Mild,
            PallorLevel::Moderate,
            PallorLevel::Severe,
        ]
        .into_iter()
        .find(|candidate| candidate.as_str().eq_ignore_ascii_case(label))
    }

    /// Returns the wire label.
    pub fn as_str(self) -> &'static str {
        match self {
            PallorLevel::None => "None",
            PallorLevel::Mild => "Mild",
            PallorLevel::Moderate => "Moderate",
            PallorLevel::Severe => "Severe",
        }
    }
}

/// Normalized screening output.
///
/// Every field is populated and within its domain; only the response
/// normalizer and [`AnalysisResult::fallback`] construct values from model
/// output. Decoding goes through [`AnalysisResult::validate`], so serialized
/// results with out-of-domain fields are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawAnalysisResult")]
pub struct AnalysisResult {
    /// Screening verdict.
    pub prediction: Prediction,
    /// Confidence in `[0, 100]`.
    pub confidence: u8,
    /// Detected pallor severity.
    pub pallor_level: PallorLevel,
    /// Non-empty explanation referencing visual cues.
    pub reasoning: String,
    /// Ordered operator-facing recommendations.
    pub recommendations: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysisResult {
    prediction: Prediction,
    confidence: u32,
    pallor_level: PallorLevel,
    reasoning: String,
    recommendations: Vec<String>,
}

impl TryFrom<RawAnalysisResult> for AnalysisResult {
    type Error = CoreError;

    fn try_from(raw: RawAnalysisResult) -> Result<Self, Self::Error> {
        let confidence = u8::try_from(raw.confidence)
            .ok()
            .filter(|value| *value <= MAX_CONFIDENCE)
            .ok_or(CoreError::InvalidResult("confidence exceeds 100"))?;
        let result = Self {
            prediction: raw.prediction,
            confidence,
            pallor_level: raw.pallor_level,
            reasoning: raw.reasoning,
            recommendations: raw.recommendations,
        };
        result.validate()?;
        Ok(result)
    }
}

impl AnalysisResult {
    /// Checks that every field is within its domain.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidResult`] for confidence above 100, blank
    /// reasoning, or blank recommendation entries.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.confidence > MAX_CONFIDENCE {
            return Err(CoreError::InvalidResult("confidence exceeds 100"));
        }
        if self.reasoning.trim().is_empty() {
            return Err(CoreError::InvalidResult("reasoning is blank"));
        }
        if self.recommendations.iter().any(|entry| entry.trim().is_empty()) {
            return Err(CoreError::InvalidResult("recommendation entry is blank"));
        }
        Ok(())
    }

    /// Returns a copy of [`FALLBACK_RESULT`].
    pub fn fallback() -> Self {
        FALLBACK_RESULT.clone()
    }

    /// Returns `true` when this value equals the canonical fallback.
    pub fn is_fallback(&self) -> bool {
        *self == *FALLBACK_RESULT
    }

    /// Serializes the result as pretty JSON using wire field names.
    ///
    /// # Errors
    /// Returns [`CoreError::Codec`] when serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(self).map_err(CoreError::Codec)
    }
}

/// Image captured for the active screening.
///
/// Holds the base64 JPEG payload sent to the provider and a data URL preview
/// for display. Dropped when the session resets or a new capture replaces it.
#[derive(Clone, PartialEq, Eq)]
pub struct CapturedImage {
    payload_base64: String,
    width: u32,
    height: u32,
    byte_len: usize,
    digest: String,
}

impl CapturedImage {
    /// Wraps already-encoded JPEG bytes.
    ///
    /// # Errors
    /// Returns [`CoreError::EmptyImage`] for an empty buffer and
    /// [`CoreError::InvalidImageDimensions`] when either side is zero.
    pub fn from_jpeg(jpeg: &[u8], width: u32, height: u32) -> Result<Self, CoreError> {
        if jpeg.is_empty() {
            return Err(CoreError::EmptyImage);
        }
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidImageDimensions { width, height });
        }

        Ok(Self {
            payload_base64: STANDARD.encode(jpeg),
            width,
            height,
            byte_len: jpeg.len(),
            digest: hex::encode(Sha256::digest(jpeg)),
        })
    }

    /// Base64 payload without any data-URI prefix.
    pub fn payload_base64(&self) -> &str {
        &self.payload_base64
    }

    /// Displayable `data:` URL for previews.
    pub fn preview_data_url(&self) -> String {
        format!("data:{IMAGE_MIME_TYPE};base64,{}", self.payload_base64)
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Size of the encoded JPEG in bytes.
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    /// Hex SHA-256 of the JPEG bytes, safe to log.
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

impl fmt::Debug for CapturedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("byte_len", &self.byte_len)
            .field("digest", &self.digest)
            .finish_non_exhaustive()
    }
}

/// One inference call: image payload paired with a target-specific prompt.
#[derive(Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    /// Target the prompt was built for.
    pub target: ScanTarget,
    /// MIME type tag for the image part.
    pub mime_type: &'static str,
    /// Base64 image payload without data-URI prefix.
    pub image_base64: String,
    /// Full instruction text.
    pub prompt: String,
    /// Digest of the source image for log correlation.
    pub image_digest: String,
}

impl AnalysisRequest {
    /// Pairs an image with prompt text built for `target`.
    pub fn new(target: ScanTarget, image: &CapturedImage, prompt: impl Into<String>) -> Self {
        Self {
            target,
            mime_type: IMAGE_MIME_TYPE,
            image_base64: image.payload_base64().to_string(),
            prompt: prompt.into(),
            image_digest: image.digest().to_string(),
        }
    }
}

impl fmt::Debug for AnalysisRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisRequest")
            .field("target", &self.target)
            .field("mime_type", &self.mime_type)
            .field("image_digest", &self.image_digest)
            .field("prompt_len", &self.prompt.len())
            .finish_non_exhaustive()
    }
}

/// Error type for core model construction and codec failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Scan target name is not recognized.
    #[error("unknown scan target: {0}")]
    UnknownScanTarget(String),
    /// Image buffer is empty.
    #[error("image payload is empty")]
    EmptyImage,
    /// Image has a zero dimension.
    #[error("invalid image dimensions {width}x{height}")]
    InvalidImageDimensions {
        /// Reported width.
        width: u32,
        /// Reported height.
        height: u32,
    },
    /// Decoded result has an out-of-domain field.
    #[error("invalid analysis result: {0}")]
    InvalidResult(&'static str),
    /// JSON encoding failure.
    #[error("result codec failure: {0}")]
    Codec(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    //! Unit tests for core model helpers.

    use super::*;

    #[test]
    fn parses_target_spellings() {
        assert_eq!("NailBed".parse::<ScanTarget>().unwrap(), ScanTarget::NailBed);
        assert_eq!("nail-bed".parse::<ScanTarget>().unwrap(), ScanTarget::NailBed);
        assert_eq!("CONJUNCTIVA".parse::<ScanTarget>().unwrap(), ScanTarget::Conjunctiva);
        assert_eq!(" palm ".parse::<ScanTarget>().unwrap(), ScanTarget::Palm);
        assert!("elbow".parse::<ScanTarget>().is_err());
    }

    #[test]
    fn labels_match_case_insensitively() {
        assert_eq!(Prediction::from_label(" anemic "), Some(Prediction::Anemic));
        assert_eq!(Prediction::from_label("maybe"), None);
        assert_eq!(PallorLevel::from_label("SEVERE"), Some(PallorLevel::Severe));
        assert_eq!(PallorLevel::from_label(""), None);
    }

    #[test]
    fn fallback_is_uncertain_with_three_tips() {
        let fallback = AnalysisResult::fallback();
        assert_eq!(fallback.prediction, Prediction::Uncertain);
        assert_eq!(fallback.pallor_level, PallorLevel::None);
        assert_eq!(fallback.recommendations.len(), 3);
        assert!(fallback.is_fallback());
    }

    #[test]
    fn result_serializes_with_wire_field_names() {
        let json = AnalysisResult::fallback().to_json_pretty().unwrap();
        assert!(json.contains("\"pallorLevel\": \"None\""));
        assert!(json.contains("\"prediction\": \"Uncertain\""));
    }

    #[test]
    fn captured_image_rejects_empty_buffer() {
        assert!(matches!(
            CapturedImage::from_jpeg(&[], 1, 1),
            Err(CoreError::EmptyImage)
        ));
        assert!(matches!(
            CapturedImage::from_jpeg(&[1, 2, 3], 0, 4),
            Err(CoreError::InvalidImageDimensions { .. })
        ));
    }

    #[test]
    fn captured_image_debug_omits_payload() {
        let image = CapturedImage::from_jpeg(&[0xFF, 0xD8, 0xFF], 2, 2).unwrap();
        let rendered = format!("{image:?}");
        assert!(!rendered.contains(image.payload_base64()));
        assert!(image.preview_data_url().starts_with("data:image/jpeg;base64,"));
        assert_eq!(image.digest().len(), 64);
    }
}
