#![warn(missing_docs)]
//! # hemoscan-analysis-contract
//!
//! ## Purpose
//! Interprets raw model text as an [`AnalysisResult`]. This is the only place
//! in the workspace that reads inference output.
//!
//! ## Responsibilities
//! - Strip markdown code fences the model may wrap around its JSON.
//! - Parse the remaining text, tolerating prose around a single object.
//! - Validate each field on its own and substitute safe defaults.
//! - Fall back to [`hemoscan_core::FALLBACK_RESULT`] when nothing parses.
//!
//! ## Data flow
//! Raw text -> [`strip_code_fence`] -> [`parse_response`] ->
//! [`AnalysisResult`]; [`normalize_response`] wraps the whole chain and
//! never fails.
//!
//! ## Ownership and lifetimes
//! Fence stripping borrows from the input; parsed results own their strings
//! so transient response buffers can be dropped right away.
//!
//! ## Error model
//! [`parse_response`] returns [`AnalysisContractError`] for content that is
//! not a JSON object. [`normalize_response`] logs that error together with a
//! preview of the raw text and returns the fallback instead.
//!
//! ## Security and privacy notes
//! Raw model text is logged for diagnosis only and is never returned to the
//! presentation layer.

use hemoscan_core::{
    AnalysisResult, DEFAULT_REASONING, MAX_CONFIDENCE, PallorLevel, Prediction,
};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

/// Longest raw-text excerpt written to logs.
pub const RAW_PREVIEW_CHARS: usize = 256;

/// Normalizes raw model text into a fully populated result.
///
/// Never fails. Unparsable content yields [`AnalysisResult::fallback`].
pub fn normalize_response(raw: &str) -> AnalysisResult {
    match parse_response(raw) {
        Ok(result) => result,
        Err(error) => {
            warn!(
                %error,
                raw_preview = %raw_preview(raw),
                "model response could not be parsed; substituting fallback result"
            );
            AnalysisResult::fallback()
        }
    }
}

/// Parses raw model text and validates it field by field.
///
/// # Errors
/// Returns [`AnalysisContractError::Decode`] when no JSON can be recovered and
/// [`AnalysisContractError::NotAnObject`] when the JSON root is not an
/// object. Individual bad fields never cause an error.
pub fn parse_response(raw: &str) -> Result<AnalysisResult, AnalysisContractError> {
    match parse_json_payload(strip_code_fence(raw))? {
        Value::Object(fields) => Ok(normalize_fields(&fields)),
        other => Err(AnalysisContractError::NotAnObject(json_kind(&other))),
    }
}

/// Removes a surrounding markdown code fence, with or without language tag.
///
/// Text that does not start with a fence is returned trimmed but otherwise
/// unchanged.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // The opening line may carry a language tag such as `json`.
    let body = match after_open.find('\n') {
        Some(newline) => &after_open[newline + 1..],
        None => after_open.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };

    body.strip_suffix("```").unwrap_or(body).trim()
}

fn parse_json_payload(text: &str) -> Result<Value, AnalysisContractError> {
    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(error) => {
            // Models sometimes surround the object with a sentence of prose.
            let embedded = text
                .find('{')
                .zip(text.rfind('}'))
                .filter(|(start, end)| start < end)
                .and_then(|(start, end)| serde_json::from_str(&text[start..=end]).ok());
            embedded.ok_or(AnalysisContractError::Decode(error))
        }
    }
}

fn normalize_fields(fields: &Map<String, Value>) -> AnalysisResult {
    let mut defaulted: Vec<&'static str> = Vec::new();

    let prediction = fields
        .get("prediction")
        .and_then(Value::as_str)
        .and_then(Prediction::from_label)
        .unwrap_or_else(|| {
            defaulted.push("prediction");
            Prediction::Uncertain
        });

    let confidence = fields
        .get("confidence")
        .and_then(Value::as_f64)
        .filter(|value| value.is_finite())
        .map(clamp_confidence)
        .unwrap_or_else(|| {
            defaulted.push("confidence");
            0
        });

    let pallor_level = fields
        .get("pallorLevel")
        .and_then(Value::as_str)
        .and_then(PallorLevel::from_label)
        .unwrap_or_else(|| {
            defaulted.push("pallorLevel");
            PallorLevel::None
        });

    let reasoning = fields
        .get("reasoning")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            defaulted.push("reasoning");
            DEFAULT_REASONING.to_string()
        });

    let recommendations = match fields.get("recommendations") {
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(Value::as_str)
            .map(clean_recommendation)
            .filter(|entry| !entry.is_empty())
            .collect(),
        _ => {
            defaulted.push("recommendations");
            Vec::new()
        }
    };

    if !defaulted.is_empty() {
        debug!(?defaulted, "model response fields replaced with defaults");
    }

    AnalysisResult {
        prediction,
        confidence,
        pallor_level,
        reasoning,
        recommendations,
    }
}

fn clamp_confidence(value: f64) -> u8 {
    value.round().clamp(0.0, f64::from(MAX_CONFIDENCE)) as u8
}

/// Trims list markers, emphasis and quotes models put around list items.
fn clean_recommendation(entry: &str) -> String {
    let mut text = entry.trim();

    if let Some(rest) = text
        .strip_prefix("- ")
        .or_else(|| text.strip_prefix("* "))
        .or_else(|| text.strip_prefix('•'))
    {
        text = rest.trim_start();
    }

    let digits = text.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        if let Some(rest) = text[digits..]
            .strip_prefix(". ")
            .or_else(|| text[digits..].strip_prefix(") "))
        {
            text = rest.trim_start();
        }
    }

    text.trim_matches(|c: char| c == '*' || c == '"' || c == '`' || c.is_whitespace())
        .to_string()
}

fn raw_preview(raw: &str) -> String {
    let mut preview: String = raw.chars().take(RAW_PREVIEW_CHARS).collect();
    if raw.chars().count() > RAW_PREVIEW_CHARS {
        preview.push('…');
    }
    preview
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Malformed-response errors.
#[derive(Debug, Error)]
pub enum AnalysisContractError {
    /// Text does not contain parseable JSON.
    #[error("analysis decode failure: {0}")]
    Decode(#[from] serde_json::Error),
    /// JSON root is not an object.
    #[error("analysis contract violation: expected a JSON object, got {0}")]
    NotAnObject(&'static str),
}
