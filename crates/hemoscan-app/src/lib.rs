#![warn(missing_docs)]
//! # hemoscan-app
//!
//! ## Purpose
//! Wires capture, prompt construction, inference, normalization, and the
//! screening state machine into one pipeline.
//!
//! ## Responsibilities
//! - Load runtime configuration from `HEMOSCAN_*` environment variables.
//! - Build the provider-backed inference client.
//! - Run one analysis under a deadline and recover every failure with the
//!   canonical fallback result.
//! - Feed outcomes back into the machine so stale completions are dropped.
//! - Provide log redaction for transport error strings.
//!
//! ## Data flow
//! Env -> [`AppConfig`] -> [`InferenceClient`]. Operator input ->
//! [`ScreeningMachine`] -> ticket -> [`analyze`] -> `complete`.
//!
//! ## Ownership and lifetimes
//! Tickets own their request, so analysis futures borrow only the client.
//! Shared machines are locked briefly and never across an await point.
//!
//! ## Error model
//! Setup and transition failures surface as [`AppError`]. Inference and
//! parsing failures never do; they become [`AnalysisResult::fallback`].
//!
//! ## Security and privacy notes
//! - The API key is redacted from `Debug` output and error strings.
//! - Only HTTPS endpoints are accepted.
//! - Image payloads are never logged; digests are used for correlation.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use hemoscan_analysis_contract::normalize_response;
use hemoscan_capture::CaptureInput;
use hemoscan_core::{AnalysisRequest, AnalysisResult, ScanTarget};
use hemoscan_inference::{
    GeminiTransport, InferenceClient, InferenceError, InferenceTransport, RetryPolicy,
    model_endpoint,
};
use hemoscan_session::{AnalysisTicket, Completion, ScreeningMachine, TransitionError};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("HEMOSCAN_VERSION");

/// Provider API key variable.
pub const ENV_API_KEY: &str = "HEMOSCAN_API_KEY";
/// Provider base URL variable.
pub const ENV_ENDPOINT: &str = "HEMOSCAN_ENDPOINT";
/// Model name variable.
pub const ENV_MODEL: &str = "HEMOSCAN_MODEL";
/// Analysis deadline variable, in seconds.
pub const ENV_TIMEOUT_SECS: &str = "HEMOSCAN_TIMEOUT_SECS";
/// Retry budget variable.
pub const ENV_MAX_RETRIES: &str = "HEMOSCAN_MAX_RETRIES";

/// Default provider base URL.
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Default vision model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
/// Default analysis deadline.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
/// Default retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Runtime configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Provider API key, if configured.
    pub api_key: Option<String>,
    /// Provider base URL (HTTPS).
    pub endpoint: String,
    /// Model name appended to the base URL.
    pub model: String,
    /// Deadline for one analysis, retries included.
    pub timeout: Duration,
    /// Retries after the first attempt.
    pub max_retries: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl AppConfig {
    /// Reads configuration from the process environment.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] for malformed values.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`; blank values count as unset.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] when the endpoint is not HTTPS, the
    /// timeout is zero or not a number, or the retry budget is not a number.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let endpoint = read(ENV_ENDPOINT).unwrap_or(defaults.endpoint);
        if !is_https_endpoint(&endpoint) {
            return Err(AppError::Config(format!(
                "{ENV_ENDPOINT} must be an https url"
            )));
        }

        let timeout = match read(ENV_TIMEOUT_SECS) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(0) | Err(_) => {
                    return Err(AppError::Config(format!(
                        "{ENV_TIMEOUT_SECS} must be a positive integer, got {raw:?}"
                    )));
                }
                Ok(secs) => Duration::from_secs(secs),
            },
            None => defaults.timeout,
        };

        let max_retries = match read(ENV_MAX_RETRIES) {
            Some(raw) => raw.parse::<u32>().map_err(|_| {
                AppError::Config(format!(
                    "{ENV_MAX_RETRIES} must be a non-negative integer, got {raw:?}"
                ))
            })?,
            None => defaults.max_retries,
        };

        Ok(Self {
            api_key: read(ENV_API_KEY),
            endpoint,
            model: read(ENV_MODEL).unwrap_or(defaults.model),
            timeout,
            max_retries,
        })
    }

    /// Full `generateContent` URL for the configured model.
    ///
    /// # Errors
    /// Returns [`AppError::Inference`] when the URL cannot be built.
    pub fn model_endpoint(&self) -> Result<String, AppError> {
        Ok(model_endpoint(&self.endpoint, &self.model)?)
    }

    /// Retry policy with the configured budget and default backoff.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            ..RetryPolicy::default()
        }
    }
}

/// Builds a client against the real provider.
///
/// # Errors
/// Returns [`AppError::Config`] without an API key and
/// [`AppError::Inference`] when the endpoint is rejected.
pub fn build_client(config: &AppConfig) -> Result<InferenceClient, AppError> {
    let api_key = config
        .api_key
        .as_deref()
        .ok_or_else(|| AppError::Config(format!("{ENV_API_KEY} is not set")))?;
    let transport = GeminiTransport::new(api_key)?;
    build_client_with(config, Arc::new(transport))
}

/// Builds a client over an arbitrary transport.
///
/// # Errors
/// Returns [`AppError::Inference`] when the endpoint is rejected.
pub fn build_client_with(
    config: &AppConfig,
    transport: Arc<dyn InferenceTransport>,
) -> Result<InferenceClient, AppError> {
    let endpoint = config.model_endpoint()?;
    Ok(InferenceClient::new(endpoint, config.retry_policy(), transport)?)
}

/// Runs one analysis; never fails.
///
/// Transport errors, deadline expiry, and unparsable text all yield the
/// canonical fallback result.
pub async fn analyze(
    client: &InferenceClient,
    request: &AnalysisRequest,
    timeout: Duration,
) -> AnalysisResult {
    match tokio::time::timeout(timeout, client.infer(request)).await {
        Ok(Ok(report)) => {
            info!(
                attempts = report.attempts,
                image_digest = %request.image_digest,
                "inference response received"
            );
            normalize_response(&report.text)
        }
        Ok(Err(error)) => {
            warn!(
                error = %redact_sensitive(&error.to_string()),
                image_digest = %request.image_digest,
                "inference failed, using fallback result"
            );
            AnalysisResult::fallback()
        }
        Err(_) => {
            let timeout_ms = timeout.as_millis() as u64;
            warn!(
                timeout_ms,
                image_digest = %request.image_digest,
                "inference deadline exceeded, using fallback result"
            );
            AnalysisResult::fallback()
        }
    }
}

/// Analyzes `ticket` and feeds the result into a shared machine.
///
/// The machine lock is taken only after the analysis finishes, so the
/// operator may navigate (for example start a new scan) meanwhile; the
/// completion is then reported as [`Completion::Discarded`].
///
/// # Errors
/// Returns [`AppError::StatePoisoned`] when the machine lock is poisoned.
pub async fn complete_analysis(
    machine: &Mutex<ScreeningMachine>,
    client: &InferenceClient,
    ticket: &AnalysisTicket,
    timeout: Duration,
) -> Result<Completion, AppError> {
    let result = analyze(client, ticket.request(), timeout).await;
    let mut machine = machine.lock().map_err(|_| AppError::StatePoisoned)?;
    Ok(machine.complete(ticket, result))
}

/// Drives a whole screening for one image and returns its result.
///
/// # Errors
/// Returns [`AppError::Transition`] when capture fails or a transition is
/// rejected. Inference failures are not errors.
pub async fn run_screening(
    client: &InferenceClient,
    target: ScanTarget,
    input: CaptureInput,
    timeout: Duration,
) -> Result<AnalysisResult, AppError> {
    let mut machine = ScreeningMachine::new();
    machine.acknowledge()?;
    machine.select_target(target)?;
    machine.start_screening()?;
    machine.capture(Some(input))?;

    let ticket = machine.confirm()?;
    let result = analyze(client, ticket.request(), timeout).await;
    match machine.complete(&ticket, result) {
        Completion::Applied => machine
            .session()
            .last_result()
            .cloned()
            .ok_or(AppError::Discarded),
        Completion::Discarded => Err(AppError::Discarded),
    }
}

/// Returns `true` when endpoint URL is HTTPS.
pub fn is_https_endpoint(endpoint: &str) -> bool {
    Url::parse(endpoint)
        .map(|url| url.scheme() == "https")
        .unwrap_or(false)
}

const REDACTED: &str = "<redacted>";

/// Markers whose assigned value (`marker=value`, `marker: value`) is secret.
const SECRET_MARKERS: [&str; 6] = [
    "x-goog-api-key",
    "api_key",
    "apikey",
    "key",
    "authorization",
    "token",
];

/// Redacts secret values in log-safe output.
///
/// Only the value following a marker is replaced; surrounding text and
/// ordinary uses of the marker words are kept.
pub fn redact_sensitive(input: &str) -> String {
    let mut redacted = redact_values(input, "bearer", false);
    for marker in SECRET_MARKERS {
        redacted = redact_values(&redacted, marker, true);
    }
    redacted
}

fn redact_values(input: &str, marker: &str, assignment: bool) -> String {
    let lower = input.to_ascii_lowercase();
    let mut output = String::with_capacity(input.len());
    let mut cursor = 0;

    while let Some(found) = lower[cursor..].find(marker) {
        let after_marker = cursor + found + marker.len();
        let rest = &input[after_marker..];
        let spaced = rest.trim_start_matches(' ');

        let value_start = if assignment {
            match spaced.chars().next() {
                Some(separator @ ('=' | ':')) => {
                    let after_separator = &spaced[separator.len_utf8()..];
                    input.len() - after_separator.trim_start_matches(' ').len()
                }
                _ => after_marker,
            }
        } else if spaced.len() < rest.len() {
            input.len() - spaced.len()
        } else {
            after_marker
        };

        let value = &input[value_start..];
        let value_len = if value_start == after_marker {
            0
        } else {
            value.find(is_value_end).unwrap_or(value.len())
        };

        output.push_str(&input[cursor..value_start]);
        if value_len > 0 {
            output.push_str(REDACTED);
        }
        cursor = value_start + value_len;
    }

    output.push_str(&input[cursor..]);
    output
}

fn is_value_end(ch: char) -> bool {
    ch.is_whitespace() || matches!(ch, '&' | ',' | ';' | ')' | '"' | '\'')
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed configuration.
    #[error("configuration error: {0}")]
    Config(String),
    /// Inference client setup failure.
    #[error("inference error: {0}")]
    Inference(#[from] InferenceError),
    /// Workflow transition was rejected.
    #[error("workflow error: {0}")]
    Transition(#[from] TransitionError),
    /// Machine lock was poisoned by a panicking holder.
    #[error("screening state lock poisoned")]
    StatePoisoned,
    /// The analysis was superseded before its result could be applied.
    #[error("analysis result was discarded")]
    Discarded,
}
