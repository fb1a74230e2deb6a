#![warn(missing_docs)]
//! # hemoscan-inference
//!
//! ## Purpose
//! Sends one image plus prompt to the external multimodal model and returns
//! its raw text.
//!
//! ## Responsibilities
//! - Validate the provider endpoint (`https`, `:generateContent` method).
//! - Build the two-part multimodal request body with low-temperature decoding.
//! - Execute it through an injectable [`InferenceTransport`].
//! - Retry transient failures with capped exponential backoff and jitter.
//!
//! ## Data flow
//! [`AnalysisRequest`] -> [`InferenceClient::infer`] -> transport ->
//! [`GenerateContentResponse`] -> raw text for the response normalizer.
//!
//! ## Ownership and lifetimes
//! Request bodies own a copy of the base64 payload so transports may hold
//! them across await points without borrowing session state.
//!
//! ## Error model
//! Transport failures, non-success statuses and empty bodies surface as
//! [`InferenceError`]. Garbled but non-empty text is returned as-is; judging
//! content belongs to the normalizer.
//!
//! ## Security and privacy notes
//! The API key travels in a request header, never in the URL, and is never
//! logged. Image bytes are never logged.

mod gemini;

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use hemoscan_core::AnalysisRequest;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

pub use gemini::{API_KEY_HEADER, GeminiTransport, model_endpoint};

/// Required method suffix of the provider endpoint path.
pub const REQUIRED_METHOD_SUFFIX: &str = ":generateContent";

/// Decoding temperature biasing the model toward analytic phrasing.
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

/// Multimodal request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// Conversation turns; a screening sends exactly one.
    pub contents: Vec<Content>,
    /// Decoding parameters.
    pub generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    /// Builds the image-then-text request for one analysis.
    pub fn for_analysis(request: &AnalysisRequest, temperature: f32) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: request.mime_type.to_string(),
                            data: request.image_base64.clone(),
                        },
                    },
                    Part::Text {
                        text: request.prompt.clone(),
                    },
                ],
            }],
            generation_config: GenerationConfig { temperature },
        }
    }
}

/// One conversation turn.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Content {
    /// Ordered parts of the turn.
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// One request or response part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    /// Binary payload tagged with a MIME type.
    InlineData {
        /// Encoded data.
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    /// Free text.
    Text {
        /// Text content.
        text: String,
    },
    /// Any other part kind (thought signatures, function calls, code).
    Other(serde_json::Value),
}

/// Base64 payload tagged with MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    /// MIME type, always `image/jpeg` for screenings.
    pub mime_type: String,
    /// Base64 bytes without data-URI prefix.
    pub data: String,
}

/// Decoding parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Sampling temperature.
    pub temperature: f32,
}

/// Provider response body. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GenerateContentResponse {
    /// Candidate completions; the first one is used.
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Builds a single-candidate response, mainly for fakes and fixtures.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Content {
                    parts: vec![Part::Text { text: text.into() }],
                },
            }],
        }
    }

    /// Concatenates the text parts of the first candidate.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .iter()
                    .filter_map(|part| match part {
                        Part::Text { text } => Some(text.as_str()),
                        Part::InlineData { .. } | Part::Other(_) => None,
                    })
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// One candidate completion.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Candidate {
    /// Generated content.
    #[serde(default)]
    pub content: Content,
}

/// Abstract transport used by [`InferenceClient`].
#[async_trait]
pub trait InferenceTransport: Send + Sync {
    /// Sends one request to the provider.
    ///
    /// Latency is provider-controlled; callers impose their own deadline.
    async fn generate(
        &self,
        endpoint: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, InferenceError>;
}

/// Retry behavior for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay_ms: u64,
    /// Upper bound on any single delay, before jitter.
    pub max_delay_ms: u64,
    /// Maximum random delay added to each backoff.
    pub jitter_ms: u64,
}

impl RetryPolicy {
    /// Policy that never retries.
    pub const NONE: RetryPolicy = RetryPolicy {
        max_retries: 0,
        base_delay_ms: 0,
        max_delay_ms: 0,
        jitter_ms: 0,
    };

    /// Backoff before retry number `retry` (1-based), without jitter.
    pub fn backoff_ms(&self, retry: u32) -> u64 {
        let exponent = retry.saturating_sub(1).min(16);
        self.base_delay_ms
            .saturating_mul(1_u64 << exponent)
            .min(self.max_delay_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 500,
            max_delay_ms: 4_000,
            jitter_ms: 250,
        }
    }
}

/// Whether a failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Temporary condition; retry may succeed.
    Retriable,
    /// Retrying cannot help.
    Permanent,
}

/// Classifies an inference failure for retry decisions.
pub fn classify_inference_error(error: &InferenceError) -> FailureClass {
    match error {
        InferenceError::Timeout | InferenceError::Transport(_) | InferenceError::Server(_) => {
            FailureClass::Retriable
        }
        InferenceError::Client(408 | 429) => FailureClass::Retriable,
        InferenceError::InvalidEndpoint(_)
        | InferenceError::MissingApiKey
        | InferenceError::Client(_)
        | InferenceError::EmptyResponse
        | InferenceError::Decode(_) => FailureClass::Permanent,
    }
}

/// Raw model output plus delivery metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceReport {
    /// Raw response text, untouched.
    pub text: String,
    /// Attempts used, including the successful one.
    pub attempts: u32,
}

/// Client that validates endpoint policy and executes inference calls.
#[derive(Clone)]
pub struct InferenceClient {
    endpoint: String,
    temperature: f32,
    retry: RetryPolicy,
    transport: Arc<dyn InferenceTransport>,
    jitter: Arc<Mutex<StdRng>>,
}

impl std::fmt::Debug for InferenceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceClient")
            .field("endpoint", &self.endpoint)
            .field("temperature", &self.temperature)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl InferenceClient {
    /// Creates a validated inference client.
    ///
    /// # Errors
    /// Returns [`InferenceError::InvalidEndpoint`] when the URL is not HTTPS
    /// or does not name a `:generateContent` method.
    pub fn new(
        endpoint: impl Into<String>,
        retry: RetryPolicy,
        transport: Arc<dyn InferenceTransport>,
    ) -> Result<Self, InferenceError> {
        let endpoint = endpoint.into();
        validate_inference_endpoint(&endpoint)?;

        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as u64)
            .unwrap_or_default();

        Ok(Self {
            endpoint,
            temperature: DEFAULT_TEMPERATURE,
            retry,
            transport,
            jitter: Arc::new(Mutex::new(StdRng::seed_from_u64(seed))),
        })
    }

    /// Overrides the decoding temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Returns the configured endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the configured retry policy.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Sends the image and prompt and returns the raw model text.
    ///
    /// # Errors
    /// Returns the last transport error once retries are exhausted, the
    /// first permanent error immediately, and
    /// [`InferenceError::EmptyResponse`] when the provider answers with no
    /// text at all.
    pub async fn infer(&self, request: &AnalysisRequest) -> Result<InferenceReport, InferenceError> {
        let body = GenerateContentRequest::for_analysis(request, self.temperature);
        let mut attempts = 0_u32;

        loop {
            attempts += 1;
            let outcome = self
                .transport
                .generate(&self.endpoint, &body)
                .await
                .and_then(|response| {
                    let text = response.text();
                    if text.trim().is_empty() {
                        Err(InferenceError::EmptyResponse)
                    } else {
                        Ok(text)
                    }
                });

            let error = match outcome {
                Ok(text) => {
                    debug!(
                        scan_target = %request.target,
                        image_digest = %request.image_digest,
                        attempts,
                        response_chars = text.len(),
                        "inference response received"
                    );
                    return Ok(InferenceReport { text, attempts });
                }
                Err(error) => error,
            };

            let retries_used = attempts - 1;
            if classify_inference_error(&error) == FailureClass::Permanent
                || retries_used >= self.retry.max_retries
            {
                warn!(%error, attempts, "inference failed");
                return Err(error);
            }

            let delay = self.delay_before_retry(attempts);
            let delay_ms = delay.as_millis() as u64;
            warn!(%error, attempts, delay_ms, "retrying inference");
            tokio::time::sleep(delay).await;
        }
    }

    fn delay_before_retry(&self, retry: u32) -> Duration {
        let jitter = if self.retry.jitter_ms == 0 {
            0
        } else {
            // A poisoned lock only loses jitter, never the retry.
            self.jitter
                .lock()
                .map(|mut rng| rng.random_range(0..=self.retry.jitter_ms))
                .unwrap_or(0)
        };
        Duration::from_millis(self.retry.backoff_ms(retry).saturating_add(jitter))
    }
}

/// Validates inference endpoint constraints.
///
/// # Errors
/// Returns [`InferenceError::InvalidEndpoint`] for non-HTTPS URLs or paths
/// that do not end in `:generateContent`.
pub fn validate_inference_endpoint(endpoint: &str) -> Result<(), InferenceError> {
    let parsed = Url::parse(endpoint)
        .map_err(|error| InferenceError::InvalidEndpoint(format!("invalid inference url: {error}")))?;

    if parsed.scheme() != "https" {
        return Err(InferenceError::InvalidEndpoint(
            "inference endpoint must use https".to_string(),
        ));
    }

    if !parsed.path().ends_with(REQUIRED_METHOD_SUFFIX) {
        return Err(InferenceError::InvalidEndpoint(format!(
            "inference endpoint path must end with {REQUIRED_METHOD_SUFFIX}"
        )));
    }

    Ok(())
}

/// Errors produced while obtaining a model response.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// Endpoint violates security or contract requirements.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// No API key was configured.
    #[error("inference api key is missing")]
    MissingApiKey,
    /// Connection-level failure.
    #[error("inference transport failure: {0}")]
    Transport(String),
    /// Request exceeded the transport deadline.
    #[error("inference request timed out")]
    Timeout,
    /// Provider returned a 5xx status.
    #[error("inference server error: HTTP {0}")]
    Server(u16),
    /// Provider rejected the request with a 4xx status.
    #[error("inference request rejected: HTTP {0}")]
    Client(u16),
    /// Provider answered without any text.
    #[error("inference response was empty")]
    EmptyResponse,
    /// Response envelope could not be decoded.
    #[error("inference response decode failure: {0}")]
    Decode(String),
}
