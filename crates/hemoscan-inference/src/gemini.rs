//! HTTP transport for Gemini-style `generateContent` endpoints.

use async_trait::async_trait;
use url::Url;

use crate::{
    GenerateContentRequest, GenerateContentResponse, InferenceError, InferenceTransport,
    REQUIRED_METHOD_SUFFIX,
};

/// Header carrying the provider API key.
pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// Builds `<base>/models/<model>:generateContent`.
///
/// # Errors
/// Returns [`InferenceError::InvalidEndpoint`] when `base` is not a URL or
/// `model` is blank.
pub fn model_endpoint(base: &str, model: &str) -> Result<String, InferenceError> {
    let model = model.trim();
    if model.is_empty() {
        return Err(InferenceError::InvalidEndpoint(
            "model name must be non-empty".to_string(),
        ));
    }

    let base = Url::parse(base.trim_end_matches('/'))
        .map_err(|error| InferenceError::InvalidEndpoint(format!("invalid base url: {error}")))?;

    Ok(format!(
        "{}/models/{model}{REQUIRED_METHOD_SUFFIX}",
        base.as_str().trim_end_matches('/')
    ))
}

/// Real provider transport backed by `reqwest`.
#[derive(Clone)]
pub struct GeminiTransport {
    http: reqwest::Client,
    api_key: String,
}

impl GeminiTransport {
    /// Creates a transport with a default HTTP client.
    ///
    /// # Errors
    /// Returns [`InferenceError::MissingApiKey`] when `api_key` is blank.
    pub fn new(api_key: impl Into<String>) -> Result<Self, InferenceError> {
        Self::with_client(reqwest::Client::new(), api_key)
    }

    /// Creates a transport around a caller-configured HTTP client.
    ///
    /// # Errors
    /// Returns [`InferenceError::MissingApiKey`] when `api_key` is blank.
    pub fn with_client(
        http: reqwest::Client,
        api_key: impl Into<String>,
    ) -> Result<Self, InferenceError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(InferenceError::MissingApiKey);
        }
        Ok(Self { http, api_key })
    }
}

impl std::fmt::Debug for GeminiTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiTransport")
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl InferenceTransport for GeminiTransport {
    async fn generate(
        &self,
        endpoint: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, InferenceError> {
        let response = self
            .http
            .post(endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status.is_server_error() {
            return Err(InferenceError::Server(status.as_u16()));
        }
        if !status.is_success() {
            return Err(InferenceError::Client(status.as_u16()));
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|error| InferenceError::Decode(error.without_url().to_string()))
    }
}

fn map_reqwest_error(error: reqwest::Error) -> InferenceError {
    if error.is_timeout() {
        InferenceError::Timeout
    } else {
        InferenceError::Transport(error.without_url().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_model_endpoint_from_base() {
        let endpoint =
            model_endpoint("https://generativelanguage.googleapis.com/v1beta/", "gemini-2.5-flash")
                .expect("endpoint should build");
        assert_eq!(
            endpoint,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert!(model_endpoint("https://example.test", " ").is_err());
    }

    #[test]
    fn rejects_blank_api_key() {
        assert!(matches!(
            GeminiTransport::new("  "),
            Err(InferenceError::MissingApiKey)
        ));
        let debug = format!("{:?}", GeminiTransport::new("secret-key").expect("key is set"));
        assert!(!debug.contains("secret-key"));
    }
}
