//! Shared fixtures for app integration tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use hemoscan_app::{AppConfig, build_client_with};
use hemoscan_inference::{
    GenerateContentRequest, GenerateContentResponse, InferenceClient, InferenceError,
    InferenceTransport,
};

/// Well-formed model answer for a healthy subject.
#[allow(dead_code)]
pub const NORMAL_REPLY: &str = "```json\n{\"prediction\":\"Normal\",\"confidence\":87,\"pallorLevel\":\"None\",\"reasoning\":\"Pink nail beds\",\"recommendations\":[\"Eat iron-rich foods\"]}\n```";

/// Transport that answers after a delay, or fails when `reply` is `None`.
pub struct FakeTransport {
    reply: Option<String>,
    delay: Duration,
    calls: AtomicUsize,
}

impl FakeTransport {
    /// Answers immediately with `text`.
    #[allow(dead_code)]
    pub fn replying(text: &str) -> Arc<Self> {
        Self::slow(text, Duration::ZERO)
    }

    /// Answers with `text` after `delay`.
    #[allow(dead_code)]
    pub fn slow(text: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(text.to_string()),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    /// Always fails with a server error.
    #[allow(dead_code)]
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    /// Number of provider calls observed.
    #[allow(dead_code)]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceTransport for FakeTransport {
    async fn generate(
        &self,
        _endpoint: &str,
        _request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.reply {
            Some(text) => Ok(GenerateContentResponse::from_text(text.clone())),
            None => Err(InferenceError::Server(503)),
        }
    }
}

/// Client over `transport` with retries disabled.
#[allow(dead_code)]
pub fn client_for(transport: Arc<FakeTransport>) -> InferenceClient {
    let config = AppConfig {
        max_retries: 0,
        ..AppConfig::default()
    };
    build_client_with(&config, transport).expect("fake client should build")
}
