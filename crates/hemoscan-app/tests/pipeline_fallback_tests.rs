//! Integration tests for failure recovery in the analysis pipeline.

mod common;

use std::time::Duration;

use common::{FakeTransport, NORMAL_REPLY, client_for};
use hemoscan_app::analyze;
use hemoscan_capture::synthetic_capture;
use hemoscan_core::{AnalysisRequest, AnalysisResult, FALLBACK_RESULT, Prediction, ScanTarget};
use hemoscan_prompt::build_prompt;

fn request() -> AnalysisRequest {
    let image = synthetic_capture(8, 8, [210, 150, 150]).expect("fixture image");
    AnalysisRequest::new(ScanTarget::NailBed, &image, build_prompt(ScanTarget::NailBed))
}

#[tokio::test]
async fn pipeline_fallback_tests_transport_failure_matches_unparsable_reply() {
    let failed = analyze(
        &client_for(FakeTransport::failing()),
        &request(),
        Duration::from_secs(5),
    )
    .await;
    let garbled = analyze(
        &client_for(FakeTransport::replying("not json at all")),
        &request(),
        Duration::from_secs(5),
    )
    .await;

    assert_eq!(failed, garbled);
    assert_eq!(failed, *FALLBACK_RESULT);
    assert!(failed.is_fallback());
}

#[tokio::test]
async fn pipeline_fallback_tests_deadline_yields_fallback() {
    let transport = FakeTransport::slow(NORMAL_REPLY, Duration::from_secs(5));
    let result = analyze(
        &client_for(transport.clone()),
        &request(),
        Duration::from_millis(20),
    )
    .await;

    assert_eq!(result, AnalysisResult::fallback());
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn pipeline_fallback_tests_good_reply_is_normalized() {
    let result = analyze(
        &client_for(FakeTransport::replying(NORMAL_REPLY)),
        &request(),
        Duration::from_secs(5),
    )
    .await;

    assert_eq!(result.prediction, Prediction::Normal);
    assert_eq!(result.confidence, 87);
    assert_eq!(result.recommendations, vec!["Eat iron-rich foods".to_string()]);
}
