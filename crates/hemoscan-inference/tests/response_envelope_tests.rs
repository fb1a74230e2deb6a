//! Integration tests for decoding provider response envelopes.

use hemoscan_inference::{GenerateContentResponse, Part};

#[test]
fn response_envelope_tests_skips_non_text_parts() {
    let body = r#"{"candidates":[{"content":{"parts":[
        {"thoughtSignature":"abc"},
        {"text":"{\"prediction\":\"Normal\","},
        {"functionCall":{"name":"lookup","args":{}}},
        {"text":"\"confidence\":80}"}
    ],"role":"model"},"finishReason":"STOP"}],"usageMetadata":{"totalTokenCount":12}}"#;

    let response: GenerateContentResponse =
        serde_json::from_str(body).expect("mixed-part body should decode");

    assert_eq!(response.text(), "{\"prediction\":\"Normal\",\"confidence\":80}");
    assert!(matches!(
        response.candidates[0].content.parts[0],
        Part::Other(_)
    ));
}

#[test]
fn response_envelope_tests_only_unknown_parts_yield_empty_text() {
    let body = r#"{"candidates":[{"content":{"parts":[{"executableCode":{"code":"1+1"}}]}}]}"#;
    let response: GenerateContentResponse =
        serde_json::from_str(body).expect("body should decode");
    assert_eq!(response.text(), "");
}
