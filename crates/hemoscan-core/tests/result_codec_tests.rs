//! Tests analysis result serialization against wire field names.

use hemoscan_core::{AnalysisResult, PallorLevel, Prediction};

#[test]
fn result_codec_tests_round_trip_wire_json() {
    let raw = r#"{
        "prediction":"Anemic",
        "confidence":72,
        "pallorLevel":"Moderate",
        "reasoning":"Conjunctiva appears porcelain white",
        "recommendations":["See a doctor"]
    }"#;

    let parsed: AnalysisResult = serde_json::from_str(raw).expect("wire json should decode");
    assert_eq!(parsed.prediction, Prediction::Anemic);
    assert_eq!(parsed.pallor_level, PallorLevel::Moderate);

    let encoded = serde_json::to_string(&parsed).expect("encoding should succeed");
    let decoded: AnalysisResult = serde_json::from_str(&encoded).expect("decoding should succeed");
    assert_eq!(decoded, parsed);
}

#[test]
fn result_codec_tests_rejects_out_of_domain_wire_json() {
    for raw in [
        r#"{"prediction":"Normal","confidence":250,"pallorLevel":"None","reasoning":"Pink","recommendations":[]}"#,
        r#"{"prediction":"Normal","confidence":101,"pallorLevel":"None","reasoning":"Pink","recommendations":[]}"#,
        r#"{"prediction":"Normal","confidence":80,"pallorLevel":"None","reasoning":"   ","recommendations":[]}"#,
        r#"{"prediction":"Normal","confidence":80,"pallorLevel":"None","reasoning":"Pink","recommendations":[""]}"#,
    ] {
        assert!(
            serde_json::from_str::<AnalysisResult>(raw).is_err(),
            "{raw} should be rejected"
        );
    }
}

#[test]
fn result_codec_tests_fallback_passes_validation() {
    assert!(AnalysisResult::fallback().validate().is_ok());
}
