//! Validates contract fixtures and live serializations against frozen JSON schemas.

use hemoscan_analysis_contract::normalize_response;
use hemoscan_capture::synthetic_capture;
use hemoscan_core::{AnalysisRequest, AnalysisResult, FALLBACK_RESULT, ScanTarget};
use hemoscan_inference::{DEFAULT_TEMPERATURE, GenerateContentRequest};
use hemoscan_prompt::build_prompt;
use jsonschema::JSONSchema;
use serde_json::{Value, json};

const RESULT_SCHEMA: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../contracts/analysis-result.schema.json"
);
const REQUEST_SCHEMA: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../contracts/generate-content-request.schema.json"
);

fn load_json(path: &str) -> Value {
    let raw = std::fs::read_to_string(path).expect("json file should be readable");
    serde_json::from_str(&raw).expect("json file should be valid")
}

fn compile_validator(schema_path: &str) -> JSONSchema {
    let schema = load_json(schema_path);
    JSONSchema::compile(&schema).expect("schema should compile")
}

fn to_value(result: &AnalysisResult) -> Value {
    serde_json::to_value(result).expect("result should serialize")
}

#[test]
fn analysis_result_fixture_matches_schema() {
    let validator = compile_validator(RESULT_SCHEMA);
    let fixture = load_json(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../contracts/fixtures/analysis-result.valid.json"
    ));
    assert!(
        validator.is_valid(&fixture),
        "analysis result fixture should validate against schema"
    );

    let parsed: AnalysisResult =
        serde_json::from_value(fixture.clone()).expect("fixture should deserialize");
    assert_eq!(to_value(&parsed), fixture);
}

#[test]
fn request_fixture_matches_schema() {
    let validator = compile_validator(REQUEST_SCHEMA);
    let fixture = load_json(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../contracts/fixtures/generate-content-request.valid.json"
    ));
    assert!(
        validator.is_valid(&fixture),
        "request fixture should validate against schema"
    );
}

#[test]
fn fallback_result_matches_schema() {
    let validator = compile_validator(RESULT_SCHEMA);
    assert!(validator.is_valid(&to_value(&FALLBACK_RESULT)));
}

#[test]
fn normalized_output_always_matches_schema() {
    let validator = compile_validator(RESULT_SCHEMA);
    for raw in [
        "not json at all",
        "```json\n{\"prediction\":\"Normal\",\"confidence\":87}\n```",
        r#"{"prediction":"Anemic","confidence":150}"#,
        r#"{"prediction":3,"pallorLevel":"Severe","reasoning":"","recommendations":["", "- Rest"]}"#,
        "[]",
    ] {
        let value = to_value(&normalize_response(raw));
        assert!(validator.is_valid(&value), "{raw:?} normalized to {value}");
    }
}

#[test]
fn out_of_range_result_is_rejected() {
    let validator = compile_validator(RESULT_SCHEMA);
    let invalid = json!({
        "prediction": "Anemic",
        "confidence": 150,
        "pallorLevel": "None",
        "reasoning": "x",
        "recommendations": []
    });
    assert!(!validator.is_valid(&invalid));
}

#[test]
fn serialized_request_matches_schema() {
    let validator = compile_validator(REQUEST_SCHEMA);
    let image = synthetic_capture(4, 4, [190, 120, 120]).expect("fixture image");
    for target in ScanTarget::ALL {
        let request = AnalysisRequest::new(target, &image, build_prompt(target));
        let body = GenerateContentRequest::for_analysis(&request, DEFAULT_TEMPERATURE);
        let value = serde_json::to_value(&body).expect("request should serialize");
        assert!(validator.is_valid(&value), "{target} request body should validate");
    }
}
