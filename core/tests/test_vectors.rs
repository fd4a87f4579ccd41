//! Verify request building and response normalization against the JSON
//! vectors stored in `test-vectors/`.
//!
//! Each request vector names an operation, its input, the page hostname and
//! stored token, and the request that should reach the wire. Each response
//! vector pairs a simulated transport reply with the expected outcome and
//! notifications. Bodies are compared as parsed JSON so field ordering does
//! not matter.

use checkin_core::client::{
    build_activity_detail, build_cancel_registration, build_check_in, build_check_in_by_token,
    build_list_activities, build_my_registrations, build_register_activity,
    build_student_registration_records, build_validate_check_in_token,
};
use checkin_core::{
    ApiError, Environment, HttpMethod, HttpRequest, HttpResponse, MemoryCredentials, Pipeline,
    PipelineConfig, RecordingNotifier, StaticHost, TransportError,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

fn pipeline(hostname: &str, token: Option<&str>) -> (Pipeline, RecordingNotifier) {
    let credentials = MemoryCredentials::new();
    if let Some(token) = token {
        credentials.set("student_token", token);
    }
    let notifier = RecordingNotifier::new();
    let env = Environment::new(StaticHost::new(hostname), credentials, notifier.clone());
    (Pipeline::new(PipelineConfig::default(), env), notifier)
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        other => panic!("unknown method: {other}"),
    }
}

fn from<T: DeserializeOwned>(value: &Value) -> T {
    serde_json::from_value(value.clone()).unwrap()
}

fn build(operation: &str, input: &Value) -> HttpRequest {
    match operation {
        "list_activities" => build_list_activities(&from(input)).unwrap(),
        "activity_detail" => build_activity_detail(input.as_i64().unwrap()),
        "register_activity" => build_register_activity(&from(input)).unwrap(),
        "cancel_registration" => build_cancel_registration(input.as_i64().unwrap()),
        "check_in" => build_check_in(&from(input)).unwrap(),
        "my_registrations" => build_my_registrations(&from(input)).unwrap(),
        "student_registration_records" => build_student_registration_records(&from(input)).unwrap(),
        "validate_check_in_token" => build_validate_check_in_token(input.as_str().unwrap()),
        "check_in_by_token" => build_check_in_by_token(&from(input)).unwrap(),
        other => panic!("unknown operation: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[test]
fn request_test_vectors() {
    let raw = include_str!("../../test-vectors/requests.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let (p, _) = pipeline(case["hostname"].as_str().unwrap(), case["token"].as_str());
        let expected = &case["expected_request"];

        let req = p
            .prepare(build(case["operation"].as_str().unwrap(), &case["input"]))
            .unwrap();

        assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
        assert_eq!(req.url(), expected["url"].as_str().unwrap(), "{name}: url");
        assert_eq!(
            req.header("authorization"),
            expected["authorization"].as_str(),
            "{name}: authorization"
        );
        match req.body.as_deref() {
            Some(body) => {
                let body: Value = serde_json::from_str(body).unwrap();
                assert_eq!(body, expected["body"], "{name}: body");
                assert_eq!(req.header("content-type"), Some("application/json"), "{name}: content type");
            }
            None => assert!(expected["body"].is_null(), "{name}: body should be None"),
        }
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[test]
fn response_test_vectors() {
    let raw = include_str!("../../test-vectors/responses.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let (p, notifier) = pipeline("localhost", None);
        let req = p.prepare(HttpRequest::get("/public/activities")).unwrap();

        let sim = &case["simulated_response"];
        let response = HttpResponse {
            status: sim["status"].as_u64().unwrap() as u16,
            headers: Vec::new(),
            body: sim["body"].as_str().unwrap().to_string(),
        };
        let result = p.finish(&req, Ok(response));

        if let Some(expected_error) = case.get("expected_error") {
            let err = result.unwrap_err();
            match expected_error.as_str().unwrap() {
                "Logical" => {
                    assert!(matches!(err, ApiError::Logical { .. }), "{name}: expected Logical");
                    assert_eq!(err.to_string(), case["expected_message"].as_str().unwrap(), "{name}: message");
                }
                "Transport" => {
                    let status = case["expected_status"].as_u64().unwrap() as u16;
                    assert!(
                        matches!(&err, ApiError::Transport(TransportError::Status { status: s, .. }) if *s == status),
                        "{name}: expected Transport with status {status}"
                    );
                }
                other => panic!("{name}: unknown expected_error: {other}"),
            }
        } else {
            let envelope = result.unwrap();
            assert_eq!(serde_json::to_value(&envelope).unwrap(), case["expected_result"], "{name}: parsed result");
        }

        let expected_notifications: Vec<String> =
            serde_json::from_value(case["expected_notifications"].clone()).unwrap();
        assert_eq!(notifier.messages(), expected_notifications, "{name}: notifications");
    }
}
