//! Unit tests for the protocol message types.

use super::*;

// ---------------------------------------------------------------------------
// Wire shape
// ---------------------------------------------------------------------------

#[test]
fn request_uses_snake_case_field_names() {
    let request = OperationRequest::new("F", "read");
    let json = serde_json::to_value(&request).expect("serialise");
    for field in [
        "connector_name",
        "operation_name",
        "connector_config",
        "operation_params",
        "message_context_in",
    ] {
        assert!(json.get(field).is_some(), "missing field {field}: {json}");
    }
}

#[test]
fn payload_is_base64_on_the_wire() {
    let context = MessageContext::new("m").with_payload(b"hi".to_vec());
    let json = serde_json::to_value(&context).expect("serialise");
    assert_eq!(json.get("payload"), Some(&serde_json::json!("aGk=")));
}

#[test]
fn success_response_omits_error_message() {
    let response = OperationResponse::success(MessageContext::new("m"));
    let json = serde_json::to_value(&response).expect("serialise");
    assert!(json.get("error_message").is_none(), "unexpected field: {json}");
}

// ---------------------------------------------------------------------------
// Tolerant decoding
// ---------------------------------------------------------------------------

#[test]
fn null_mappings_decode_as_empty() {
    let json = r#"{
        "connector_name": "F",
        "operation_name": "read",
        "connector_config": null,
        "operation_params": null,
        "message_context_in": {
            "message_id": "m",
            "payload": null,
            "properties": null,
            "headers": null
        }
    }"#;
    let request: OperationRequest = serde_json::from_str(json).expect("deserialise");
    assert!(request.connector_config().is_empty());
    assert!(request.operation_params().is_empty());
    assert!(request.message_context().payload().is_empty());
    assert!(request.message_context().properties().is_empty());
    assert!(request.message_context().headers().is_empty());
}

#[test]
fn absent_fields_decode_as_defaults() {
    let response: OperationResponse = serde_json::from_str(r#"{"success": true}"#)
        .expect("deserialise");
    assert!(response.is_success());
    assert_eq!(response.error_message(), None);
    assert_eq!(response.message_context(), &MessageContext::default());
}

#[test]
fn unknown_fields_are_ignored() {
    let response: OperationResponse =
        serde_json::from_str(r#"{"success": false, "error_message": "boom", "trace": [1]}"#)
            .expect("deserialise");
    assert_eq!(response.error_message(), Some("boom"));
}

#[test]
fn invalid_base64_payload_is_rejected() {
    let result: Result<MessageContext, _> =
        serde_json::from_str(r#"{"message_id": "m", "payload": "***"}"#);
    let err = result.expect_err("should reject payload");
    assert!(err.to_string().contains("base64"), "got: {err}");
}

// ---------------------------------------------------------------------------
// Value semantics
// ---------------------------------------------------------------------------

#[test]
fn failure_echoes_context_unchanged() {
    let context = MessageContext::new("m")
        .with_payload(b"original".to_vec())
        .with_property("flowName", Value::from("f"));
    let response = OperationResponse::failure(context.clone(), "nope");
    assert_eq!(response.into_message_context(), context);
}

#[test]
fn mutating_a_copy_leaves_the_original_alone() {
    let original = MessageContext::new("m").with_property("a", Value::from(1_i64));
    let mut copy = original.clone();
    copy.insert_property("a", Value::from(2_i64));
    copy.set_payload(b"changed".to_vec());
    assert_eq!(original.property("a"), Some(&Value::Integer(1)));
    assert!(original.payload().is_empty());
}

#[test]
fn request_accessors_expose_params_and_config() {
    let mut params = ValueMap::new();
    params.insert("filename".into(), Value::from("t.txt"));
    let mut config = ValueMap::new();
    config.insert("baseDirectory".into(), Value::from("./data"));
    let request = OperationRequest::new("F", "create")
        .with_operation_params(params)
        .with_connector_config(config);
    assert_eq!(request.connector_name(), "F");
    assert_eq!(request.operation_name(), "create");
    assert_eq!(request.param("filename").and_then(Value::as_str), Some("t.txt"));
    assert_eq!(
        request.config("baseDirectory").and_then(Value::as_str),
        Some("./data")
    );
}
