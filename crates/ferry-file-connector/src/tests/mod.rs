//! Unit tests for the file operations.

use std::fs;
use std::path::Path;

use ferry_protocol::{MessageContext, OperationRequest, Value, ValueMap};
use ferry_worker::OperationHandler;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;

#[fixture]
fn base() -> TempDir {
    TempDir::new().expect("create base dir")
}

fn request(operation: &str, base: &Path, params: &[(&str, &str)]) -> OperationRequest {
    let mut config = ValueMap::new();
    config.insert(
        BASE_DIRECTORY_KEY.into(),
        Value::from(base.display().to_string()),
    );
    let params: ValueMap = params
        .iter()
        .map(|(key, value)| ((*key).to_owned(), Value::from(*value)))
        .collect();
    OperationRequest::new("SimpleFileConnector", operation)
        .with_connector_config(config)
        .with_operation_params(params)
        .with_message_context(MessageContext::new("msg-1").with_header("origin", "test"))
}

// ---------------------------------------------------------------------------
// create
// ---------------------------------------------------------------------------

#[rstest]
fn create_writes_content_and_sets_properties(base: TempDir) {
    let request = request(
        "create",
        base.path(),
        &[("filename", "t.txt"), ("content", "Hello")],
    );

    let context = create_file(&request).expect("create");

    let written = base.path().join("t.txt");
    assert_eq!(fs::read_to_string(&written).expect("read back"), "Hello");
    assert_eq!(
        context.property(WRITE_PATH_PROPERTY).and_then(Value::as_str),
        Some(written.display().to_string().as_str())
    );
    assert_eq!(
        context.property(WRITE_STATUS_PROPERTY).and_then(Value::as_str),
        Some("success")
    );
    assert_eq!(context.header("origin"), Some("test"));
}

#[rstest]
fn create_makes_missing_base_directory(base: TempDir) {
    let nested = base.path().join("nested").join("deeper");
    let request = request("create", &nested, &[("filename", "a.txt"), ("content", "x")]);

    create_file(&request).expect("create");

    assert!(nested.join("a.txt").is_file());
}

#[rstest]
#[case::missing_filename(&[("content", "x")], "missing required parameter 'filename'")]
#[case::missing_content(&[("filename", "a.txt")], "missing required parameter 'content'")]
#[case::absolute(&[("filename", "/etc/passwd"), ("content", "x")], "absolute paths are not allowed")]
#[case::traversal(&[("filename", "../a.txt"), ("content", "x")], "path traversal is not allowed")]
#[case::empty(&[("filename", ""), ("content", "x")], "filename must not be empty")]
fn create_rejects_bad_parameters(
    base: TempDir,
    #[case] params: &[(&str, &str)],
    #[case] expected: &str,
) {
    let err = create_file(&request("create", base.path(), params)).expect_err("should fail");
    assert!(
        err.to_string().contains(expected),
        "expected '{expected}' in '{err}'"
    );
}

#[test]
fn non_string_parameter_is_rejected() {
    let mut params = ValueMap::new();
    params.insert("filename".into(), Value::from(7_i64));
    params.insert("content".into(), Value::from("x"));
    let request = OperationRequest::new("F", "create").with_operation_params(params);

    let err = create_file(&request).expect_err("should fail");

    assert!(matches!(
        err,
        FileOperationError::NotAString { name: "filename" }
    ));
}

// ---------------------------------------------------------------------------
// read
// ---------------------------------------------------------------------------

#[rstest]
fn read_loads_payload_and_sets_path(base: TempDir) {
    fs::write(base.path().join("t.txt"), "Hello").expect("seed file");
    let request = request("read", base.path(), &[("filename", "t.txt")]);

    let context = read_file(&request).expect("read");

    assert_eq!(context.payload(), b"Hello");
    assert_eq!(
        context.property(READ_PATH_PROPERTY).and_then(Value::as_str),
        Some(base.path().join("t.txt").display().to_string().as_str())
    );
    assert_eq!(context.message_id(), "msg-1");
}

#[rstest]
fn read_of_missing_file_fails(base: TempDir) {
    let request = request("read", base.path(), &[("filename", "missing.txt")]);

    let err = read_file(&request).expect_err("should fail");

    assert!(matches!(err, FileOperationError::Read { .. }));
    assert!(err.to_string().contains("missing.txt"));
}

// ---------------------------------------------------------------------------
// Operation table
// ---------------------------------------------------------------------------

#[rstest]
fn table_failure_echoes_context_with_empty_payload(base: TempDir) {
    let request = request("read", base.path(), &[("filename", "missing.txt")]);

    let response = operations().handle(request.clone());

    assert!(!response.is_success());
    assert!(response.message_context().payload().is_empty());
    assert_eq!(response.message_context(), request.message_context());
    assert!(
        response
            .error_message()
            .is_some_and(|message| message.contains("failed to read"))
    );
}

#[rstest]
fn table_rejects_unknown_operations(base: TempDir) {
    let response = operations().handle(request("delete", base.path(), &[]));
    assert_eq!(response.error_message(), Some("unknown operation: delete"));
}

#[test]
fn table_exposes_create_and_read() {
    assert_eq!(operations().names(), vec!["create", "read"]);
}

// ---------------------------------------------------------------------------
// Path resolution
// ---------------------------------------------------------------------------

#[rstest]
#[case("./data", "t.txt", "data/t.txt")]
#[case(".", "t.txt", "t.txt")]
#[case("data", "./sub/t.txt", "data/sub/t.txt")]
#[case("/srv/files", "t.txt", "/srv/files/t.txt")]
fn resolve_target_drops_current_dir_components(
    #[case] base: &str,
    #[case] filename: &str,
    #[case] expected: &str,
) {
    let resolved = resolve_target(Path::new(base), filename).expect("resolve");
    assert_eq!(resolved, Path::new(expected));
}

#[test]
fn default_base_directory_is_current_dir() {
    let mut params = ValueMap::new();
    params.insert("filename".into(), Value::from("definitely-missing-file.txt"));
    let request = OperationRequest::new("F", "read").with_operation_params(params);

    let err = read_file(&request).expect_err("should fail");

    match err {
        FileOperationError::Read { path, .. } => {
            assert_eq!(path, Path::new("definitely-missing-file.txt"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
