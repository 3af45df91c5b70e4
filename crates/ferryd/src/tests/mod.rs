//! Unit tests for the host runtime.

use std::fs;
use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use ferry_connectors::{
    ConnectorDefinition, ConnectorError, ConnectorManager, DefinitionStore, Liveness,
    ManagerSettings, ProcessLauncher, WorkerProcess,
};
use ferry_file_connector::{BASE_DIRECTORY_KEY, operations};
use ferry_protocol::{OperationResponse, Value, ValueMap};
use ferry_runtime::{LogFormat, ShutdownError, ShutdownSignal};
use ferry_worker::{ConnectorServer, ServerHandle};
use rstest::{fixture, rstest};
use tempfile::TempDir;

use crate::cli::{Cli, CliCommand, DEFAULT_DEMO_CONNECTOR, parse_assignment};
use crate::commands::{self, DEMO_FILENAME, DEMO_GREETING};
use crate::config::Config;

const CONNECTOR: &str = "SimpleFileConnector";
const EXECUTABLE: &str = "file-connector";

// ---------------------------------------------------------------------------
// Argument parsing
// ---------------------------------------------------------------------------

#[rstest]
#[case("count=42", "count", Value::from(42_i64))]
#[case("flag=true", "flag", Value::from(true))]
#[case("name=report.txt", "name", Value::from("report.txt"))]
#[case("quoted=\"7\"", "quoted", Value::from("7"))]
#[case("empty=", "empty", Value::from(""))]
#[case("expr=a=b", "expr", Value::from("a=b"))]
fn assignments_parse_json_or_fall_back_to_strings(
    #[case] raw: &str,
    #[case] key: &str,
    #[case] expected: Value,
) {
    assert_eq!(
        parse_assignment(raw).expect("parse"),
        (key.to_owned(), expected)
    );
}

#[rstest]
#[case("no-separator")]
#[case("=value")]
fn malformed_assignments_are_rejected(#[case] raw: &str) {
    assert!(parse_assignment(raw).is_err());
}

#[test]
fn invoke_arguments_are_collected() {
    let cli = Cli::try_parse_from([
        "ferryd",
        "invoke",
        CONNECTOR,
        "create",
        "--param",
        "filename=a.txt",
        "--param",
        "content=hi",
        "--config",
        "baseDirectory=/tmp/out",
        "--message-id",
        "m-1",
    ])
    .expect("parse");

    let CliCommand::Invoke(args) = cli.command else {
        panic!("expected invoke");
    };
    assert_eq!(args.connector, CONNECTOR);
    assert_eq!(args.operation, "create");
    assert_eq!(args.params.len(), 2);
    assert_eq!(
        args.config,
        vec![("baseDirectory".to_owned(), Value::from("/tmp/out"))]
    );
    assert_eq!(args.message_id.as_deref(), Some("m-1"));
    assert!(args.payload.is_none());
}

#[test]
fn demo_defaults_to_the_file_connector() {
    let cli = Cli::try_parse_from(["ferryd", "demo"]).expect("parse");
    let CliCommand::Demo(args) = cli.command else {
        panic!("expected demo");
    };
    assert_eq!(args.connector, DEFAULT_DEMO_CONNECTOR);
}

#[test]
fn global_flags_follow_the_subcommand() {
    let cli = Cli::try_parse_from([
        "ferryd",
        "demo",
        "--log-format",
        "JSON",
        "--readiness-delay-ms",
        "250",
        "--connectors-dir",
        "/opt/connectors",
    ])
    .expect("parse");

    assert_eq!(cli.config.log_settings().format(), LogFormat::Json);
    let settings = cli.config.manager_settings();
    assert_eq!(settings.readiness_delay(), Duration::from_millis(250));
    assert_eq!(settings.connectors_dir(), Path::new("/opt/connectors"));
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn default_config_matches_documented_defaults() {
    let config = Config::default();
    let settings = config.manager_settings();

    assert_eq!(config.definitions_dir(), Path::new("./connector-definitions"));
    assert_eq!(config.log_settings().filter(), "info");
    assert_eq!(config.log_settings().format(), LogFormat::Compact);
    assert_eq!(settings.connectors_dir(), Path::new("./connectors"));
    assert_eq!(settings.readiness_delay(), Duration::from_secs(1));
    assert_eq!(settings.connect_timeout(), Duration::from_secs(5));
    assert_eq!(settings.shutdown_grace(), Duration::from_secs(5));
}

#[test]
fn unknown_log_formats_are_usage_errors() {
    let err = Cli::try_parse_from(["ferryd", "--log-format", "yaml", "demo"])
        .expect_err("should fail");
    assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
}

// ---------------------------------------------------------------------------
// Commands against an in-process file connector
// ---------------------------------------------------------------------------

/// Worker handle that stays running until it is asked to stop.
#[derive(Debug, Default)]
struct InProcessWorker {
    stopped: bool,
}

impl WorkerProcess for InProcessWorker {
    fn id(&self) -> u32 {
        1
    }

    fn poll(&mut self) -> io::Result<Liveness> {
        Ok(if self.stopped {
            Liveness::Exited { code: Some(0) }
        } else {
            Liveness::Running
        })
    }

    fn interrupt(&mut self) -> io::Result<()> {
        self.stopped = true;
        Ok(())
    }

    fn kill(&mut self) -> io::Result<()> {
        self.stopped = true;
        Ok(())
    }

    fn wait(&mut self) -> io::Result<Liveness> {
        self.stopped = true;
        self.poll()
    }
}

/// Launcher whose "workers" are already served in-process.
#[derive(Debug, Default)]
struct InProcessLauncher;

impl ProcessLauncher for InProcessLauncher {
    fn launch(
        &self,
        _definition: &ConnectorDefinition,
        _executable: &Path,
    ) -> Result<Box<dyn WorkerProcess>, ConnectorError> {
        Ok(Box::new(InProcessWorker::default()))
    }
}

struct Host {
    manager: ConnectorManager<InProcessLauncher>,
    base: TempDir,
    _connectors: TempDir,
    _worker: ServerHandle,
}

#[fixture]
fn host() -> Host {
    let worker = ConnectorServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
        .expect("bind worker")
        .start(operations())
        .expect("start worker");
    let connectors = TempDir::new().expect("connectors dir");
    fs::write(connectors.path().join(EXECUTABLE), b"").expect("placeholder executable");
    let base = TempDir::new().expect("base dir");

    let mut defaults = ValueMap::new();
    defaults.insert(
        BASE_DIRECTORY_KEY.into(),
        Value::from(base.path().display().to_string()),
    );
    let definition = ConnectorDefinition::new(CONNECTOR, EXECUTABLE, worker.local_addr().port())
        .with_default_config(defaults);
    let settings = ManagerSettings::new(connectors.path())
        .with_readiness_delay(Duration::ZERO)
        .with_shutdown_grace(Duration::from_millis(100));
    let manager = ConnectorManager::with_launcher(
        Arc::new(DefinitionStore::from_definitions([definition])),
        InProcessLauncher,
        settings,
    );

    Host {
        manager,
        base,
        _connectors: connectors,
        _worker: worker,
    }
}

fn invoke_args(argv: &[&str]) -> crate::cli::InvokeArgs {
    let mut full = vec!["ferryd", "invoke"];
    full.extend_from_slice(argv);
    let cli = Cli::try_parse_from(full).expect("parse");
    match cli.command {
        CliCommand::Invoke(args) => args,
        CliCommand::Demo(_) => panic!("expected invoke"),
    }
}

fn printed_response(stdout: &[u8]) -> OperationResponse {
    serde_json::from_slice(stdout).expect("response JSON")
}

#[rstest]
fn invoke_prints_the_response_and_stops_workers(host: Host) {
    let mut stdout = Vec::new();
    let args = invoke_args(&[
        CONNECTOR,
        "create",
        "--param",
        "filename=out.txt",
        "--param",
        "content=hello",
        "--message-id",
        "msg-7",
    ]);

    let succeeded = commands::invoke(&host.manager, args, &mut stdout).expect("invoke");

    assert!(succeeded);
    let response = printed_response(&stdout);
    assert!(response.is_success());
    assert_eq!(response.message_context().message_id(), "msg-7");
    assert_eq!(
        fs::read_to_string(host.base.path().join("out.txt")).expect("written file"),
        "hello"
    );
    assert_eq!(host.manager.supervisor().running_count(), 0);
}

#[rstest]
fn invoke_generates_a_message_id_and_carries_the_payload(host: Host) {
    fs::write(host.base.path().join("in.txt"), "stored").expect("seed file");
    let mut stdout = Vec::new();
    let args = invoke_args(&[
        CONNECTOR,
        "read",
        "--param",
        "filename=in.txt",
        "--payload",
        "ignored",
    ]);

    commands::invoke(&host.manager, args, &mut stdout).expect("invoke");

    let response = printed_response(&stdout);
    assert_eq!(response.message_context().payload(), b"stored");
    assert!(uuid::Uuid::parse_str(response.message_context().message_id()).is_ok());
}

#[rstest]
fn invoke_applies_config_overrides(host: Host) {
    let elsewhere = TempDir::new().expect("override dir");
    let override_arg = format!("baseDirectory={}", elsewhere.path().display());
    let mut stdout = Vec::new();
    let args = invoke_args(&[
        CONNECTOR,
        "create",
        "--param",
        "filename=o.txt",
        "--param",
        "content=x",
        "--config",
        &override_arg,
    ]);

    assert!(commands::invoke(&host.manager, args, &mut stdout).expect("invoke"));
    assert!(elsewhere.path().join("o.txt").is_file());
    assert!(!host.base.path().join("o.txt").exists());
}

#[rstest]
#[case::business_failure(CONNECTOR, "read")]
#[case::unknown_connector("Missing", "read")]
fn failed_invocations_report_failure(
    host: Host,
    #[case] connector: &str,
    #[case] operation: &str,
) {
    let mut stdout = Vec::new();
    let args = invoke_args(&[
        connector,
        operation,
        "--param",
        "filename=absent.txt",
        "--message-id",
        "msg-f",
    ]);

    let succeeded = commands::invoke(&host.manager, args, &mut stdout).expect("invoke");

    assert!(!succeeded);
    let response = printed_response(&stdout);
    assert!(!response.is_success());
    assert!(response.error_message().is_some());
    assert_eq!(response.message_context().message_id(), "msg-f");
}

/// Shutdown signal that fires immediately.
struct Immediate;

impl ShutdownSignal for Immediate {
    fn wait(&mut self) -> Result<(), ShutdownError> {
        Ok(())
    }
}

#[rstest]
fn demo_creates_then_reads_the_sample_file(host: Host) {
    let outcome = commands::demo(&host.manager, CONNECTOR, &mut Immediate).expect("demo");

    assert!(outcome.created.is_success());
    assert!(outcome.read.is_success());
    let payload = String::from_utf8(outcome.read.message_context().payload().to_vec())
        .expect("utf-8 payload");
    assert!(payload.starts_with(DEMO_GREETING), "{payload}");
    assert!(host.base.path().join(DEMO_FILENAME).is_file());
    assert_eq!(host.manager.supervisor().running_count(), 0);
}

#[rstest]
fn demo_against_an_unknown_connector_still_completes(host: Host) {
    let outcome = commands::demo(&host.manager, "Missing", &mut Immediate).expect("demo");

    assert!(!outcome.created.is_success());
    assert!(!outcome.read.is_success());
}
