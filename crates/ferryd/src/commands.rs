//! Implementations of the `invoke` and `demo` commands.

use std::io::Write;
use std::sync::Arc;
use std::thread;

use ferry_connectors::loader::load_definitions_dir;
use ferry_connectors::{ConnectorManager, ProcessLauncher};
use ferry_protocol::{MessageContext, OperationResponse, Value, ValueMap};
use ferry_runtime::ShutdownSignal;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cli::InvokeArgs;
use crate::config::Config;
use crate::errors::AppError;

const COMMAND_TARGET: &str = "ferryd::commands";

/// File written and read back by the demo flow.
pub(crate) const DEMO_FILENAME: &str = "poc_output.txt";
/// Leading text of the content written by the demo flow.
pub(crate) const DEMO_GREETING: &str = "Hello from the ferry connector host! Timestamp: ";

/// Loads the definitions named by `config` and builds an OS-backed manager.
pub(crate) fn build_manager(config: &Config) -> Result<ConnectorManager, AppError> {
    let store =
        load_definitions_dir(config.definitions_dir()).map_err(AppError::LoadDefinitions)?;
    Ok(ConnectorManager::new(Arc::new(store), config.manager_settings()))
}

/// Runs one invocation, prints the response and shuts the workers down.
///
/// Returns whether the invocation succeeded.
pub(crate) fn invoke<L, W>(
    manager: &ConnectorManager<L>,
    args: InvokeArgs,
    stdout: &mut W,
) -> Result<bool, AppError>
where
    L: ProcessLauncher,
    W: Write,
{
    let InvokeArgs {
        connector,
        operation,
        params,
        config,
        payload,
        message_id,
    } = args;

    let mut context =
        MessageContext::new(message_id.unwrap_or_else(|| Uuid::new_v4().to_string()));
    if let Some(text) = payload {
        context.set_payload(text);
    }
    let config_override = (!config.is_empty()).then(|| config.into_iter().collect::<ValueMap>());
    let params: ValueMap = params.into_iter().collect();

    let response = manager
        .invoke(&connector, &operation, config_override, params, context)
        .unwrap_or_else(|error| error.into_response());
    let stopped = manager.shutdown_all();
    debug!(target: COMMAND_TARGET, stopped, "workers stopped after invoke");

    let rendered = serde_json::to_string_pretty(&response).map_err(AppError::Render)?;
    writeln!(stdout, "{rendered}").map_err(AppError::Output)?;
    Ok(response.is_success())
}

/// Responses collected by the demo flow.
#[derive(Debug)]
pub(crate) struct DemoOutcome {
    pub(crate) created: OperationResponse,
    pub(crate) read: OperationResponse,
}

/// Runs the sample flow alongside the shutdown wait, then stops every worker.
pub(crate) fn demo<L: ProcessLauncher>(
    manager: &ConnectorManager<L>,
    connector: &str,
    shutdown: &mut dyn ShutdownSignal,
) -> Result<DemoOutcome, AppError> {
    let outcome = thread::scope(|scope| {
        let flow = scope.spawn(|| run_sample_flow(manager, connector));
        let waited = shutdown.wait();
        let outcome = flow.join().map_err(|_| AppError::DemoPanicked);
        waited?;
        outcome
    });
    let stopped = manager.shutdown_all();
    info!(target: COMMAND_TARGET, stopped, "shutdown complete");
    outcome
}

fn run_sample_flow<L: ProcessLauncher>(
    manager: &ConnectorManager<L>,
    connector: &str,
) -> DemoOutcome {
    let stamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| OffsetDateTime::now_utc().unix_timestamp().to_string());
    let create_params = params([
        ("filename", Value::from(DEMO_FILENAME)),
        ("content", Value::from(format!("{DEMO_GREETING}{stamp}"))),
    ]);
    let create_context = MessageContext::new(Uuid::new_v4().to_string())
        .with_payload("<original_payload>data</original_payload>")
        .with_property("flowName", "fileCreateFlow")
        .with_header("X-Request-ID", "123");
    let created = invoke_logged(manager, connector, "create", create_params, create_context);

    let read_params = params([("filename", Value::from(DEMO_FILENAME))]);
    let read_context = MessageContext::new(Uuid::new_v4().to_string())
        .with_property("flowName", "fileReadFlow");
    let read = invoke_logged(manager, connector, "read", read_params, read_context);

    DemoOutcome { created, read }
}

fn invoke_logged<L: ProcessLauncher>(
    manager: &ConnectorManager<L>,
    connector: &str,
    operation: &str,
    operation_params: ValueMap,
    context: MessageContext,
) -> OperationResponse {
    let response = match manager.invoke(connector, operation, None, operation_params, context) {
        Ok(response) => response,
        Err(error) => {
            warn!(
                target: COMMAND_TARGET,
                connector,
                operation,
                %error,
                "demo invocation failed"
            );
            return error.into_response();
        }
    };

    let out = response.message_context();
    if response.is_success() {
        info!(
            target: COMMAND_TARGET,
            connector,
            operation,
            payload = %String::from_utf8_lossy(out.payload()),
            properties = ?out.properties(),
            "demo operation succeeded"
        );
    } else {
        warn!(
            target: COMMAND_TARGET,
            connector,
            operation,
            reason = response.error_message().unwrap_or_default(),
            "demo operation failed"
        );
    }
    response
}

fn params<const N: usize>(entries: [(&str, Value); N]) -> ValueMap {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_owned(), value))
        .collect()
}
