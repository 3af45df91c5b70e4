//! Public entry point for invoking connector operations.
//!
//! The [`ConnectorManager`] ties the definition store, the process
//! supervisor, and the invocation broker together. Every invocation either
//! returns the worker's response unchanged, including business failures, or
//! an [`InvokeError`] carrying both the underlying [`ConnectorError`] and a
//! synthetic failure response that echoes the caller's input context.

use std::sync::Arc;

use ferry_protocol::{MessageContext, OperationRequest, OperationResponse, ValueMap};
use thiserror::Error;
use tracing::{debug, warn};

use crate::broker::InvocationBroker;
use crate::error::ConnectorError;
use crate::process::{OsLauncher, ProcessLauncher};
use crate::settings::ManagerSettings;
use crate::store::DefinitionStore;
use crate::supervisor::{InstanceState, ProcessSupervisor};

/// Tracing target for manager operations.
const MANAGER_TARGET: &str = "ferry_connectors::manager";

/// Failure of a whole invocation.
///
/// The [`response`](Self::response) is what a caller that only deals in
/// responses should see: `success == false`, the input context echoed, and
/// the error rendered as the message.
#[derive(Debug, Error)]
#[error("connector invocation failed: {error}")]
pub struct InvokeError {
    response: Box<OperationResponse>,
    #[source]
    error: ConnectorError,
}

impl InvokeError {
    fn new(context: MessageContext, error: ConnectorError) -> Self {
        Self {
            response: Box::new(OperationResponse::failure(context, error.to_string())),
            error,
        }
    }

    /// Returns the synthetic failure response.
    #[must_use]
    pub fn response(&self) -> &OperationResponse {
        &self.response
    }

    /// Consumes the error, returning the synthetic failure response.
    #[must_use]
    pub fn into_response(self) -> OperationResponse {
        *self.response
    }

    /// Returns the underlying connector error.
    #[must_use]
    pub const fn error(&self) -> &ConnectorError {
        &self.error
    }
}

/// Facade over the supervisor and broker.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use ferry_connectors::{ConnectorManager, DefinitionStore, ManagerSettings};
/// use ferry_protocol::{MessageContext, ValueMap};
///
/// let store = Arc::new(DefinitionStore::new());
/// let manager = ConnectorManager::new(store, ManagerSettings::new("./connectors"));
/// let outcome = manager.invoke(
///     "SimpleFileConnector",
///     "read",
///     None,
///     ValueMap::new(),
///     MessageContext::new("msg-1"),
/// );
/// let response = outcome.unwrap_or_else(|err| err.into_response());
/// assert!(!response.is_success());
/// manager.shutdown_all();
/// ```
#[derive(Debug)]
pub struct ConnectorManager<L = OsLauncher> {
    supervisor: ProcessSupervisor<L>,
    broker: InvocationBroker,
}

impl ConnectorManager<OsLauncher> {
    /// Creates a manager that starts workers as OS child processes.
    #[must_use]
    pub fn new(store: Arc<DefinitionStore>, settings: ManagerSettings) -> Self {
        Self::with_launcher(store, OsLauncher, settings)
    }
}

impl<L> ConnectorManager<L> {
    /// Creates a manager with a custom process launcher.
    #[must_use]
    pub fn with_launcher(
        store: Arc<DefinitionStore>,
        launcher: L,
        settings: ManagerSettings,
    ) -> Self {
        let broker = InvocationBroker::new(settings.connect_timeout());
        Self {
            supervisor: ProcessSupervisor::new(store, launcher, settings),
            broker,
        }
    }

    /// Returns the loaded definitions.
    #[must_use]
    pub fn definitions(&self) -> &DefinitionStore {
        self.supervisor.definitions()
    }

    /// Returns the underlying supervisor.
    #[must_use]
    pub const fn supervisor(&self) -> &ProcessSupervisor<L> {
        &self.supervisor
    }

    /// Reports the worker state for `connector_name`.
    #[must_use]
    pub fn state(&self, connector_name: &str) -> InstanceState {
        self.supervisor.state(connector_name)
    }

    /// Stops every running worker and returns how many were recorded.
    ///
    /// Safe to call more than once; later calls find nothing to stop.
    pub fn shutdown_all(&self) -> usize {
        self.supervisor.shutdown_all()
    }
}

impl<L: ProcessLauncher> ConnectorManager<L> {
    /// Invokes `operation_name` on `connector_name`, starting its worker if
    /// needed.
    ///
    /// `config_override` is merged over the definition's default
    /// configuration; keys it does not mention keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError`] when the definition is unknown, the worker
    /// cannot be started, or the exchange with it fails. A business failure
    /// reported by the worker is an `Ok` response with `success == false`.
    pub fn invoke(
        &self,
        connector_name: &str,
        operation_name: &str,
        config_override: Option<ValueMap>,
        operation_params: ValueMap,
        context: MessageContext,
    ) -> Result<OperationResponse, InvokeError> {
        let echo = context.clone();
        let request = OperationRequest::new(connector_name, operation_name)
            .with_connector_config(config_override.unwrap_or_default())
            .with_operation_params(operation_params)
            .with_message_context(context);

        let outcome = self
            .supervisor
            .ensure_running(connector_name)
            .and_then(|instance| self.broker.call(&instance, request));

        match outcome {
            Ok(response) => {
                debug!(
                    target: MANAGER_TARGET,
                    connector = connector_name,
                    operation = operation_name,
                    success = response.is_success(),
                    "invocation completed"
                );
                Ok(response)
            }
            Err(error) => {
                warn!(
                    target: MANAGER_TARGET,
                    connector = connector_name,
                    operation = operation_name,
                    category = %error.category(),
                    %error,
                    "invocation failed"
                );
                Err(InvokeError::new(echo, error))
            }
        }
    }
}
