//! Dispatch of decoded requests to connector operations.

use std::collections::BTreeMap;
use std::fmt;

use ferry_protocol::{MessageContext, OperationRequest, OperationResponse};

/// Handles one decoded request and produces exactly one response.
pub trait OperationHandler: Send + Sync + 'static {
    /// Handles the request. Implementations should report failures as
    /// `success == false` responses rather than panicking.
    fn handle(&self, request: OperationRequest) -> OperationResponse;
}

impl<F> OperationHandler for F
where
    F: Fn(OperationRequest) -> OperationResponse + Send + Sync + 'static,
{
    fn handle(&self, request: OperationRequest) -> OperationResponse {
        self(request)
    }
}

type Operation = Box<dyn Fn(&OperationRequest) -> Result<MessageContext, String> + Send + Sync>;

/// Name-keyed table of operation functions.
///
/// An operation returns the output context on success or a message on
/// failure; failures echo the request's input context.
///
/// # Example
///
/// ```
/// use ferry_protocol::{MessageContext, OperationRequest};
/// use ferry_worker::{OperationHandler, OperationTable};
///
/// let table = OperationTable::new()
///     .with_operation("ping", |request| Ok(request.message_context().clone()));
///
/// let response = table.handle(
///     OperationRequest::new("demo", "ping").with_message_context(MessageContext::new("m1")),
/// );
/// assert!(response.is_success());
///
/// let response = table.handle(OperationRequest::new("demo", "pong"));
/// assert_eq!(response.error_message(), Some("unknown operation: pong"));
/// ```
#[derive(Default)]
pub struct OperationTable {
    operations: BTreeMap<String, Operation>,
}

impl fmt::Debug for OperationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationTable")
            .field("operations", &self.names())
            .finish()
    }
}

impl OperationTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an operation, replacing any existing one with the same name.
    #[must_use]
    pub fn with_operation<F>(mut self, name: impl Into<String>, operation: F) -> Self
    where
        F: Fn(&OperationRequest) -> Result<MessageContext, String> + Send + Sync + 'static,
    {
        self.register(name, operation);
        self
    }

    /// Registers an operation, replacing any existing one with the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, operation: F)
    where
        F: Fn(&OperationRequest) -> Result<MessageContext, String> + Send + Sync + 'static,
    {
        self.operations.insert(name.into(), Box::new(operation));
    }

    /// Returns the registered operation names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.operations.keys().map(String::as_str).collect()
    }

    /// Runs the operation named by `request`.
    #[must_use]
    pub fn dispatch(&self, request: &OperationRequest) -> OperationResponse {
        let Some(operation) = self.operations.get(request.operation_name()) else {
            return OperationResponse::failure(
                request.message_context().clone(),
                format!("unknown operation: {}", request.operation_name()),
            );
        };
        match operation(request) {
            Ok(context) => OperationResponse::success(context),
            Err(message) => OperationResponse::failure(request.message_context().clone(), message),
        }
    }
}

impl OperationHandler for OperationTable {
    fn handle(&self, request: OperationRequest) -> OperationResponse {
        self.dispatch(&request)
    }
}
