//! Error types for the host runtime.

use std::io;

use ferry_connectors::ConnectorError;
use ferry_runtime::{ShutdownError, TelemetryError};
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to initialise telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("failed to load connector definitions: {0}")]
    LoadDefinitions(#[source] ConnectorError),
    #[error("failed to render response: {0}")]
    Render(#[source] serde_json::Error),
    #[error("failed to write output: {0}")]
    Output(#[source] io::Error),
    #[error("shutdown signal handling failed: {0}")]
    Shutdown(#[from] ShutdownError),
    #[error("the demo flow panicked")]
    DemoPanicked,
}
