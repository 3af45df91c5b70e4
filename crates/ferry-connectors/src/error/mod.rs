//! Domain errors raised by connector operations.
//!
//! All errors use `thiserror`-derived enums with structured context so callers
//! can inspect the failure programmatically. I/O errors are wrapped in `Arc`
//! to satisfy the `result_large_err` Clippy lint.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use ferry_protocol::ProtocolError;
use thiserror::Error;

/// Broad failure classes used when reporting invocation outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The connector is unknown or its definition is unusable.
    Definition,
    /// The worker process could not be started.
    Spawn,
    /// The connection or the message exchange failed.
    Transport,
    /// A worker process could not be terminated.
    Shutdown,
}

impl ErrorCategory {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Definition => "definition",
            Self::Spawn => "spawn",
            Self::Transport => "transport",
            Self::Shutdown => "shutdown",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors arising from connector supervision and invocation.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// No definition is registered under the requested name.
    #[error("connector definition for '{name}' not found")]
    DefinitionNotFound {
        /// Name that was looked up.
        name: String,
    },

    /// A definition record failed validation.
    #[error("invalid connector definition: {message}")]
    InvalidDefinition {
        /// Description of the validation failure.
        message: String,
    },

    /// The definitions directory could not be read.
    #[error("failed to read connector definitions directory '{path}': {source}")]
    DefinitionsDirectory {
        /// Directory that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The connector executable does not exist.
    #[error("connector '{name}' executable not found at {path}")]
    ExecutableNotFound {
        /// Connector name.
        name: String,
        /// Path that was checked.
        path: PathBuf,
    },

    /// The operating system refused to start the worker process.
    #[error("failed to start connector '{name}': {message}")]
    SpawnFailed {
        /// Connector name.
        name: String,
        /// Human-readable failure description.
        message: String,
        /// Optional underlying I/O error.
        #[source]
        source: Option<Arc<std::io::Error>>,
    },

    /// Connecting to the worker timed out or was refused.
    #[error("failed to connect to connector '{name}' at {addr}: {source}")]
    Connect {
        /// Connector name.
        name: String,
        /// Address that was dialled.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The request could not be written to the worker.
    #[error("failed to send request to connector '{name}': {source}")]
    Encode {
        /// Connector name.
        name: String,
        /// Underlying protocol error.
        #[source]
        source: ProtocolError,
    },

    /// The worker's response could not be read or decoded.
    #[error("failed to decode response from connector '{name}': {source}")]
    Decode {
        /// Connector name.
        name: String,
        /// Underlying protocol error.
        #[source]
        source: ProtocolError,
    },

    /// A worker process could not be signalled, killed, or reaped.
    #[error("failed to terminate connector '{name}' (pid {pid}): {source}")]
    Terminate {
        /// Connector name.
        name: String,
        /// Process id of the worker.
        pid: u32,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl ConnectorError {
    /// Classifies the error for reporting.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::DefinitionNotFound { .. }
            | Self::InvalidDefinition { .. }
            | Self::DefinitionsDirectory { .. } => ErrorCategory::Definition,
            Self::ExecutableNotFound { .. } | Self::SpawnFailed { .. } => ErrorCategory::Spawn,
            Self::Connect { .. } | Self::Encode { .. } | Self::Decode { .. } => {
                ErrorCategory::Transport
            }
            Self::Terminate { .. } => ErrorCategory::Shutdown,
        }
    }

    /// Returns `true` for connect, encode, and decode failures.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self.category(), ErrorCategory::Transport)
    }
}
