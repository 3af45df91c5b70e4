//! Errors raised while serving connector requests.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use ferry_protocol::ProtocolError;
use thiserror::Error;

/// Errors surfaced while binding, running, or answering on a worker socket.
#[derive(Debug, Error)]
pub enum ServeError {
    /// The listening socket could not be bound.
    #[error("failed to bind connector listener at {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// A socket could not be configured.
    #[error("failed to configure connector socket: {source}")]
    Socket {
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The response could not be written back to the caller.
    #[error("failed to send response: {source}")]
    Respond {
        /// Underlying protocol error.
        #[source]
        source: ProtocolError,
    },

    /// The accept loop thread panicked.
    #[error("connector listener thread panicked")]
    ThreadPanic,
}
