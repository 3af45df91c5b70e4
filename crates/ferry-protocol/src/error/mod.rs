//! Errors raised while encoding or decoding protocol messages.
//!
//! I/O errors are wrapped in `Arc` to keep the enum small and `Send + Sync`.

use std::sync::Arc;

use thiserror::Error;

/// Errors arising from the wire codec.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Reading from or writing to the connection failed.
    #[error("connection I/O failed: {source}")]
    Io {
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The peer closed the connection before sending any bytes.
    #[error("connection closed before a message was received")]
    ConnectionClosed,

    /// The peer sent more than the permitted number of bytes for one message.
    #[error("message exceeds the {limit}-byte limit")]
    MessageTooLarge {
        /// Maximum permitted message size in bytes.
        limit: u64,
    },

    /// The received line is not a valid message, or it was truncated.
    #[error("malformed message: {message}")]
    Malformed {
        /// Human-readable description of the parse failure.
        message: String,
        /// Underlying JSON error.
        #[source]
        source: Option<serde_json::Error>,
    },

    /// The message could not be serialised.
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
}

impl From<std::io::Error> for ProtocolError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            source: Arc::new(source),
        }
    }
}
