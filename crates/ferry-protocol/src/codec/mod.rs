//! JSONL framing for protocol messages.
//!
//! Each message is one JSON document followed by a newline. A connection
//! carries exactly one message in each direction, so the decoder reads a
//! single line and never looks past it.

use std::io::{BufRead, Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ProtocolError;

/// Upper bound on the encoded size of a single message, newline included.
pub const MAX_MESSAGE_BYTES: u64 = 16 * 1024 * 1024;

/// Writes `message` as a single JSONL line and flushes the writer.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if serialisation fails or
/// [`ProtocolError::Io`] if the write or flush fails.
pub fn encode_message<T: Serialize>(
    mut writer: impl Write,
    message: &T,
) -> Result<(), ProtocolError> {
    let mut line = serde_json::to_vec(message).map_err(ProtocolError::Encode)?;
    line.push(b'\n');
    writer.write_all(&line)?;
    writer.flush()?;
    Ok(())
}

/// Reads exactly one JSONL line from `reader` and decodes it.
///
/// A final line without a trailing newline is still decoded, so peers that
/// close the stream straight after writing are accepted.
///
/// # Errors
///
/// Returns [`ProtocolError::ConnectionClosed`] when the stream ends before any
/// byte arrives, [`ProtocolError::MessageTooLarge`] when the line exceeds
/// [`MAX_MESSAGE_BYTES`], [`ProtocolError::Malformed`] for invalid or
/// truncated JSON, and [`ProtocolError::Io`] for read failures.
pub fn decode_message<T: DeserializeOwned>(mut reader: impl BufRead) -> Result<T, ProtocolError> {
    let mut line = Vec::new();
    let bytes_read = reader
        .by_ref()
        .take(MAX_MESSAGE_BYTES)
        .read_until(b'\n', &mut line)?;

    if bytes_read == 0 {
        return Err(ProtocolError::ConnectionClosed);
    }

    let terminated = line.last() == Some(&b'\n');
    if !terminated && u64::try_from(bytes_read).unwrap_or(u64::MAX) >= MAX_MESSAGE_BYTES {
        return Err(ProtocolError::MessageTooLarge {
            limit: MAX_MESSAGE_BYTES,
        });
    }

    serde_json::from_slice(line.trim_ascii_end()).map_err(|err| {
        let message = if err.is_eof() {
            format!("message truncated after {bytes_read} bytes: {err}")
        } else {
            err.to_string()
        };
        ProtocolError::Malformed {
            message,
            source: Some(err),
        }
    })
}
