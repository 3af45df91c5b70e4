//! Wire protocol shared by the ferry host and its connector workers.
//!
//! A connector invocation is a single request/response exchange over a
//! freshly opened TCP connection. The broker writes one [`OperationRequest`]
//! as a JSONL line, the worker answers with one [`OperationResponse`] line,
//! and the connection is closed. Both directions use the same [`codec`]
//! functions, so the host and workers stay symmetric.
//!
//! Dynamic configuration, parameters, and message properties use the closed
//! [`Value`] type rather than arbitrary JSON so merging and encoding have an
//! exhaustively handled shape.
//!
//! # Example
//!
//! ```
//! use ferry_protocol::{MessageContext, OperationRequest, Value, ValueMap};
//! use ferry_protocol::codec::{decode_message, encode_message};
//!
//! let mut params = ValueMap::new();
//! params.insert("filename".into(), Value::from("notes.txt"));
//! let request = OperationRequest::new("files", "read")
//!     .with_operation_params(params)
//!     .with_message_context(MessageContext::new("msg-1"));
//!
//! let mut wire = Vec::new();
//! encode_message(&mut wire, &request).unwrap();
//! let decoded: OperationRequest = decode_message(wire.as_slice()).unwrap();
//! assert_eq!(decoded, request);
//! ```

pub mod codec;
pub mod error;
pub mod message;
pub mod value;

pub use self::codec::{MAX_MESSAGE_BYTES, decode_message, encode_message};
pub use self::error::ProtocolError;
pub use self::message::{HeaderMap, MessageContext, OperationRequest, OperationResponse};
pub use self::value::{Value, ValueMap, merge_config};
