//! Worker-side toolkit for ferry connectors.
//!
//! A connector worker is a small program that listens on the loopback port
//! it is given, reads one [`OperationRequest`](ferry_protocol::OperationRequest)
//! per connection, runs the named operation, and writes one
//! [`OperationResponse`](ferry_protocol::OperationResponse) back. This crate
//! provides the listener ([`ConnectorServer`]), the per-connection loop
//! ([`serve_connection`]), and a name-keyed [`OperationTable`] so a connector
//! only has to supply its operations.
//!
//! # Example
//!
//! ```no_run
//! use std::net::{IpAddr, Ipv4Addr};
//!
//! use ferry_worker::{ConnectorServer, OperationTable};
//!
//! let table = OperationTable::new()
//!     .with_operation("ping", |request| Ok(request.message_context().clone()));
//! let server = ConnectorServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 9101)
//!     .expect("bind")
//!     .start(table)
//!     .expect("start");
//! // ... wait for a termination signal ...
//! server.shutdown();
//! server.join().expect("accept loop exits");
//! ```

pub mod error;
pub mod operations;
pub mod server;

pub use self::error::ServeError;
pub use self::operations::{OperationHandler, OperationTable};
pub use self::server::{ConnectorServer, DEFAULT_READ_TIMEOUT, ServerHandle, serve_connection};
