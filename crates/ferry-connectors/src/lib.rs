//! Connector supervision and invocation for ferry.
//!
//! The `ferry-connectors` crate lets a host call operations on connectors
//! that run as separate worker processes. Each connector type is described
//! by a [`ConnectorDefinition`]; the worker for a definition is started
//! lazily on first use, kept alive for reuse, and stopped when the host
//! shuts down.
//!
//! # Architecture
//!
//! * [`DefinitionStore`] is the read-only table of known connectors, built
//!   from [`DefinitionRecord`]s (see [`loader`] for the on-disk format).
//! * [`ProcessSupervisor`] owns the running worker instances and starts
//!   them through a [`ProcessLauncher`].
//! * [`InvocationBroker`] performs one request/response exchange with a
//!   worker over loopback TCP using the `ferry-protocol` codec.
//! * [`ConnectorManager`] is the facade hosts use: it resolves, starts, and
//!   calls a connector, converting every failure into an [`InvokeError`]
//!   that still carries a well-formed failure response.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use ferry_connectors::{ConnectorManager, ManagerSettings, loader};
//! use ferry_protocol::{MessageContext, Value, ValueMap};
//!
//! let store = loader::load_definitions_dir(Path::new("./connector-definitions"))
//!     .expect("definitions load");
//! let manager = ConnectorManager::new(Arc::new(store), ManagerSettings::new("./connectors"));
//!
//! let mut params = ValueMap::new();
//! params.insert("filename".into(), Value::from("notes.txt"));
//! let response = manager
//!     .invoke("SimpleFileConnector", "read", None, params, MessageContext::new("msg-1"))
//!     .unwrap_or_else(|err| err.into_response());
//! println!("success: {}", response.is_success());
//! manager.shutdown_all();
//! ```

pub mod broker;
pub mod definition;
pub mod error;
pub mod loader;
pub mod manager;
pub mod process;
pub mod settings;
pub mod store;
pub mod supervisor;

#[cfg(test)]
mod tests;

pub use self::broker::InvocationBroker;
pub use self::definition::{ConnectorDefinition, DefinitionRecord};
pub use self::error::{ConnectorError, ErrorCategory};
pub use self::manager::{ConnectorManager, InvokeError};
pub use self::process::{Liveness, OsLauncher, ProcessLauncher, WorkerProcess};
pub use self::settings::ManagerSettings;
pub use self::store::DefinitionStore;
pub use self::supervisor::{InstanceState, ProcessSupervisor, RunningInstance};
