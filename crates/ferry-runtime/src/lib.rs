//! Process-level plumbing shared by ferry binaries.
//!
//! Both the host and connector workers write structured logs to standard
//! error and stop on termination signals. [`telemetry::initialise`] installs
//! the process-wide subscriber described by [`LogSettings`], and
//! [`SignalListener`] waits for the signals a binary cares about.
//!
//! ```no_run
//! use ferry_runtime::{LogFormat, LogSettings, ShutdownSignal, SignalListener, telemetry};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut listener = SignalListener::install(&SignalListener::WORKER_SIGNALS)?;
//! telemetry::initialise(&LogSettings::new("info", LogFormat::Compact))?;
//! // ... serve ...
//! listener.wait()?;
//! # Ok(())
//! # }
//! ```

pub mod logging;
pub mod shutdown;
pub mod telemetry;

pub use self::logging::{LogFormat, LogSettings};
pub use self::shutdown::{ShutdownError, ShutdownSignal, SignalListener};
pub use self::telemetry::{TelemetryError, TelemetryHandle};
