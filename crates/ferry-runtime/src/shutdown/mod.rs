//! Blocking on termination signals.

use std::ffi::c_int;
use std::io;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::{debug, info};

const SHUTDOWN_TARGET: &str = "ferry_runtime::shutdown";

/// Something a process can block on until it should shut down.
pub trait ShutdownSignal: Send {
    /// Blocks until shutdown should proceed.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError`] when the notification source fails.
    fn wait(&mut self) -> Result<(), ShutdownError>;
}

/// Errors reported by shutdown listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Registering the signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Listener registered for a fixed set of signals.
///
/// Registration happens in [`SignalListener::install`], so signals that
/// arrive before [`ShutdownSignal::wait`] is called are not lost.
pub struct SignalListener {
    signals: Signals,
}

impl SignalListener {
    /// Signals a host stops on.
    pub const HOST_SIGNALS: [c_int; 4] = [SIGTERM, SIGINT, SIGQUIT, SIGHUP];
    /// Signals a connector worker stops on; the host interrupts with SIGINT.
    pub const WORKER_SIGNALS: [c_int; 2] = [SIGINT, SIGTERM];

    /// Registers handlers for `wanted`, replacing their default actions.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError::Install`] if a handler cannot be registered.
    pub fn install(wanted: &[c_int]) -> Result<Self, ShutdownError> {
        let signals = Signals::new(wanted).map_err(|source| ShutdownError::Install { source })?;
        Ok(Self { signals })
    }
}

impl std::fmt::Debug for SignalListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalListener").finish_non_exhaustive()
    }
}

impl ShutdownSignal for SignalListener {
    fn wait(&mut self) -> Result<(), ShutdownError> {
        match self.signals.forever().next() {
            Some(signal) => info!(target: SHUTDOWN_TARGET, signal, "shutdown signal received"),
            None => debug!(target: SHUTDOWN_TARGET, "signal listener closed"),
        }
        Ok(())
    }
}
