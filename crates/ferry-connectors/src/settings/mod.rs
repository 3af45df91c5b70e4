//! Runtime settings for connector supervision and invocation.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default pause after spawning before a worker is considered ready.
pub const DEFAULT_READINESS_DELAY: Duration = Duration::from_secs(1);

/// Default timeout when connecting to a worker.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default time a worker is given to exit after an interrupt.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Tunables shared by the supervisor and the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerSettings {
    connectors_dir: PathBuf,
    readiness_delay: Duration,
    connect_timeout: Duration,
    shutdown_grace: Duration,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            connectors_dir: PathBuf::from("./connectors"),
            readiness_delay: DEFAULT_READINESS_DELAY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

impl ManagerSettings {
    /// Creates settings rooted at `connectors_dir` with default timings.
    #[must_use]
    pub fn new(connectors_dir: impl Into<PathBuf>) -> Self {
        Self {
            connectors_dir: connectors_dir.into(),
            ..Self::default()
        }
    }

    /// Sets the readiness delay.
    #[must_use]
    pub const fn with_readiness_delay(mut self, delay: Duration) -> Self {
        self.readiness_delay = delay;
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the shutdown grace period.
    #[must_use]
    pub const fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Directory that relative executable paths are resolved against.
    #[must_use]
    pub fn connectors_dir(&self) -> &Path {
        &self.connectors_dir
    }

    /// Pause after spawning before the worker is used.
    #[must_use]
    pub const fn readiness_delay(&self) -> Duration {
        self.readiness_delay
    }

    /// Timeout for each worker connection attempt.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Time allowed between interrupt and forced kill.
    #[must_use]
    pub const fn shutdown_grace(&self) -> Duration {
        self.shutdown_grace
    }
}
