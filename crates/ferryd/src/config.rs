//! Host configuration resolved from flags and environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use ferry_connectors::ManagerSettings;
use ferry_runtime::logging::DEFAULT_LOG_FILTER;
use ferry_runtime::{LogFormat, LogSettings};

/// Default directory holding connector definition files.
pub const DEFAULT_DEFINITIONS_DIR: &str = "./connector-definitions";
/// Default directory connector executables are resolved against.
pub const DEFAULT_CONNECTORS_DIR: &str = "./connectors";

const DEFAULT_READINESS_DELAY_MS: u64 = 1_000;
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 5_000;

/// Settings shared by every `ferryd` command.
#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct Config {
    /// Directory containing connector definition JSON files.
    #[arg(
        long,
        global = true,
        env = "FERRY_DEFINITIONS_DIR",
        default_value = DEFAULT_DEFINITIONS_DIR
    )]
    definitions_dir: PathBuf,

    /// Directory connector executables are resolved against.
    #[arg(
        long,
        global = true,
        env = "FERRY_CONNECTORS_DIR",
        default_value = DEFAULT_CONNECTORS_DIR
    )]
    connectors_dir: PathBuf,

    /// Tracing filter directives.
    #[arg(
        long,
        global = true,
        env = "FERRY_LOG_FILTER",
        default_value = DEFAULT_LOG_FILTER
    )]
    log_filter: String,

    /// Log output format (`json` or `compact`).
    #[arg(
        long,
        global = true,
        env = "FERRY_LOG_FORMAT",
        default_value_t = LogFormat::Compact
    )]
    log_format: LogFormat,

    /// Milliseconds to wait after spawning a worker before contacting it.
    #[arg(
        long,
        global = true,
        env = "FERRY_READINESS_DELAY_MS",
        default_value_t = DEFAULT_READINESS_DELAY_MS
    )]
    readiness_delay_ms: u64,

    /// Milliseconds allowed for connecting to a worker.
    #[arg(
        long,
        global = true,
        env = "FERRY_CONNECT_TIMEOUT_MS",
        default_value_t = DEFAULT_CONNECT_TIMEOUT_MS
    )]
    connect_timeout_ms: u64,

    /// Milliseconds a worker is given to exit before it is killed.
    #[arg(
        long,
        global = true,
        env = "FERRY_SHUTDOWN_GRACE_MS",
        default_value_t = DEFAULT_SHUTDOWN_GRACE_MS
    )]
    shutdown_grace_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            definitions_dir: PathBuf::from(DEFAULT_DEFINITIONS_DIR),
            connectors_dir: PathBuf::from(DEFAULT_CONNECTORS_DIR),
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: LogFormat::default(),
            readiness_delay_ms: DEFAULT_READINESS_DELAY_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            shutdown_grace_ms: DEFAULT_SHUTDOWN_GRACE_MS,
        }
    }
}

impl Config {
    /// Directory definition files are loaded from.
    #[must_use]
    pub fn definitions_dir(&self) -> &Path {
        &self.definitions_dir
    }

    /// Log filter and format for the host process.
    #[must_use]
    pub fn log_settings(&self) -> LogSettings {
        LogSettings::new(self.log_filter.clone(), self.log_format)
    }

    /// Builds the connector manager settings described by this configuration.
    #[must_use]
    pub fn manager_settings(&self) -> ManagerSettings {
        ManagerSettings::new(self.connectors_dir.clone())
            .with_readiness_delay(Duration::from_millis(self.readiness_delay_ms))
            .with_connect_timeout(Duration::from_millis(self.connect_timeout_ms))
            .with_shutdown_grace(Duration::from_millis(self.shutdown_grace_ms))
    }
}
