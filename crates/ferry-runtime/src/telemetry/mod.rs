//! Installation of the process-wide tracing subscriber.
//!
//! Events go to standard error with RFC 3339 UTC timestamps, so a host and
//! the workers it spawns interleave readable lines on the same stream.
//! Colour is enabled only when standard error is a terminal.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::dispatcher::SetGlobalDefaultError;
use tracing::{Dispatch, debug};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::{self, time::UtcTime};

use crate::logging::{LogFormat, LogSettings};

const TELEMETRY_TARGET: &str = "ferry_runtime::telemetry";

static INSTALLED: OnceCell<LogSettings> = OnceCell::new();

/// Proof that the global subscriber is installed.
#[derive(Debug, Clone, Copy)]
pub struct TelemetryHandle {
    format: LogFormat,
}

impl TelemetryHandle {
    /// Format of the installed subscriber, which may differ from a later
    /// request because only the first installation takes effect.
    #[must_use]
    pub const fn format(&self) -> LogFormat {
        self.format
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The filter directives did not parse.
    #[error("invalid log filter '{filter}': {message}")]
    Filter {
        /// Rejected directives.
        filter: String,
        /// Parser message.
        message: String,
    },
    /// Another subscriber was installed outside this module.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(#[source] SetGlobalDefaultError),
}

/// Installs the global subscriber described by `settings`.
///
/// Only the first successful call installs anything; later calls return a
/// handle describing the subscriber already in place.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] for invalid directives and
/// [`TelemetryError::Subscriber`] when a foreign global subscriber exists.
pub fn initialise(settings: &LogSettings) -> Result<TelemetryHandle, TelemetryError> {
    let installed = INSTALLED.get_or_try_init(|| {
        tracing::dispatcher::set_global_default(build_dispatch(settings)?)
            .map_err(TelemetryError::Subscriber)?;
        Ok::<_, TelemetryError>(settings.clone())
    })?;
    debug!(
        target: TELEMETRY_TARGET,
        format = %installed.format(),
        filter = installed.filter(),
        "telemetry ready"
    );
    Ok(TelemetryHandle {
        format: installed.format(),
    })
}

/// Parses the filter directives in `settings`.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] when the directives do not parse.
pub fn parse_filter(settings: &LogSettings) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(settings.filter()).map_err(|error| TelemetryError::Filter {
        filter: settings.filter().to_owned(),
        message: error.to_string(),
    })
}

/// Builds a subscriber for `settings` without installing it.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] when the directives do not parse.
pub fn build_dispatch(settings: &LogSettings) -> Result<Dispatch, TelemetryError> {
    let builder = fmt::Subscriber::builder()
        .with_env_filter(parse_filter(settings)?)
        .with_target(true)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(UtcTime::rfc_3339());

    Ok(match settings.format() {
        LogFormat::Json => Dispatch::new(builder.json().flatten_event(true).finish()),
        LogFormat::Compact => Dispatch::new(builder.compact().finish()),
    })
}
