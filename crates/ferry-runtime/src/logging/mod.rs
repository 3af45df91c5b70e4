//! Log output settings.

use strum::{Display, EnumString};

/// Filter used when none is configured.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Supported log output formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One flattened JSON object per event.
    Json,
    /// Human-readable single line output.
    #[default]
    Compact,
}

/// Errors encountered while parsing a [`LogFormat`] from text.
pub type LogFormatParseError = strum::ParseError;

/// Filter directives and output format for a process's logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    filter: String,
    format: LogFormat,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_FILTER, LogFormat::default())
    }
}

impl LogSettings {
    /// Creates settings from `EnvFilter` directives and a format.
    #[must_use]
    pub fn new(filter: impl Into<String>, format: LogFormat) -> Self {
        Self {
            filter: filter.into(),
            format,
        }
    }

    /// Filter directives, in `tracing_subscriber::EnvFilter` syntax.
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Output format.
    #[must_use]
    pub const fn format(&self) -> LogFormat {
        self.format
    }
}

#[cfg(test)]
mod tests;
