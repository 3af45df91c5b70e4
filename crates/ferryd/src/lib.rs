//! Host runtime for ferry connectors.
//!
//! `ferryd` loads connector definitions from a directory, configures
//! structured logging and drives a [`ConnectorManager`](ferry_connectors::ConnectorManager)
//! on behalf of one of two commands:
//!
//! * `invoke <connector> <operation>` runs a single operation, prints the
//!   response as JSON, and exits non-zero when it failed.
//! * `demo` runs a sample `create`/`read` flow against the file connector,
//!   then waits for a termination signal before stopping every worker.
//!
//! The runtime takes its output streams as parameters so tests can capture
//! them.

mod cli;
mod commands;
pub mod config;
mod errors;

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use ferry_runtime::{SignalListener, telemetry};

pub use self::config::Config;
use self::cli::{Cli, CliCommand};
use self::errors::AppError;

/// Parses `args`, runs the selected command and reports the exit status.
///
/// Command output goes to `stdout`; usage and runtime errors go to
/// `stderr`. Logs are written to the process's standard error by the
/// telemetry subscriber.
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let result = Cli::try_parse_from(args)
        .map_err(AppError::CliUsage)
        .and_then(|cli| execute(cli, stdout));

    match result {
        Ok(code) => code,
        Err(AppError::CliUsage(error)) => report_usage(&error, stdout, stderr),
        Err(error) => {
            writeln!(stderr, "ferryd: {error}").ok();
            ExitCode::FAILURE
        }
    }
}

fn execute<W: Write>(cli: Cli, stdout: &mut W) -> Result<ExitCode, AppError> {
    let Cli { config, command } = cli;
    telemetry::initialise(&config.log_settings())?;

    match command {
        CliCommand::Invoke(args) => {
            let manager = commands::build_manager(&config)?;
            let succeeded = commands::invoke(&manager, args, stdout)?;
            Ok(if succeeded {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        CliCommand::Demo(args) => {
            let mut listener = SignalListener::install(&SignalListener::HOST_SIGNALS)?;
            let manager = commands::build_manager(&config)?;
            commands::demo(&manager, &args.connector, &mut listener)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn report_usage<W: Write, E: Write>(
    error: &clap::Error,
    stdout: &mut W,
    stderr: &mut E,
) -> ExitCode {
    let rendered = error.render();
    if error.use_stderr() {
        write!(stderr, "{rendered}").ok();
    } else {
        write!(stdout, "{rendered}").ok();
    }
    u8::try_from(error.exit_code()).map_or(ExitCode::FAILURE, ExitCode::from)
}

#[cfg(test)]
mod tests;
