//! Binary entrypoint for the ferry connector host.
//!
//! Delegates to [`ferryd::run`] with the process arguments and standard
//! streams. The streams are not locked up front because workers and
//! telemetry write to standard error from other threads.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    ferryd::run(std::env::args_os(), &mut io::stdout(), &mut io::stderr())
}
