//! Binary entrypoint for the sample file connector worker.
//!
//! The worker listens on `127.0.0.1:<port>` until it receives SIGINT or
//! SIGTERM, serving `create` and `read` requests from the ferry host.

use std::io::{self, Write};
use std::net::{IpAddr, Ipv4Addr};
use std::process::ExitCode;

use clap::Parser;
use ferry_file_connector::operations;
use ferry_runtime::logging::DEFAULT_LOG_FILTER;
use ferry_runtime::{LogFormat, LogSettings, ShutdownSignal, SignalListener, telemetry};
use ferry_worker::ConnectorServer;
use tracing::info;

const WORKER_TARGET: &str = "ferry_file_connector";

/// Command-line arguments passed by the supervisor.
#[derive(Debug, Parser)]
#[command(name = "ferry-file-connector", version, about = "Sample ferry file connector")]
struct Cli {
    /// Loopback port to listen on.
    #[arg(long)]
    port: u16,

    /// Tracing filter directives.
    #[arg(long, env = "FERRY_LOG_FILTER", default_value = DEFAULT_LOG_FILTER)]
    log_filter: String,

    /// Log output format (`json` or `compact`).
    #[arg(long, env = "FERRY_LOG_FORMAT", default_value_t = LogFormat::Compact)]
    log_format: LogFormat,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            writeln!(io::stderr().lock(), "ferry-file-connector: {error}").ok();
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut listener = SignalListener::install(&SignalListener::WORKER_SIGNALS)?;
    telemetry::initialise(&LogSettings::new(cli.log_filter.clone(), cli.log_format))?;

    let server = ConnectorServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), cli.port)?
        .start(operations())?;
    info!(
        target: WORKER_TARGET,
        addr = %server.local_addr(),
        "file connector ready"
    );

    listener.wait()?;
    server.shutdown();
    server.join()?;
    Ok(())
}
