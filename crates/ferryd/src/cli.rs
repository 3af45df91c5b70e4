//! Command-line argument definitions for `ferryd`.

use clap::{Args, Parser, Subcommand};
use ferry_protocol::Value;

use crate::config::Config;

/// Connector used by the demo when none is named.
pub(crate) const DEFAULT_DEMO_CONNECTOR: &str = "SimpleFileConnector";

/// Host for out-of-process ferry connectors.
#[derive(Debug, Parser)]
#[command(name = "ferryd", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) config: Config,
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Commands understood by the host.
#[derive(Debug, Subcommand)]
pub(crate) enum CliCommand {
    /// Invokes one operation and prints the response as JSON.
    Invoke(InvokeArgs),
    /// Runs the sample create/read flow, then waits for a termination signal.
    Demo(DemoArgs),
}

/// Arguments of the `invoke` command.
#[derive(Debug, Args)]
pub(crate) struct InvokeArgs {
    /// Connector name, as declared in its definition.
    #[arg(value_name = "CONNECTOR")]
    pub(crate) connector: String,
    /// Operation to run.
    #[arg(value_name = "OPERATION")]
    pub(crate) operation: String,
    /// Operation parameter as `KEY=VALUE`; repeatable.
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    pub(crate) params: Vec<(String, Value)>,
    /// Connector configuration override as `KEY=VALUE`; repeatable.
    #[arg(long = "config", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    pub(crate) config: Vec<(String, Value)>,
    /// Text payload carried in the message context.
    #[arg(long)]
    pub(crate) payload: Option<String>,
    /// Message identifier; a random UUID when omitted.
    #[arg(long)]
    pub(crate) message_id: Option<String>,
}

/// Arguments of the `demo` command.
#[derive(Debug, Args)]
pub(crate) struct DemoArgs {
    /// Connector the sample flow runs against.
    #[arg(long, default_value = DEFAULT_DEMO_CONNECTOR)]
    pub(crate) connector: String,
}

/// Parses `KEY=VALUE`. The value is read as JSON when it parses, otherwise
/// it is kept as a string.
pub(crate) fn parse_assignment(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("missing key in '{raw}'"));
    }
    let parsed = serde_json::from_str::<Value>(value).unwrap_or_else(|_| Value::from(value));
    Ok((key.to_owned(), parsed))
}
