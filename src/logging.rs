//! Logging initialization.
//!
//! Both modes write to STDERR: the CLI prints its JSON results on STDOUT and the
//! server speaks JSON-RPC there, so neither can share it with log lines.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    /// Human-facing commands; compact colored output.
    Cli,
    /// Stdio server; plain text, no ANSI escapes.
    Server,
}

pub fn init(mode: LogMode, verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match mode {
        LogMode::Cli => builder.try_init(),
        LogMode::Server => builder.with_ansi(false).try_init(),
    }
    .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}
