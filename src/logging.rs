// src/logging.rs

//! Logging setup for `assetpipe` using `tracing` + `tracing-subscriber`.
//!
//! The filter comes from, in order:
//! 1. `--log-level` CLI flag, applied to every target
//! 2. `ASSETPIPE_LOG`, read as an `EnvFilter` directive
//!    (e.g. `"debug"` or `"assetpipe=debug,tower_http=info"`)
//! 3. `info`
//!
//! Logs go to STDERR; stdout is reserved for `list` output.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

/// Environment variable consulted when no `--log-level` flag is given.
pub const LOG_ENV_VAR: &str = "ASSETPIPE_LOG";

const DEFAULT_DIRECTIVE: &str = "info";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let directive = filter_directive(cli_level, std::env::var(LOG_ENV_VAR).ok());
    let filter = EnvFilter::try_new(&directive)
        .with_context(|| format!("invalid log filter {directive:?}"))?;

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}

/// The `EnvFilter` directive to use for the given flag and env value.
fn filter_directive(cli_level: Option<LogLevel>, env: Option<String>) -> String {
    if let Some(level) = cli_level {
        return level_name(level).to_string();
    }
    env.map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_DIRECTIVE.to_string())
}

fn level_name(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
