// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `assetpipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetpipe",
    version,
    about = "Build static-site assets through named pipelines, watch and serve them.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Assetpipe.toml", global = true)]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run a pipeline or a single task once and exit.
    Run {
        /// Pipeline or task name (e.g. `build`, `imagemin`, `renamewebp`).
        name: String,
    },

    /// Watch sources and serve the site with live reload until interrupted.
    Serve {
        /// Run this pipeline or task once before watching.
        #[arg(long, value_name = "NAME")]
        build: Option<String>,

        /// Do not open a browser, whatever the config says.
        #[arg(long)]
        no_open: bool,
    },

    /// Parse + validate the config and print it, without running anything.
    List,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_global_flags() {
        let args =
            CliArgs::try_parse_from(["assetpipe", "run", "build", "--config", "site.toml"])
                .unwrap();
        assert_eq!(args.config, "site.toml");
        match args.command {
            Command::Run { name } => assert_eq!(name, "build"),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn serve_defaults() {
        let args = CliArgs::try_parse_from(["assetpipe", "serve"]).unwrap();
        assert_eq!(args.config, "Assetpipe.toml");
        match args.command {
            Command::Serve { build, no_open } => {
                assert!(build.is_none());
                assert!(!no_open);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
