// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `assetdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetdag",
    version,
    about = "Build static-site assets from a task graph and rebuild them on change.",
    long_about = None
)]
pub struct CliArgs {
    /// Task to run.
    #[arg(value_name = "TASK", default_value = "default")]
    pub task: String,

    /// Path to the config file (TOML).
    ///
    /// Default: `Assetdag.toml` in the current working directory. Paths in
    /// the file are relative to its directory.
    #[arg(long, value_name = "PATH", default_value = "Assetdag.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the task graph and bindings, run nothing.
    #[arg(long)]
    pub dry_run: bool,
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
