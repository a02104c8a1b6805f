// src/logging.rs

//! Logging setup for `assetdag` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the filter:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `ASSETDAG_LOG` environment variable, any `EnvFilter` directive
//!    (e.g. "debug" or "assetdag=debug,tower_http=warn")
//! 3. default to `info`
//!
//! Logs are sent to STDERR; stdout is kept for `--dry-run` output.

use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "ASSETDAG_LOG";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = match cli_level {
        Some(lvl) => EnvFilter::new(level_from_log_level(lvl).as_str()),
        None => filter_from_env(std::env::var(LOG_ENV).ok().as_deref()),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("initialising logging: {e}"))?;

    Ok(())
}

fn filter_from_env(value: Option<&str>) -> EnvFilter {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| EnvFilter::try_new(v).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_levels() {
        assert_eq!(level_from_log_level(LogLevel::Debug), tracing::Level::DEBUG);
        assert_eq!(level_from_log_level(LogLevel::Error), tracing::Level::ERROR);
    }

    #[test]
    fn env_filter_falls_back_to_info() {
        assert_eq!(filter_from_env(None).to_string(), "info");
        assert_eq!(filter_from_env(Some("  ")).to_string(), "info");
        assert_eq!(
            filter_from_env(Some("assetdag=debug")).to_string(),
            "assetdag=debug"
        );
    }
}
