//! File-backed tracing. The terminal belongs to the UI, so log output goes to
//! a daily-rotated file in the configured log directory instead of stderr.

use std::fs;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::AppConfig;

const LOG_FILE_PREFIX: &str = "sqlite-browser.log";

/// Install the global subscriber. Keep the returned guard alive for the whole
/// run; dropping it flushes and stops the background writer.
pub fn init_logging(config: &AppConfig) -> Result<WorkerGuard> {
    fs::create_dir_all(&config.log_dir).with_context(|| {
        format!("failed to create log directory {}", config.log_dir.display())
    })?;

    let appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_new(&config.log_filter)
        .with_context(|| format!("invalid log filter `{}`", config.log_filter))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(guard)
}
