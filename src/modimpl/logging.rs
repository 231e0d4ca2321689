use anyhow::{Context, Result};
use log::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::modimpl::config::LoggingConfig;

const LOG_FILE_PREFIX: &str = "ftp_paperless_bridge";

/// `RUST_LOG` wins over the configured level.
fn build_filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).with_context(|| format!("Invalid log level: {}", level)),
    }
}

/// Installs the global subscriber: stdout plus, when a log directory is
/// configured, a daily rolling file. `log` records are bridged into it.
pub fn setup_logging(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(&config.level)?;

    let file_layer = match &config.log_dir {
        Some(dir) => {
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(LOG_FILE_PREFIX)
                .filename_suffix("log")
                .build(dir)
                .with_context(|| format!("Failed to create log file in {}", dir.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(appender))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_thread_ids(true).with_line_number(true))
        .with(filter)
        .with(file_layer)
        .try_init()
        .context("Failed to install log subscriber")?;

    info!("🖹 Logger Initialized");
    Ok(())
}
