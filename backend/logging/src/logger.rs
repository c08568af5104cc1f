//! Structured Logger
//!
//! Wraps `tracing` to provide console output on stderr, optional JSON
//! formatting, file rotation (NDJSON), and environment-based level control.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// File name prefix of the rolling log: `policyforge.log.YYYY-MM-DD`.
pub const LOG_FILE_PREFIX: &str = "policyforge.log";

/// Logger settings, usually taken from the `logging` config section and
/// overridden by CLI flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Env-filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// JSON lines on the console instead of the human format.
    pub json: bool,
    /// Directory for the daily rolling file; no file output when `None`.
    pub dir: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            dir: None,
        }
    }
}

impl LogSettings {
    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Initialize the global structured logger.
///
/// A second call leaves the first subscriber in place.
pub fn init_logger(settings: &LogSettings) -> Result<()> {
    let console_layer = if settings.json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_ansi(std::io::IsTerminal::is_terminal(&std::io::stderr()))
            .boxed()
    };

    let file_layer = match &settings.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
            Some(
                fmt::layer()
                    .json()
                    .with_writer(appender)
                    .with_ansi(false),
            )
        }
        None => None,
    };

    let _ = tracing_subscriber::registry()
        .with(settings.filter())
        .with(console_layer)
        .with(file_layer)
        .try_init();
    Ok(())
}
