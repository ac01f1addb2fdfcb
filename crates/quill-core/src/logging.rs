//! Tracing subscriber setup.
//!
//! The TUI owns the terminal, so interactive sessions log to a daily-rolling
//! file under `$QUILL_HOME/logs`. Every other command logs to stderr.

use std::io::IsTerminal;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::paths;

/// Env var holding `EnvFilter` directives.
pub const LOG_ENV: &str = "QUILL_LOG";

const DEFAULT_FILTER: &str = "warn,quill=info,quill_core=info,quill_tui=info";

/// Where log records go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    /// `$QUILL_HOME/logs/quill.log`, rotated daily.
    File,
    Stderr,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber.
///
/// Keep the returned guard alive for the lifetime of the program; dropping
/// it flushes and stops the background file writer.
///
/// # Errors
/// Returns an error if the log directory cannot be created or a global
/// subscriber is already installed.
pub fn init(target: LogTarget) -> Result<Option<WorkerGuard>> {
    match target {
        LogTarget::File => {
            let dir = paths::logs_dir();
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

            let appender = tracing_appender::rolling::daily(&dir, "quill.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::registry()
                .with(env_filter())
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .try_init()
                .context("Failed to install tracing subscriber")?;

            Ok(Some(guard))
        }
        LogTarget::Stderr => {
            let ansi = std::io::stderr().is_terminal();
            tracing_subscriber::registry()
                .with(env_filter())
                .with(
                    fmt::layer()
                        .compact()
                        .with_writer(std::io::stderr)
                        .with_ansi(ansi),
                )
                .try_init()
                .context("Failed to install tracing subscriber")?;

            Ok(None)
        }
    }
}
