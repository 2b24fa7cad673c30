//! Tracing setup.
//!
//! Both binaries prefer systemd's journal on Linux. The CLI prints its JSON
//! documents to stdout, so when the journal is unavailable its logs go to a
//! daily-rotated file. The daemon falls back to stderr instead.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter variable read by the CLI, e.g. `VIGIL_LOG=debug`.
pub const LOG_ENV: &str = "VIGIL_LOG";

/// Keeps the file writer flushing until the process exits.
static GUARD: OnceLock<WorkerGuard> = OnceLock::new();

fn filter_from(var: &str) -> EnvFilter {
    EnvFilter::try_from_env(var).unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vigil")
        .join("logs")
}

#[cfg(target_os = "linux")]
fn try_journald(env_filter: EnvFilter) -> std::result::Result<(), EnvFilter> {
    match tracing_journald::layer() {
        Ok(layer) => {
            tracing_subscriber::registry().with(env_filter).with(layer).init();
            tracing::info!("Logging initialized with journald backend");
            Ok(())
        }
        Err(_) => Err(env_filter),
    }
}

#[cfg(not(target_os = "linux"))]
fn try_journald(env_filter: EnvFilter) -> std::result::Result<(), EnvFilter> {
    Err(env_filter)
}

/// Initialize logging for the CLI. Level comes from `VIGIL_LOG`.
pub fn init(log_dir: Option<PathBuf>) -> Result<()> {
    let env_filter = match try_journald(filter_from(LOG_ENV)) {
        Ok(()) => return Ok(()),
        Err(filter) => filter,
    };

    let log_dir = log_dir.unwrap_or_else(default_log_dir);
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "vigil.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = GUARD.set(guard);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    tracing::info!("Logging initialized with file backend at {:?}", log_dir);
    Ok(())
}

/// Initialize logging for the daemon. Level comes from `RUST_LOG`.
pub fn init_daemon() {
    let env_filter = match try_journald(filter_from("RUST_LOG")) {
        Ok(()) => return,
        Err(filter) => filter,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
