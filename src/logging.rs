//! Log sink: console plus an append-only log file
//!
//! `log` records from the store and extractor reach the same layers through
//! the `tracing-log` bridge that `try_init` installs.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber
///
/// The filter comes from `RUST_LOG` and defaults to `info`. The file at
/// `log_file` is created if missing and only ever appended to.
pub fn init(log_file: &Path) -> Result<()> {
    if let Some(parent) = log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("Failed to open log file {}", log_file.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        .try_init()
        .map_err(|e| anyhow!("Failed to install log subscriber: {e}"))?;

    Ok(())
}

/// Read the whole log file for the dashboard
pub async fn read_log(log_file: &Path) -> Result<String> {
    let bytes = tokio::fs::read(log_file)
        .await
        .with_context(|| format!("Failed to read log file {}", log_file.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
