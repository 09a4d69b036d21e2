use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Initialize logging.
///
/// Logs go to stderr so stdout carries nothing but the transcript; a
/// `log_path` from the settings file redirects them to an append-only
/// file instead. `RUST_LOG` controls the filter, defaulting to `info`.
///
/// # Errors
/// Returns error if the log file or its parent directory cannot be created.
pub fn init(log_path: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if let Some(path) = log_path {
        let expanded = expand_log_path(path)?;

        if let Some(parent) = expanded.parent() {
            fs::create_dir_all(parent).context("failed to create log directory")?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&expanded)
            .context("failed to open log file")?;

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::sync::Arc::new(file))
            .with_target(false)
            .with_ansi(false)
            .init();

        tracing::info!("logging to {}", expanded.display());
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    Ok(())
}

fn expand_log_path(path: &str) -> Result<PathBuf> {
    if let Some(stripped) = path.strip_prefix("~/") {
        let home = std::env::var("HOME").context("HOME environment variable not set")?;
        Ok(PathBuf::from(home).join(stripped))
    } else {
        Ok(PathBuf::from(path))
    }
}
