//! File-backed `tracing` subscriber.
//!
//! The desktop owns the terminal it draws on, so log output never goes to stdout/stderr.
//! Nothing is installed unless `TAPE_DESKTOP_LOG_FILE` names a file.

use std::fs::OpenOptions;
use std::sync::{Mutex, OnceLock};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::EnvConfig;
use crate::error::{DesktopError, Result};

const DEFAULT_FILTER: &str = "info";

static INSTALLED: OnceLock<()> = OnceLock::new();

/// Filter directives from `TAPE_DESKTOP_LOG`, falling back to `info` when absent or invalid.
pub fn build_filter(config: &EnvConfig) -> EnvFilter {
    config
        .log_filter
        .as_deref()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber.
///
/// Returns `Ok(true)` when this call installed it, `Ok(false)` when logging is disabled or a
/// previous call already did.
pub fn init(config: &EnvConfig) -> Result<bool> {
    let Some(path) = config.log_file.as_deref() else {
        return Ok(false);
    };
    if INSTALLED.get().is_some() {
        return Ok(false);
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let layer = fmt::layer()
        .with_ansi(false)
        .with_thread_names(true)
        .with_writer(Mutex::new(file));

    tracing_subscriber::registry()
        .with(build_filter(config))
        .with(layer)
        .try_init()
        .map_err(|err| DesktopError::Logging(err.to_string()))?;

    let _ = INSTALLED.set(());
    tracing::debug!(path, "log subscriber installed");
    Ok(true)
}
