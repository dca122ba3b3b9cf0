//! Logging setup for the supervisor
//!
//! One subscriber for the whole daemon, installed once at startup.
//! `RUST_LOG` wins when set; otherwise the level configured in
//! `server.log_level` (or passed via `--log-level`) becomes the filter.
//! The supervised server's own output also lands here, under the
//! `vh_server` target.

use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global tracing subscriber
pub fn setup_logging(default_level: &str) -> crate::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| crate::Error::Config(format!("Invalid log filter: {}", e)))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    debug!(default_level, "Logging initialized");
    Ok(())
}
