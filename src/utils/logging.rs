//! Structured logging setup.
//!
//! Initializes the global `tracing` subscriber from a [`LoggingConfig`].
//! `RUST_LOG` overrides the configured level when set, matching the usual
//! env-filter convention.

use crate::config::LoggingConfig;
use crate::error::{ProtocolError, Result};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. Call once at startup; a second call
/// fails because the global subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = if config.json_format {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| ProtocolError::ConfigError(format!("Failed to init logging: {e}")))
}
