//! Tracing subscriber setup
//!
//! The engine only emits `tracing` events. Hosts that do not install their
//! own subscriber can call [`init`] once at startup.

use crate::config::LoggingConfig;
use crate::error::EngineError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::UtcTime;

/// Install a global fmt subscriber configured from `config`.
///
/// `RUST_LOG`, when set, takes precedence over the configured level.
/// Fails instead of panicking if a global subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<(), EngineError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| EngineError::config(format!("Invalid log filter: {e}")))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false);

    let installed = match config.format.as_str() {
        "json" => builder.json().try_init(),
        "pretty" => builder.try_init(),
        other => {
            return Err(EngineError::config(format!("Invalid log format '{other}'")));
        }
    };

    installed.map_err(|e| EngineError::config(format!("Failed to install logger: {e}")))
}
