//! tracing subscriber setup

use crate::config::{ConfigError, LoggingConfig};
use crate::core::types::BeagleResult;
use tracing_subscriber::EnvFilter;

/// Build the filter described by a logging section
pub fn env_filter(config: &LoggingConfig) -> BeagleResult<EnvFilter> {
    EnvFilter::try_new(config.level.trim()).map_err(|e| {
        ConfigError::Invalid(format!("Invalid log filter {}: {}", config.level, e)).into()
    })
}

/// Install the global fmt subscriber
///
/// Returns `false` if another subscriber was installed first; that one is
/// left in place.
pub fn init_logging(config: &LoggingConfig) -> BeagleResult<bool> {
    let filter = env_filter(config)?;
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target)
        .try_init()
        .is_ok();
    Ok(installed)
}
