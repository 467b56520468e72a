//! Configuration validator for heap-beagle
//!
//! Validates configuration values to ensure they are within acceptable ranges.

use super::loader::{Config, ConfigError, HazardConfig, LoggingConfig, ScannerConfig};
use crate::core::types::WORD_SIZE;
use tracing_subscriber::EnvFilter;

/// Largest accepted type word offset
pub const MAX_TYPE_WORD_OFFSET: usize = 4096;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates the entire configuration
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        Self::validate_scanner(&config.scanner)?;
        Self::validate_hazards(&config.hazards)?;
        Self::validate_logging(&config.logging)?;
        Ok(())
    }

    /// Validates scanner configuration
    fn validate_scanner(scanner: &ScannerConfig) -> Result<(), ConfigError> {
        if scanner.type_word_offset % WORD_SIZE != 0 {
            return Err(ConfigError::Invalid(format!(
                "Type word offset {} is not a multiple of the word size ({})",
                scanner.type_word_offset, WORD_SIZE
            )));
        }

        if scanner.type_word_offset > MAX_TYPE_WORD_OFFSET {
            return Err(ConfigError::Invalid(format!(
                "Type word offset cannot exceed {}",
                MAX_TYPE_WORD_OFFSET
            )));
        }

        Ok(())
    }

    /// Validates hazard configuration
    fn validate_hazards(hazards: &HazardConfig) -> Result<(), ConfigError> {
        if hazards.types.iter().any(|name| name.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "Hazard type names cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Validates logging configuration
    fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
        let level = logging.level.trim();
        if level.is_empty() {
            return Err(ConfigError::Invalid(
                "Log level must not be empty".to_string(),
            ));
        }

        // Same parser the subscriber uses: bare levels, bare targets and
        // full directive lists are all accepted here exactly when they are
        // accepted at startup.
        EnvFilter::try_new(level)
            .map(|_| ())
            .map_err(|e| ConfigError::Invalid(format!("Invalid log filter {}: {}", level, e)))
    }
}

/// Validates a configuration
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    ConfigValidator::validate(config)
}
