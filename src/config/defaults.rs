//! Default configuration values for heap-beagle

use serde::{Deserialize, Serialize};

/// Default configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDefaults {
    pub scanner: ScannerDefaults,
    pub hazards: HazardDefaults,
    pub logging: LoggingDefaults,
}

/// Default scanner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerDefaults {
    pub type_word_offset: usize,
    pub verify_header_seal: bool,
}

/// Default hazard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HazardDefaults {
    pub types: Vec<String>,
}

/// Default logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingDefaults {
    pub level: String,
    pub with_target: bool,
}

/// Returns the default configuration
pub fn default_config() -> ConfigDefaults {
    ConfigDefaults {
        scanner: ScannerDefaults {
            type_word_offset: 0,
            verify_header_seal: true,
        },
        hazards: HazardDefaults { types: Vec::new() },
        logging: LoggingDefaults {
            level: "info".to_string(),
            with_target: false,
        },
    }
}
