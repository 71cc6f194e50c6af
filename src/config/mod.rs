//! Configuration system
//!
//! Handles TOML config file parsing and CLI argument merging.

pub mod builder;
pub mod file;

pub use builder::ConfigBuilder;
pub use file::ConfigFile;

use crate::domain::{OverclockArea, OverclockRequest};
use crate::error::ConfigError;
use crate::nvapi::resolver::DEFAULT_LIBRARY_NAMES;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default minimum time between two polls of the same GPU
pub const DEFAULT_MIN_POLL_INTERVAL_MS: u64 = 250;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,
    /// Vendor library settings
    pub library: LibraryConfig,
    /// Polling facade settings
    pub polling: PollingConfig,
    /// Overclock preset
    pub overclock: OverclockConfig,
}

impl Config {
    /// Check values that deserialize fine but make no sense
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.library.names.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "library.names".to_string(),
                message: "at least one library name is required".to_string(),
            });
        }
        for (area, value) in self.overclock.to_request().iter() {
            if !value.is_finite() {
                return Err(ConfigError::InvalidValue {
                    key: format!("overclock.{}", OverclockConfig::key(area)),
                    message: format!("{} is not a finite number", value),
                });
            }
        }
        Ok(())
    }
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,
}

/// Vendor library configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LibraryConfig {
    /// File names tried in order when loading NVAPI
    pub names: Vec<String>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            names: DEFAULT_LIBRARY_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Polling facade configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PollingConfig {
    /// Minimum milliseconds between two polls of the same GPU
    pub min_interval_ms: u64,
}

impl PollingConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: DEFAULT_MIN_POLL_INTERVAL_MS,
        }
    }
}

/// Overclock preset, absolute values per area
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct OverclockConfig {
    /// Core clock offset in MHz
    pub core_mhz: Option<f32>,
    /// Memory clock offset in MHz
    pub memory_mhz: Option<f32>,
    /// Shader clock offset in MHz
    pub shader_mhz: Option<f32>,
    /// Core voltage offset in mV
    pub overvolt_mv: Option<f32>,
    /// Power limit in percent of rated board power
    pub power_limit: Option<f32>,
    /// Thermal limit in °C
    pub thermal_limit: Option<f32>,
}

impl OverclockConfig {
    fn key(area: OverclockArea) -> &'static str {
        match area {
            OverclockArea::Core => "core_mhz",
            OverclockArea::Memory => "memory_mhz",
            OverclockArea::Shader => "shader_mhz",
            OverclockArea::Overvolt => "overvolt_mv",
            OverclockArea::PowerLimit => "power_limit",
            OverclockArea::ThermalLimit => "thermal_limit",
        }
    }

    /// Convert to an overclock request with the configured areas
    pub fn to_request(&self) -> OverclockRequest {
        [
            (OverclockArea::Core, self.core_mhz),
            (OverclockArea::Memory, self.memory_mhz),
            (OverclockArea::Shader, self.shader_mhz),
            (OverclockArea::Overvolt, self.overvolt_mv),
            (OverclockArea::PowerLimit, self.power_limit),
            (OverclockArea::ThermalLimit, self.thermal_limit),
        ]
        .into_iter()
        .filter_map(|(area, value)| value.map(|v| (area, v)))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.general.verbose);
        assert_eq!(config.polling.min_interval(), Duration::from_millis(250));
        assert!(!config.library.names.is_empty());
        assert!(config.overclock.to_request().is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overclock_preset_to_request() {
        let config = OverclockConfig {
            core_mhz: Some(100.0),
            power_limit: Some(110.0),
            ..Default::default()
        };
        let request = config.to_request();
        assert_eq!(request.len(), 2);
        assert_eq!(request.get(OverclockArea::Core), Some(100.0));
        assert_eq!(request.get(OverclockArea::PowerLimit), Some(110.0));
    }

    #[test]
    fn test_validate_rejects_empty_library_names() {
        let mut config = Config::default();
        config.library.names.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { key, .. }) if key == "library.names"
        ));
    }

    #[test]
    fn test_validate_rejects_nan() {
        let mut config = Config::default();
        config.overclock.memory_mhz = Some(f32::NAN);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { key, .. }) if key == "overclock.memory_mhz"
        ));
    }

    #[test]
    fn test_parse_toml() {
        let config: Config = toml::from_str(
            r#"
            [polling]
            min_interval_ms = 500

            [library]
            names = ["custom-nvapi.dll"]

            [overclock]
            core_mhz = 75.0
            "#,
        )
        .unwrap();
        assert_eq!(config.polling.min_interval_ms, 500);
        assert_eq!(config.library.names, vec!["custom-nvapi.dll"]);
        assert_eq!(config.overclock.core_mhz, Some(75.0));
        assert!(!config.general.verbose);
    }
}
