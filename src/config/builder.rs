//! Configuration builder
//!
//! Merges configuration from files and CLI arguments.

use crate::config::{Config, ConfigFile};
use crate::domain::OverclockArea;
use crate::error::ConfigError;

/// Builder for merging configuration sources
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Load configuration from a file
    ///
    /// An explicit path must load; the default locations are optional.
    pub fn with_file(mut self, path: Option<&str>) -> Result<Self, ConfigError> {
        let file_config = match path {
            Some(path) => Some(ConfigFile::load(path)?),
            None => ConfigFile::load_default(),
        };

        if let Some(cfg) = file_config {
            self.config = cfg;
        }

        Ok(self)
    }

    /// Override with CLI verbose flag
    pub fn with_verbose(mut self, verbose: Option<bool>) -> Self {
        if let Some(v) = verbose {
            self.config.general.verbose = v;
        }
        self
    }

    /// Override the minimum poll interval
    pub fn with_min_interval_ms(mut self, interval: Option<u64>) -> Self {
        if let Some(i) = interval {
            self.config.polling.min_interval_ms = i;
        }
        self
    }

    /// Override the vendor library names
    pub fn with_library_names(mut self, names: Option<Vec<String>>) -> Self {
        if let Some(names) = names.filter(|n| !n.is_empty()) {
            self.config.library.names = names;
        }
        self
    }

    /// Override one overclock preset value
    pub fn with_overclock(mut self, area: OverclockArea, value: Option<f32>) -> Self {
        if let Some(v) = value {
            let preset = &mut self.config.overclock;
            let slot = match area {
                OverclockArea::Core => &mut preset.core_mhz,
                OverclockArea::Memory => &mut preset.memory_mhz,
                OverclockArea::Shader => &mut preset.shader_mhz,
                OverclockArea::Overvolt => &mut preset.overvolt_mv,
                OverclockArea::PowerLimit => &mut preset.power_limit,
                OverclockArea::ThermalLimit => &mut preset.thermal_limit,
            };
            *slot = Some(v);
        }
        self
    }

    /// Build the final configuration
    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
