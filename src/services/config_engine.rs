// TSNotes Config Engine
// Loads, edits and saves the manager configuration.
// The config lives as a JSON file at the platform-specific config path.

use std::fs;
use std::path::Path;

use log::{debug, info};

use crate::platform;
use crate::types::config::ManagerConfig;
use crate::types::errors::ConfigError;

/// Trait defining the config engine interface.
pub trait ConfigEngineTrait {
    fn load(&mut self) -> Result<ManagerConfig, ConfigError>;
    fn save(&self) -> Result<(), ConfigError>;
    fn get_config(&self) -> &ManagerConfig;
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), ConfigError>;
    fn reset(&mut self) -> Result<(), ConfigError>;
    fn get_config_path(&self) -> &str;
}

/// Config engine implementation that persists the config as JSON on disk.
pub struct ConfigEngine {
    config_path: String,
    config: ManagerConfig,
}

impl ConfigEngine {
    /// Creates a new ConfigEngine.
    ///
    /// If `path_override` is `Some`, uses that path for the config file.
    /// Otherwise, uses `config.json` in the platform-specific config directory.
    pub fn new(path_override: Option<String>) -> Self {
        let config_path = path_override.unwrap_or_else(|| {
            platform::default_config_path().to_string_lossy().to_string()
        });

        Self {
            config_path,
            config: ManagerConfig::default(),
        }
    }

    /// Rejects values that deserialize fine but make no sense at runtime.
    fn validate(config: &ManagerConfig) -> Result<(), ConfigError> {
        let in_open_unit = |r: f64| r.is_finite() && r > 0.0 && r < 1.0;
        if !in_open_unit(config.default_split_ratio) {
            return Err(ConfigError::InvalidValue(format!(
                "default_split_ratio must be between 0 and 1 (exclusive), got {}",
                config.default_split_ratio
            )));
        }
        if let Some(bad) = config.split_presets.iter().find(|r| !in_open_unit(**r)) {
            return Err(ConfigError::InvalidValue(format!(
                "split preset must be between 0 and 1 (exclusive), got {}",
                bad
            )));
        }
        if !(config.screen.margin >= 1.0) {
            return Err(ConfigError::InvalidValue(format!(
                "screen.margin must be at least 1.0, got {}",
                config.screen.margin
            )));
        }
        Ok(())
    }
}

impl ConfigEngineTrait for ConfigEngine {
    /// Loads the config from disk.
    ///
    /// A missing file yields defaults. A malformed file is an error.
    fn load(&mut self) -> Result<ManagerConfig, ConfigError> {
        let path = Path::new(&self.config_path);

        if !path.exists() {
            debug!("no config at {}, using defaults", self.config_path);
            self.config = ManagerConfig::default();
            return Ok(self.config.clone());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("Failed to read config file: {}", e)))?;

        let config: ManagerConfig = serde_json::from_str(&content).map_err(|e| {
            ConfigError::SerializationError(format!("Failed to parse config file: {}", e))
        })?;
        Self::validate(&config)?;

        info!("loaded config from {}", self.config_path);
        self.config = config;
        Ok(self.config.clone())
    }

    /// Saves the current config, creating parent directories if they don't exist.
    fn save(&self) -> Result<(), ConfigError> {
        let path = Path::new(&self.config_path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ConfigError::IoError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.config).map_err(|e| {
            ConfigError::SerializationError(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, json)
            .map_err(|e| ConfigError::IoError(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    fn get_config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Updates one value by dot-notation key path, e.g. `"timing.settle_delay_ms"`.
    ///
    /// The edited document is deserialized and validated before it replaces
    /// the current config, then saved.
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), ConfigError> {
        if key.is_empty() {
            return Err(ConfigError::InvalidKey("Key cannot be empty".to_string()));
        }

        let mut json_value = serde_json::to_value(&self.config).map_err(|e| {
            ConfigError::SerializationError(format!("Failed to serialize config: {}", e))
        })?;

        let (parents, leaf) = match key.rsplit_once('.') {
            Some((parents, leaf)) => (parents.split('.').collect::<Vec<_>>(), leaf),
            None => (Vec::new(), key),
        };

        let mut current = &mut json_value;
        for part in parents {
            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::InvalidKey(format!("Key '{}' not found in config", key)))?;
        }
        match current {
            serde_json::Value::Object(map) if map.contains_key(leaf) => {
                map.insert(leaf.to_string(), value);
            }
            serde_json::Value::Object(_) => {
                return Err(ConfigError::InvalidKey(format!(
                    "Key '{}' not found in config",
                    key
                )));
            }
            _ => {
                return Err(ConfigError::InvalidKey(format!(
                    "Cannot navigate to key '{}': intermediate value is not an object",
                    key
                )));
            }
        }

        let new_config: ManagerConfig = serde_json::from_value(json_value).map_err(|e| {
            ConfigError::InvalidValue(format!("Invalid value for key '{}': {}", key, e))
        })?;
        Self::validate(&new_config)?;

        self.config = new_config;
        self.save()
    }

    /// Resets the config to defaults and saves to disk.
    fn reset(&mut self) -> Result<(), ConfigError> {
        self.config = ManagerConfig::default();
        self.save()
    }

    fn get_config_path(&self) -> &str {
        &self.config_path
    }
}
