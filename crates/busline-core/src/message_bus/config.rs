//! Message bus configuration.
//!
//! Settings can be built in code or loaded from a `.toml` or `.json` file.
//! Every field has a default, so a partial file is valid.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Smallest stack accepted for a dispatch worker thread
pub const MIN_WORKER_STACK_SIZE: usize = 64 * 1024;

/// Configuration for a [`MessageBus`](super::MessageBus)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageBusConfig {
    /// Prefix for dispatch worker thread names (`<prefix>-<PayloadType>`).
    pub thread_name_prefix: String,
    /// Start workers for subscribed payload types on `start()`, and for newly
    /// subscribed types while the bus is running.
    pub auto_start_workers: bool,
    /// Stack size for worker threads in bytes. `None` uses the platform default.
    pub worker_stack_size: Option<usize>,
}

impl Default for MessageBusConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: "busline".to_string(),
            auto_start_workers: true,
            worker_stack_size: None,
        }
    }
}

impl MessageBusConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from file (JSON or TOML, chosen by extension)
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;

        let config: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)?
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content)?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.display().to_string()));
        };

        config.validate()?;
        Ok(config)
    }

    /// Save config to file (JSON or TOML, chosen by extension)
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        let content = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::to_string_pretty(self)?
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            toml::to_string_pretty(self)?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.display().to_string()));
        };

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thread_name_prefix.trim().is_empty() {
            return Err(ConfigError::InvalidSetting {
                key: "thread_name_prefix".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.thread_name_prefix.contains('\0') {
            return Err(ConfigError::InvalidSetting {
                key: "thread_name_prefix".to_string(),
                reason: "must not contain NUL bytes".to_string(),
            });
        }
        if let Some(size) = self.worker_stack_size {
            if size < MIN_WORKER_STACK_SIZE {
                return Err(ConfigError::InvalidSetting {
                    key: "worker_stack_size".to_string(),
                    reason: format!(
                        "{} bytes is below the {} byte minimum",
                        size, MIN_WORKER_STACK_SIZE
                    ),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = MessageBusConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.thread_name_prefix, "busline");
        assert!(config.auto_start_workers);
        assert_eq!(config.worker_stack_size, None);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = MessageBusConfig::from_toml_str("auto_start_workers = false\n")
            .expect("valid toml");
        assert!(!config.auto_start_workers);
        assert_eq!(config.thread_name_prefix, "busline");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let err = MessageBusConfig::from_toml_str("thread_name_prefix = \"  \"\n")
            .expect_err("blank prefix");
        assert!(matches!(
            err,
            ConfigError::InvalidSetting { ref key, .. } if key == "thread_name_prefix"
        ));

        let config = MessageBusConfig {
            worker_stack_size: Some(1024),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSetting { ref key, .. }) if key == "worker_stack_size"
        ));
    }

    #[test]
    fn test_round_trip_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = MessageBusConfig {
            thread_name_prefix: "machine-bus".to_string(),
            auto_start_workers: false,
            worker_stack_size: Some(256 * 1024),
        };

        for name in ["bus.toml", "bus.json"] {
            let path = dir.path().join(name);
            config.save_to_file(&path).expect("save");
            let loaded = MessageBusConfig::load_from_file(&path).expect("load");
            assert_eq!(loaded, config);
        }

        let err = config
            .save_to_file(&dir.path().join("bus.yaml"))
            .expect_err("yaml unsupported");
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = MessageBusConfig::load_from_file(Path::new("/nonexistent/busline.toml"))
            .expect_err("missing file");
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
