//! Settings for the nerve bus service
//!
//! The settings file is organized into sections:
//! - `[bus]` queue capacity, drop policy, sampling and batching
//! - `[logging]` log level and output format
//! - `[transports]` built-in transports to register at startup
//! - `[runtime]` heartbeat interval
//!
//! Files are read and written as TOML or JSON depending on their extension.

use nerve_core::{BusConfig, LogLevel};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::level_filters::LevelFilter;

use crate::error::{SettingsError, SettingsResult};

/// Settings file name inside the config directory
pub const SETTINGS_FILE: &str = "settings.toml";

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Toml,
}

impl Format {
    fn from_path(path: &Path) -> SettingsResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Format::Json),
            Some("toml") => Ok(Format::Toml),
            other => Err(SettingsError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default level (`trace`, `debug`, `info`, `warn`, `error`, `off`);
    /// `RUST_LOG` directives take precedence
    pub level: String,
    /// Emit JSON instead of human-readable lines
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingSettings {
    /// Parsed level filter
    pub fn level_filter(&self) -> SettingsResult<LevelFilter> {
        LevelFilter::from_str(self.level.trim()).map_err(|_| {
            SettingsError::invalid("logging.level", format!("unknown level '{}'", self.level))
        })
    }
}

/// Built-in transport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    /// Register the tracing transport
    pub log: bool,
    /// Level used by the tracing transport
    pub log_level: LogLevel,
    /// Append every delivered event to this file as JSON lines
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jsonl_path: Option<PathBuf>,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            log: true,
            log_level: LogLevel::Debug,
            jsonl_path: None,
        }
    }
}

/// Runtime settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Seconds between heartbeat metrics, 0 disables
    pub heartbeat_secs: u64,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self { heartbeat_secs: 30 }
    }
}

/// Complete service settings
///
/// Aggregates all sections and provides file I/O operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Bus configuration
    pub bus: BusConfig,
    /// Logging
    pub logging: LoggingSettings,
    /// Transports registered at startup
    pub transports: TransportSettings,
    /// Runtime behaviour
    pub runtime: RuntimeSettings,
}

impl Settings {
    /// Create settings with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Default settings location, `<config dir>/nerve/settings.toml`
    pub fn default_path() -> SettingsResult<PathBuf> {
        let dir = dirs::config_dir().ok_or_else(|| {
            SettingsError::ConfigDirectory("no configuration directory on this platform".into())
        })?;
        Ok(dir.join("nerve").join(SETTINGS_FILE))
    }

    /// Load settings from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = Format::from_path(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| {
            SettingsError::LoadError(format!("{}: {}", path.display(), e))
        })?;

        let settings: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        settings.validate()?;
        tracing::debug!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Load settings, falling back to defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::debug!(path = %path.display(), "No settings file, using defaults");
            Ok(Self::default())
        }
    }

    /// Save settings to file (JSON or TOML), creating parent directories
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match Format::from_path(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content).map_err(|e| {
            SettingsError::SaveError(format!("{}: {}", path.display(), e))
        })?;

        Ok(())
    }

    /// Validate settings
    pub fn validate(&self) -> SettingsResult<()> {
        self.bus.validate()?;
        self.logging.level_filter()?;

        if let Some(path) = &self.transports.jsonl_path {
            if path.as_os_str().is_empty() {
                return Err(SettingsError::invalid(
                    "transports.jsonl_path",
                    "must not be empty",
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nerve_core::DropPolicy;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = Settings::new();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.bus, BusConfig::default());
        assert_eq!(settings.logging.level, "info");
        assert!(settings.transports.log);
        assert_eq!(settings.runtime.heartbeat_secs, 30);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [bus]
            max_queue_size = 64
            drop_policy = "block"

            [runtime]
            heartbeat_secs = 0
            "#,
        )
        .expect("Should parse");

        assert_eq!(settings.bus.max_queue_size, 64);
        assert_eq!(settings.bus.drop_policy, DropPolicy::Block);
        assert_eq!(settings.bus.batch_size, BusConfig::default().batch_size);
        assert_eq!(settings.runtime.heartbeat_secs, 0);
        assert_eq!(settings.logging, LoggingSettings::default());
    }

    #[test]
    fn test_invalid_bus_section_is_rejected() {
        let mut settings = Settings::new();
        settings.bus.default_sample_rate = 1.5;
        assert!(matches!(settings.validate(), Err(SettingsError::Bus(_))));
    }

    #[test]
    fn test_invalid_log_level_is_rejected() {
        let mut settings = Settings::new();
        settings.logging.level = "loud".to_string();
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::InvalidSetting { .. })
        ));

        settings.logging.level = "WARN".to_string();
        assert_eq!(
            settings.logging.level_filter().expect("Should parse"),
            LevelFilter::WARN
        );
    }

    #[test]
    fn test_empty_jsonl_path_is_rejected() {
        let mut settings = Settings::new();
        settings.transports.jsonl_path = Some(PathBuf::new());
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_unsupported_extension() {
        let result = Settings::load_from_file(Path::new("settings.yaml"));
        assert!(matches!(result, Err(SettingsError::UnsupportedFormat(ext)) if ext == "yaml"));
    }

    #[test]
    fn test_default_path_ends_with_settings_file() {
        if let Ok(path) = Settings::default_path() {
            assert!(path.ends_with(Path::new("nerve").join(SETTINGS_FILE)));
        }
    }
}
