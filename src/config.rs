//! Deck settings
//!
//! Loaded from `<config_dir>/controldeck/settings.toml`. A missing file is
//! replaced by the defaults, which are written back so users have something
//! to edit. Out-of-range values are corrected with a warning.

use crate::controller::buttons::MAX_CONTROLLERS;
use crate::mapping::DEFAULT_AXIS_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};

const CONFIG_DIR: &str = "controldeck";
const SETTINGS_FILE: &str = "settings.toml";
const MAPPINGS_FILE: &str = "mappings.toml";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to access settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse settings file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DeckSettings {
    /// Root of every mapping key in the store
    pub config_prefix: String,
    /// Fraction of full scale an axis must pass to count as pressed
    pub live_input_threshold: f32,
    /// Port newly connected devices are assigned to
    pub default_port: usize,
    pub frame_rate_hz: u32,
    /// Mapping store; defaults to `mappings.toml` next to the settings
    pub mapping_file: Option<PathBuf>,
    pub log_level: String,
}

impl Default for DeckSettings {
    fn default() -> Self {
        Self {
            config_prefix: "Controllers".to_string(),
            live_input_threshold: DEFAULT_AXIS_THRESHOLD,
            default_port: 0,
            frame_rate_hz: 60,
            mapping_file: None,
            log_level: "info".to_string(),
        }
    }
}

impl DeckSettings {
    pub fn config_dir() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| {
            warn!("Could not determine config directory, using current directory");
            PathBuf::from(".")
        });
        path.push(CONFIG_DIR);
        path
    }

    pub fn default_path() -> PathBuf {
        Self::config_dir().join(SETTINGS_FILE)
    }

    /// Loads `path`, writing defaults first if it does not exist
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("Settings file {} does not exist, using defaults", path.display());
            let settings = Self::default();
            settings.save(path)?;
            return Ok(settings);
        }
        Self::load(path)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let settings: Self = toml::from_str(&content)?;
        info!("Loaded settings from {}", path.display());
        Ok(settings.validated())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        info!("Saved settings to {}", path.display());
        Ok(())
    }

    /// Replaces out-of-range values with defaults
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        if !(self.live_input_threshold > 0.0 && self.live_input_threshold < 1.0) {
            warn!(
                "live_input_threshold {} out of range, using {}",
                self.live_input_threshold, defaults.live_input_threshold
            );
            self.live_input_threshold = defaults.live_input_threshold;
        }
        if self.default_port >= MAX_CONTROLLERS {
            warn!("default_port {} out of range, using 0", self.default_port);
            self.default_port = 0;
        }
        if self.frame_rate_hz == 0 {
            warn!("frame_rate_hz must be positive, using {}", defaults.frame_rate_hz);
            self.frame_rate_hz = defaults.frame_rate_hz;
        }
        if self.config_prefix.trim().is_empty() {
            self.config_prefix = defaults.config_prefix;
        }
        self
    }

    pub fn mapping_path(&self) -> PathBuf {
        self.mapping_file
            .clone()
            .unwrap_or_else(|| Self::config_dir().join(MAPPINGS_FILE))
    }

    pub fn tracing_level(&self) -> Level {
        self.log_level.parse().unwrap_or_else(|_| {
            warn!("Unknown log level '{}', using info", self.log_level);
            Level::INFO
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_fills_defaults() {
        let settings: DeckSettings = toml::from_str("default_port = 2\nlog_level = \"debug\"").unwrap();
        assert_eq!(settings.default_port, 2);
        assert_eq!(settings.config_prefix, "Controllers");
        assert_eq!(settings.live_input_threshold, 0.7);
        assert_eq!(settings.tracing_level(), Level::DEBUG);
    }

    #[test]
    fn test_validation_corrects_ranges() {
        let settings = DeckSettings {
            live_input_threshold: 1.5,
            default_port: 9,
            frame_rate_hz: 0,
            config_prefix: " ".to_string(),
            ..Default::default()
        }
        .validated();
        assert_eq!(settings, DeckSettings::default());
    }

    #[test]
    fn test_load_or_create_writes_defaults() {
        let mut path = std::env::temp_dir();
        path.push(format!("controldeck-settings-{}", std::process::id()));
        path.push(SETTINGS_FILE);
        let _ = std::fs::remove_file(&path);

        let created = DeckSettings::load_or_create(&path).unwrap();
        assert!(path.exists());
        let loaded = DeckSettings::load(&path).unwrap();
        assert_eq!(created, loaded);

        let _ = std::fs::remove_file(&path);
    }
}
