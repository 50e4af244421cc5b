//! TOML-backed [`ConfigStore`]
//!
//! Holds a flat ordered map of dotted keys. With a path, `save` writes the
//! map as a single `[entries]` table; without one the store is memory-only.

use super::{ConfigStore, StoreError};
use crate::controller::buttons::Rgb8;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Integer(i64),
    Float(f64),
    Color([u8; 3]),
    String(String),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    entries: BTreeMap<String, ConfigValue>,
}

#[derive(Debug, Default)]
pub struct TomlConfigStore {
    entries: BTreeMap<String, ConfigValue>,
    path: Option<PathBuf>,
    saves: usize,
}

impl TomlConfigStore {
    /// Memory-only store
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads `path` if it exists; a missing file yields an empty store
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let file: StoreFile = toml::from_str(&content)?;
            info!("Loaded {} config entries from {}", file.entries.len(), path.display());
            file.entries
        } else {
            info!("No config at {}, starting empty", path.display());
            BTreeMap::new()
        };

        Ok(Self {
            entries,
            path: Some(path),
            saves: 0,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of successful `save` calls
    pub fn save_count(&self) -> usize {
        self.saves
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    fn subtree_prefix(key: &str) -> String {
        format!("{}.", key)
    }
}

impl ConfigStore for TomlConfigStore {
    fn get_integer(&self, key: &str) -> Option<i64> {
        match self.entries.get(key)? {
            ConfigValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    fn get_float(&self, key: &str) -> Option<f64> {
        match self.entries.get(key)? {
            ConfigValue::Float(v) => Some(*v),
            ConfigValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    fn get_string(&self, key: &str) -> Option<String> {
        match self.entries.get(key)? {
            ConfigValue::String(v) => Some(v.clone()),
            _ => None,
        }
    }

    fn get_color(&self, key: &str) -> Option<Rgb8> {
        match self.entries.get(key)? {
            ConfigValue::Color([r, g, b]) => Some(Rgb8::new(*r, *g, *b)),
            _ => None,
        }
    }

    fn set_integer(&mut self, key: &str, value: i64) {
        self.entries.insert(key.to_string(), ConfigValue::Integer(value));
    }

    fn set_float(&mut self, key: &str, value: f64) {
        self.entries.insert(key.to_string(), ConfigValue::Float(value));
    }

    fn set_string(&mut self, key: &str, value: &str) {
        self.entries
            .insert(key.to_string(), ConfigValue::String(value.to_string()));
    }

    fn set_color(&mut self, key: &str, value: Rgb8) {
        self.entries
            .insert(key.to_string(), ConfigValue::Color([value.r, value.g, value.b]));
    }

    fn clear(&mut self, key: &str) {
        let prefix = Self::subtree_prefix(key);
        let before = self.entries.len();
        self.entries.retain(|k, _| k != key && !k.starts_with(&prefix));
        debug!("Cleared {} entries under {}", before - self.entries.len(), key);
    }

    fn contains_subtree(&self, key: &str) -> bool {
        let prefix = Self::subtree_prefix(key);
        self.entries
            .keys()
            .any(|k| k == key || k.starts_with(&prefix))
    }

    fn save(&mut self) -> Result<(), StoreError> {
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = StoreFile {
                entries: self.entries.clone(),
            };
            let content = toml::to_string_pretty(&file)?;
            std::fs::write(path, content)?;
            debug!("Saved {} config entries to {}", self.entries.len(), path.display());
        }
        self.saves += 1;
        Ok(())
    }
}
