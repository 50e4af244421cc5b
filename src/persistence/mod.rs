//! # Persistence Module
//!
//! Key/value configuration store used by mappings and ports.
//!
//! Keys are dotted paths laid out as
//! `<prefix>.<Category>.<identityKey>.<Field>`, for example
//! `Controllers.ButtonMappings.P0-B32768-SDLB0.SDLControllerButton`.
//! Clearing a key clears its whole subtree.
//!
//! Writes stay in memory until [`ConfigStore::save`] flushes them. The
//! mapping path treats a failed flush as degraded, not fatal: it is logged
//! and the in-memory state remains authoritative for the session.

pub mod toml_store;

pub use toml_store::TomlConfigStore;

use crate::controller::buttons::Rgb8;
use tracing::error;

/// Errors raised while loading or flushing a store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Typed key/value store with explicit flush
pub trait ConfigStore {
    fn get_integer(&self, key: &str) -> Option<i64>;
    fn get_float(&self, key: &str) -> Option<f64>;
    fn get_string(&self, key: &str) -> Option<String>;
    fn get_color(&self, key: &str) -> Option<Rgb8>;

    fn set_integer(&mut self, key: &str, value: i64);
    fn set_float(&mut self, key: &str, value: f64);
    fn set_string(&mut self, key: &str, value: &str);
    fn set_color(&mut self, key: &str, value: Rgb8);

    /// Removes `key` and every key below it
    fn clear(&mut self, key: &str);

    /// True if `key` or anything below it is set
    fn contains_subtree(&self, key: &str) -> bool;

    fn save(&mut self) -> Result<(), StoreError>;
}

/// `<prefix>.<category>.<id>` subtree of one mapping
pub fn mapping_key(prefix: &str, category: &str, id: &str) -> String {
    format!("{}.{}.{}", prefix, category, id)
}

/// `<prefix>.<category>.<id>.<field>`
pub fn mapping_field_key(prefix: &str, category: &str, id: &str, field: &str) -> String {
    format!("{}.{}.{}.{}", prefix, category, id, field)
}

/// Flushes the store, logging instead of propagating a failure
pub fn save_or_log(store: &mut dyn ConfigStore) {
    if let Err(e) = store.save() {
        error!("Failed to save controller config: {}", e);
    }
}
