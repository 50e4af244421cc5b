//! LED mapping: which color a port's LED-capable devices show

use super::{InputMapping, PersistedMapping, PhysicalDeviceType};
use crate::controller::buttons::Rgb8;
use crate::persistence::{mapping_field_key, save_or_log, ConfigStore};

pub const CLASS_FIELD: &str = "LEDMappingClass";
pub const GAMEPAD_LED_CLASS: &str = "SDLLEDMapping";

/// Closed set of persisted color sources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedColorSource {
    Off = 0,
    Set = 1,
    Game = 2,
}

impl LedColorSource {
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Off),
            1 => Some(Self::Set),
            2 => Some(Self::Game),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedMapping {
    port: usize,
    color_source: LedColorSource,
    saved_color: Rgb8,
}

impl LedMapping {
    pub fn new(port: usize, color_source: LedColorSource, saved_color: Rgb8) -> Self {
        Self {
            port,
            color_source,
            saved_color,
        }
    }

    pub fn port(&self) -> usize {
        self.port
    }

    pub fn color_source(&self) -> LedColorSource {
        self.color_source
    }

    pub fn set_color_source(&mut self, source: LedColorSource) {
        self.color_source = source;
    }

    pub fn saved_color(&self) -> Rgb8 {
        self.saved_color
    }

    pub fn set_saved_color(&mut self, color: Rgb8) {
        self.saved_color = color;
    }

    /// Color to show this frame. `None` keeps the previous command, which
    /// happens when the game supplied no color.
    pub fn color(&self, game_color: Option<Rgb8>) -> Option<Rgb8> {
        match self.color_source {
            LedColorSource::Off => Some(Rgb8::BLACK),
            LedColorSource::Set => Some(self.saved_color),
            LedColorSource::Game => game_color,
        }
    }
}

impl InputMapping for LedMapping {
    fn id(&self) -> String {
        format!("P{}", self.port)
    }

    fn device_type(&self) -> PhysicalDeviceType {
        PhysicalDeviceType::Gamepad
    }

    fn physical_input_name(&self) -> String {
        "LED".to_string()
    }
}

impl PersistedMapping for LedMapping {
    const CATEGORY: &'static str = "LEDMappings";

    fn save_to_config(&self, store: &mut dyn ConfigStore, prefix: &str) {
        let id = self.id();
        let key = |field: &str| mapping_field_key(prefix, Self::CATEGORY, &id, field);

        store.set_string(&key(CLASS_FIELD), GAMEPAD_LED_CLASS);
        store.set_integer(&key("ColorSource"), self.color_source as i64);
        store.set_color(&key("SavedColor"), self.saved_color);
        save_or_log(store);
    }
}
