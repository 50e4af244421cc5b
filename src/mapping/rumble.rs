//! Rumble mapping: per-port motor intensities

use super::{InputMapping, PersistedMapping, PhysicalDeviceType};
use crate::persistence::{mapping_field_key, save_or_log, ConfigStore};

pub const CLASS_FIELD: &str = "RumbleMappingClass";
pub const GAMEPAD_RUMBLE_CLASS: &str = "SDLRumbleMapping";

pub const DEFAULT_INTENSITY_PERCENT: u8 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RumbleMapping {
    port: usize,
    low_frequency_percent: u8,
    high_frequency_percent: u8,
}

impl RumbleMapping {
    /// Intensities are percentages and are clamped to 100
    pub fn new(port: usize, low_frequency_percent: u8, high_frequency_percent: u8) -> Self {
        Self {
            port,
            low_frequency_percent: low_frequency_percent.min(100),
            high_frequency_percent: high_frequency_percent.min(100),
        }
    }

    pub fn port(&self) -> usize {
        self.port
    }

    pub fn low_frequency_percent(&self) -> u8 {
        self.low_frequency_percent
    }

    pub fn high_frequency_percent(&self) -> u8 {
        self.high_frequency_percent
    }

    /// Motor intensities in backend units
    pub fn motor_intensities(&self) -> (u16, u16) {
        (
            percent_to_motor(self.low_frequency_percent),
            percent_to_motor(self.high_frequency_percent),
        )
    }
}

fn percent_to_motor(percent: u8) -> u16 {
    (u32::from(u16::MAX) * u32::from(percent) / 100) as u16
}

impl InputMapping for RumbleMapping {
    fn id(&self) -> String {
        format!("P{}", self.port)
    }

    fn device_type(&self) -> PhysicalDeviceType {
        PhysicalDeviceType::Gamepad
    }

    fn physical_input_name(&self) -> String {
        "Rumble".to_string()
    }
}

impl PersistedMapping for RumbleMapping {
    const CATEGORY: &'static str = "RumbleMappings";

    fn save_to_config(&self, store: &mut dyn ConfigStore, prefix: &str) {
        let id = self.id();
        let key = |field: &str| mapping_field_key(prefix, Self::CATEGORY, &id, field);

        store.set_string(&key(CLASS_FIELD), GAMEPAD_RUMBLE_CLASS);
        store.set_integer(&key("LowFrequencyIntensity"), i64::from(self.low_frequency_percent));
        store.set_integer(&key("HighFrequencyIntensity"), i64::from(self.high_frequency_percent));
        save_or_log(store);
    }
}
