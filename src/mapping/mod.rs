//! Input mappings
//!
//! A mapping binds one physical input source to one logical target of a
//! port: a button bit, an axis slot, the LED color or rumble output.
//! Mappings are plain values. They never hold device handles; every poll
//! walks the registry for devices currently assigned to the port, so a
//! device that disappeared simply stops contributing.
//!
//! Two concerns are kept apart:
//!
//! 1. [`InputMapping`] - identity, device type and UI names
//! 2. [`PersistedMapping`] - save/erase under `<prefix>.<Category>.<id>`
//!
//! Polling goes through [`PollContext`], which bundles everything a mapping
//! may read during one frame.

pub mod axis;
pub mod button;
pub mod factory;
pub mod led;
pub mod rumble;

pub use axis::{AxisMapping, AxisSource};
pub use button::{ButtonMapping, ButtonSource};
pub use factory::{AxisMappingFactory, ButtonMappingFactory, LedMappingFactory, RumbleMappingFactory};
pub use led::{LedColorSource, LedMapping};
pub use rumble::RumbleMapping;

use crate::backend::InputBackend;
use crate::controller::buttons::{GamepadAxis, GamepadButton};
use crate::mobile::VirtualControllerBridge;
use crate::persistence::{mapping_key, save_or_log, ConfigStore};
use crate::physical_device::{ConnectedDevice, DeviceRegistry, KeyboardState};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Threshold (fraction of full scale) an axis must pass to count as a
/// digital direction
pub const DEFAULT_AXIS_THRESHOLD: f32 = 0.7;

/// Which kind of physical source a mapping polls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhysicalDeviceType {
    KeyboardKey,
    Gamepad,
    VirtualController,
}

impl PhysicalDeviceType {
    /// Keyboard mappings keep working while gamepad input is blocked
    pub fn is_blockable(self) -> bool {
        !matches!(self, Self::KeyboardKey)
    }
}

impl fmt::Display for PhysicalDeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::KeyboardKey => "Keyboard",
            Self::Gamepad => "Gamepad",
            Self::VirtualController => "Touch Controller",
        };
        f.write_str(name)
    }
}

/// Read-only view of every input source for one frame
pub struct PollContext<'a> {
    pub backend: &'a dyn InputBackend,
    pub registry: &'a DeviceRegistry,
    pub virtual_pad: &'a VirtualControllerBridge,
    pub keyboard: &'a KeyboardState,
    pub gamepad_input_blocked: bool,
    pub axis_threshold: f32,
}

impl<'a> PollContext<'a> {
    pub fn new(
        backend: &'a dyn InputBackend,
        registry: &'a DeviceRegistry,
        virtual_pad: &'a VirtualControllerBridge,
        keyboard: &'a KeyboardState,
    ) -> Self {
        Self {
            backend,
            registry,
            virtual_pad,
            keyboard,
            gamepad_input_blocked: false,
            axis_threshold: DEFAULT_AXIS_THRESHOLD,
        }
    }

    pub fn with_input_blocked(mut self, blocked: bool) -> Self {
        self.gamepad_input_blocked = blocked;
        self
    }

    pub fn with_axis_threshold(mut self, threshold: f32) -> Self {
        self.axis_threshold = threshold;
        self
    }

    /// True if mappings of `device_type` must report neutral this frame
    pub fn suppresses(&self, device_type: PhysicalDeviceType) -> bool {
        self.gamepad_input_blocked && device_type.is_blockable()
    }

    /// Gamepads assigned to `port`, the virtual pad included
    pub fn devices_for_port(&self, port: usize) -> impl Iterator<Item = &'a ConnectedDevice> + 'a {
        self.registry.devices_for_port(port)
    }

    /// True if `device` is the attached virtual pad
    pub fn is_virtual_pad(&self, device: &ConnectedDevice) -> bool {
        device.capabilities.is_virtual && self.virtual_pad.instance_id() == Some(device.instance_id)
    }

    /// True if the attached virtual pad is assigned to `port`
    pub fn virtual_pad_on_port(&self, port: usize) -> bool {
        self.virtual_pad
            .instance_id()
            .and_then(|id| self.registry.get(id))
            .is_some_and(|device| device.port == port)
    }

    /// Button state of one device.
    ///
    /// The virtual pad is read from the shadow cache only. Other devices go
    /// through the mapping layer first and fall back to the raw joystick
    /// button, which some backends only update for virtual joysticks.
    pub fn gamepad_button(&self, device: &ConnectedDevice, button: GamepadButton) -> bool {
        if self.is_virtual_pad(device) {
            return button
                .joystick_index()
                .is_some_and(|index| self.virtual_pad.button_state(index as i32));
        }

        if self.backend.button(device.instance_id, button) {
            return true;
        }
        button
            .joystick_index()
            .is_some_and(|index| self.backend.joystick_button(device.instance_id, index))
    }

    /// Axis value of one device; the virtual pad is read from the shadow cache
    pub fn gamepad_axis(&self, device: &ConnectedDevice, axis: GamepadAxis) -> i16 {
        if self.is_virtual_pad(device) {
            return self.virtual_pad.axis_state(axis.index());
        }
        self.backend.axis(device.instance_id, axis)
    }
}

/// Identity and naming shared by every mapping
pub trait InputMapping {
    /// Stable identity, unique within the mapping category. Used as the
    /// persistence key.
    fn id(&self) -> String;

    fn device_type(&self) -> PhysicalDeviceType;

    fn physical_input_name(&self) -> String;

    fn physical_device_name(&self) -> String {
        self.device_type().to_string()
    }
}

/// Mappings stored under `<prefix>.<CATEGORY>.<id>.<Field>`
pub trait PersistedMapping: InputMapping {
    const CATEGORY: &'static str;

    /// Writes every field and flushes the store
    fn save_to_config(&self, store: &mut dyn ConfigStore, prefix: &str);

    /// Clears every field and flushes the store
    fn erase_from_config(&self, store: &mut dyn ConfigStore, prefix: &str) {
        store.clear(&mapping_key(prefix, Self::CATEGORY, &self.id()));
        save_or_log(store);
    }
}
