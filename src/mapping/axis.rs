//! Axis mappings: sources that write one analog slot of the pad

use super::{InputMapping, PersistedMapping, PhysicalDeviceType, PollContext};
use crate::controller::buttons::{GamepadAxis, LogicalAxis, AXIS_FULL_SCALE};
use crate::persistence::{mapping_field_key, save_or_log, ConfigStore};
use crate::physical_device::Scancode;

pub const CLASS_FIELD: &str = "AxisMappingClass";
pub const GAMEPAD_AXIS_CLASS: &str = "SDLAxisToAxisMapping";
pub const KEYBOARD_KEYS_CLASS: &str = "KeyboardKeysToAxisMapping";
pub const VIRTUAL_AXIS_CLASS: &str = "VirtualAxisToAxisMapping";

pub const DEFAULT_DEADZONE: f32 = 0.0;
pub const DEFAULT_SENSITIVITY: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisSource {
    GamepadAxis(GamepadAxis),
    /// Two keys driving the axis to full negative/positive scale
    KeyboardKeys { negative: Scancode, positive: Scancode },
    /// Raw axis index of the virtual pad, read from the shadow cache
    VirtualAxis(i32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AxisMapping {
    port: usize,
    target: LogicalAxis,
    source: AxisSource,
    deadzone: f32,
    sensitivity: f32,
}

impl AxisMapping {
    pub fn new(port: usize, target: LogicalAxis, source: AxisSource) -> Self {
        Self {
            port,
            target,
            source,
            deadzone: DEFAULT_DEADZONE,
            sensitivity: DEFAULT_SENSITIVITY,
        }
    }

    /// `deadzone` is a fraction of full scale, `sensitivity` a multiplier
    pub fn with_response(mut self, deadzone: f32, sensitivity: f32) -> Self {
        self.deadzone = deadzone.clamp(0.0, 1.0);
        self.sensitivity = sensitivity.max(0.0);
        self
    }

    pub fn port(&self) -> usize {
        self.port
    }

    pub fn target(&self) -> LogicalAxis {
        self.target
    }

    pub fn source(&self) -> AxisSource {
        self.source
    }

    pub fn deadzone(&self) -> f32 {
        self.deadzone
    }

    pub fn sensitivity(&self) -> f32 {
        self.sensitivity
    }

    pub fn class_name(&self) -> &'static str {
        match self.source {
            AxisSource::GamepadAxis(_) => GAMEPAD_AXIS_CLASS,
            AxisSource::KeyboardKeys { .. } => KEYBOARD_KEYS_CLASS,
            AxisSource::VirtualAxis(_) => VIRTUAL_AXIS_CLASS,
        }
    }

    /// Current value after deadzone and sensitivity; 0 when inactive.
    ///
    /// With several gamepads on the port the largest deflection wins.
    pub fn value(&self, ctx: &PollContext<'_>) -> i16 {
        if ctx.suppresses(self.device_type()) {
            return 0;
        }

        let raw = match self.source {
            AxisSource::GamepadAxis(axis) => ctx
                .devices_for_port(self.port)
                .map(|device| ctx.gamepad_axis(device, axis))
                .max_by_key(|value| value.unsigned_abs())
                .unwrap_or(0),
            AxisSource::KeyboardKeys { negative, positive } => {
                match (ctx.keyboard.is_pressed(negative), ctx.keyboard.is_pressed(positive)) {
                    (true, false) => -i16::MAX,
                    (false, true) => i16::MAX,
                    _ => 0,
                }
            }
            AxisSource::VirtualAxis(index) => {
                if ctx.virtual_pad_on_port(self.port) {
                    ctx.virtual_pad.axis_state(index)
                } else {
                    0
                }
            }
        };
        self.shape(raw)
    }

    /// Writes the axis slot. A neutral reading leaves the slot untouched so
    /// an idle source cannot erase another mapping's deflection.
    pub fn update_axes(&self, ctx: &PollContext<'_>, axes: &mut [i16; LogicalAxis::COUNT]) {
        let value = self.value(ctx);
        if value != 0 {
            axes[self.target.slot()] = value;
        }
    }

    fn shape(&self, raw: i16) -> i16 {
        let normalized = f32::from(raw) / AXIS_FULL_SCALE;
        if normalized.abs() <= self.deadzone {
            return 0;
        }
        let scaled = (normalized * self.sensitivity).clamp(-1.0, 1.0) * AXIS_FULL_SCALE;
        scaled.round() as i16
    }
}

impl InputMapping for AxisMapping {
    fn id(&self) -> String {
        let prefix = format!("P{}-A{}", self.port, self.target.slot());
        match self.source {
            AxisSource::GamepadAxis(axis) => format!("{}-SDLA{}", prefix, axis.index()),
            AxisSource::KeyboardKeys { negative, positive } => {
                format!("{}-KB{}-{}", prefix, negative, positive)
            }
            AxisSource::VirtualAxis(index) => format!("{}-VA{}", prefix, index),
        }
    }

    fn device_type(&self) -> PhysicalDeviceType {
        match self.source {
            AxisSource::GamepadAxis(_) => PhysicalDeviceType::Gamepad,
            AxisSource::KeyboardKeys { .. } => PhysicalDeviceType::KeyboardKey,
            AxisSource::VirtualAxis(_) => PhysicalDeviceType::VirtualController,
        }
    }

    fn physical_input_name(&self) -> String {
        match self.source {
            AxisSource::GamepadAxis(axis) => axis.display_name(None),
            AxisSource::KeyboardKeys { negative, positive } => {
                format!("Key {} / Key {}", negative, positive)
            }
            AxisSource::VirtualAxis(index) => format!("A{}", index),
        }
    }
}

impl PersistedMapping for AxisMapping {
    const CATEGORY: &'static str = "AxisMappings";

    fn save_to_config(&self, store: &mut dyn ConfigStore, prefix: &str) {
        let id = self.id();
        let key = |field: &str| mapping_field_key(prefix, Self::CATEGORY, &id, field);

        store.set_string(&key(CLASS_FIELD), self.class_name());
        store.set_integer(&key("LogicalAxis"), self.target.slot() as i64);
        store.set_float(&key("Deadzone"), f64::from(self.deadzone));
        store.set_float(&key("Sensitivity"), f64::from(self.sensitivity));
        match self.source {
            AxisSource::GamepadAxis(axis) => {
                store.set_integer(&key("SDLControllerAxis"), i64::from(axis.index()));
            }
            AxisSource::KeyboardKeys { negative, positive } => {
                store.set_integer(&key("NegativeScancode"), i64::from(negative.0));
                store.set_integer(&key("PositiveScancode"), i64::from(positive.0));
            }
            AxisSource::VirtualAxis(index) => {
                store.set_integer(&key("VirtualAxisIndex"), i64::from(index));
            }
        }
        save_or_log(store);
    }
}
