//! Mapping factories
//!
//! Each factory builds mappings of one category in two ways:
//!
//! - `create_from_config`: reads `<prefix>.<Category>.<id>.*`. An invalid
//!   enumerated field clears the whole subtree and flushes the store. An
//!   unknown class discriminator is dropped quietly so that configs written
//!   by newer builds still load.
//! - `create_from_live_input`: samples the devices assigned to a port for
//!   rebinding. Per device, buttons are scanned in ascending index order
//!   first, then axes against the threshold; the first hit wins.

use super::axis::{self, AxisMapping, AxisSource};
use super::button::{self, ButtonMapping, ButtonSource};
use super::led::{self, LedColorSource, LedMapping};
use super::rumble::{self, RumbleMapping, DEFAULT_INTENSITY_PERCENT};
use super::{PersistedMapping, PollContext};
use crate::controller::buttons::{
    normalize_axis, AxisDirection, GamepadAxis, GamepadButton, LogicalAxis, PadButtons, Rgb8,
};
use crate::persistence::{mapping_field_key, mapping_key, save_or_log, ConfigStore};
use crate::physical_device::{ConnectedDevice, KeyboardState, Scancode};
use tracing::{debug, warn};

/// First physical input currently active on one device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LiveInput {
    Button(GamepadButton),
    Axis(GamepadAxis, AxisDirection),
}

fn scan_device(ctx: &PollContext<'_>, device: &ConnectedDevice) -> Option<LiveInput> {
    if let Some(button) = GamepadButton::ALL
        .into_iter()
        .find(|button| ctx.gamepad_button(device, *button))
    {
        return Some(LiveInput::Button(button));
    }

    GamepadAxis::ALL.into_iter().find_map(|axis| {
        let value = normalize_axis(ctx.gamepad_axis(device, axis));
        AxisDirection::classify(value, ctx.axis_threshold).map(|direction| LiveInput::Axis(axis, direction))
    })
}

/// Scans devices of `port` accepted by `filter`, ascending by instance id
fn scan_port(
    ctx: &PollContext<'_>,
    port: usize,
    filter: impl Fn(&ConnectedDevice) -> bool,
) -> Option<LiveInput> {
    ctx.devices_for_port(port)
        .filter(|device| filter(*device))
        .find_map(|device| scan_device(ctx, device))
}

/// Reads config fields of one mapping and heals it on validation failure
struct ConfigReader<'s> {
    store: &'s mut dyn ConfigStore,
    prefix: &'s str,
    category: &'static str,
    id: &'s str,
}

impl<'s> ConfigReader<'s> {
    fn key(&self, field: &str) -> String {
        mapping_field_key(self.prefix, self.category, self.id, field)
    }

    fn string(&self, field: &str) -> Option<String> {
        self.store.get_string(&self.key(field))
    }

    fn integer(&self, field: &str) -> Option<i64> {
        self.store.get_integer(&self.key(field))
    }

    fn float(&self, field: &str) -> Option<f64> {
        self.store.get_float(&self.key(field))
    }

    fn color(&self, field: &str) -> Option<Rgb8> {
        self.store.get_color(&self.key(field))
    }

    /// Clears the mapping subtree, flushes and yields `None`
    fn heal<T>(&mut self, reason: &str) -> Option<T> {
        warn!(
            "Invalid {} config for '{}' ({}), clearing it",
            self.category, self.id, reason
        );
        self.store.clear(&mapping_key(self.prefix, self.category, self.id));
        save_or_log(&mut *self.store);
        None
    }

    fn unknown_class<T>(&self, class: &str) -> Option<T> {
        debug!(
            "Skipping {} '{}' with unknown class '{}'",
            self.category, self.id, class
        );
        None
    }
}

fn bitmask_from(value: Option<i64>) -> Option<PadButtons> {
    let bits = u16::try_from(value?).ok()?;
    PadButtons::from_bits(bits).filter(|mask| !mask.is_empty())
}

fn scancode_from(value: Option<i64>) -> Option<Scancode> {
    u16::try_from(value?).ok().map(Scancode)
}

fn index_from(value: Option<i64>) -> Option<i32> {
    i32::try_from(value?).ok()
}

pub struct ButtonMappingFactory;

impl ButtonMappingFactory {
    pub fn create_from_config(
        store: &mut dyn ConfigStore,
        prefix: &str,
        port: usize,
        id: &str,
    ) -> Option<ButtonMapping> {
        let mut reader = ConfigReader {
            store,
            prefix,
            category: ButtonMapping::CATEGORY,
            id,
        };
        let class = reader.string(button::CLASS_FIELD).unwrap_or_default();
        let source = match class.as_str() {
            button::GAMEPAD_BUTTON_CLASS => {
                let index = index_from(reader.integer("SDLControllerButton"));
                match index.and_then(GamepadButton::from_index) {
                    Some(button) => ButtonSource::GamepadButton(button),
                    None => return reader.heal("controller button"),
                }
            }
            button::GAMEPAD_AXIS_DIRECTION_CLASS => {
                let axis = index_from(reader.integer("SDLControllerAxis")).and_then(GamepadAxis::from_index);
                let direction = reader
                    .integer("AxisDirection")
                    .and_then(|d| i32::try_from(d).ok())
                    .and_then(AxisDirection::from_i32);
                match (axis, direction) {
                    (Some(axis), Some(direction)) => ButtonSource::GamepadAxisDirection(axis, direction),
                    _ => return reader.heal("axis direction"),
                }
            }
            button::KEYBOARD_KEY_CLASS => match scancode_from(reader.integer("KeyboardScancode")) {
                Some(key) => ButtonSource::KeyboardKey(key),
                None => return reader.heal("scancode"),
            },
            button::VIRTUAL_BUTTON_CLASS => match index_from(reader.integer("VirtualButtonIndex")) {
                Some(index) => ButtonSource::VirtualButton(index),
                None => return reader.heal("virtual button"),
            },
            other => return reader.unknown_class(other),
        };

        let Some(bitmask) = bitmask_from(reader.integer("Bitmask")) else {
            return reader.heal("bitmask");
        };
        Some(ButtonMapping::new(port, bitmask, source))
    }

    /// Gamepad button or stick half currently pressed on a device of `port`
    pub fn create_from_live_input(
        ctx: &PollContext<'_>,
        port: usize,
        bitmask: PadButtons,
    ) -> Option<ButtonMapping> {
        let source = match scan_port(ctx, port, |_| true)? {
            LiveInput::Button(button) => ButtonSource::GamepadButton(button),
            LiveInput::Axis(axis, direction) => ButtonSource::GamepadAxisDirection(axis, direction),
        };
        Some(ButtonMapping::new(port, bitmask, source))
    }

    /// Lowest pressed key
    pub fn create_from_keyboard(
        keyboard: &KeyboardState,
        port: usize,
        bitmask: PadButtons,
    ) -> Option<ButtonMapping> {
        let key = keyboard.first_pressed()?;
        Some(ButtonMapping::new(port, bitmask, ButtonSource::KeyboardKey(key)))
    }
}

pub struct AxisMappingFactory;

impl AxisMappingFactory {
    pub fn create_from_config(
        store: &mut dyn ConfigStore,
        prefix: &str,
        port: usize,
        id: &str,
    ) -> Option<AxisMapping> {
        let mut reader = ConfigReader {
            store,
            prefix,
            category: AxisMapping::CATEGORY,
            id,
        };
        let class = reader.string(axis::CLASS_FIELD).unwrap_or_default();
        let source = match class.as_str() {
            axis::GAMEPAD_AXIS_CLASS => {
                match index_from(reader.integer("SDLControllerAxis")).and_then(GamepadAxis::from_index) {
                    Some(axis) => AxisSource::GamepadAxis(axis),
                    None => return reader.heal("controller axis"),
                }
            }
            axis::KEYBOARD_KEYS_CLASS => {
                let negative = scancode_from(reader.integer("NegativeScancode"));
                let positive = scancode_from(reader.integer("PositiveScancode"));
                match (negative, positive) {
                    (Some(negative), Some(positive)) => AxisSource::KeyboardKeys { negative, positive },
                    _ => return reader.heal("scancodes"),
                }
            }
            axis::VIRTUAL_AXIS_CLASS => match index_from(reader.integer("VirtualAxisIndex")) {
                Some(index) => AxisSource::VirtualAxis(index),
                None => return reader.heal("virtual axis"),
            },
            other => return reader.unknown_class(other),
        };

        let Some(target) = index_from(reader.integer("LogicalAxis")).and_then(LogicalAxis::from_index) else {
            return reader.heal("logical axis");
        };
        let deadzone = reader.float("Deadzone").unwrap_or(f64::from(axis::DEFAULT_DEADZONE)) as f32;
        let sensitivity = reader
            .float("Sensitivity")
            .unwrap_or(f64::from(axis::DEFAULT_SENSITIVITY)) as f32;

        Some(AxisMapping::new(port, target, source).with_response(deadzone, sensitivity))
    }

    /// Gamepad axis currently past the threshold on a device of `port`.
    /// Buttons are ignored.
    pub fn create_from_live_input(
        ctx: &PollContext<'_>,
        port: usize,
        target: LogicalAxis,
    ) -> Option<AxisMapping> {
        let axis = ctx.devices_for_port(port).find_map(|device| {
            GamepadAxis::ALL.into_iter().find(|axis| {
                let value = normalize_axis(ctx.gamepad_axis(device, *axis));
                AxisDirection::classify(value, ctx.axis_threshold).is_some()
            })
        })?;
        Some(AxisMapping::new(port, target, AxisSource::GamepadAxis(axis)))
    }
}

pub struct LedMappingFactory;

impl LedMappingFactory {
    pub fn create_from_config(
        store: &mut dyn ConfigStore,
        prefix: &str,
        port: usize,
        id: &str,
    ) -> Option<LedMapping> {
        let mut reader = ConfigReader {
            store,
            prefix,
            category: LedMapping::CATEGORY,
            id,
        };
        let class = reader.string(led::CLASS_FIELD).unwrap_or_default();
        let saved_color = reader.color("SavedColor").unwrap_or(Rgb8::BLACK);

        // Validated before the class so a corrupt entry is healed either way
        let Some(color_source) = reader.integer("ColorSource").and_then(LedColorSource::from_i64) else {
            return reader.heal("color source");
        };

        if class != led::GAMEPAD_LED_CLASS {
            return reader.unknown_class(&class);
        }
        Some(LedMapping::new(port, color_source, saved_color))
    }

    /// Any input on an LED-capable device of `port`
    pub fn create_from_live_input(ctx: &PollContext<'_>, port: usize) -> Option<LedMapping> {
        scan_port(ctx, port, |device| device.capabilities.has_led())?;
        Some(LedMapping::new(port, LedColorSource::Off, Rgb8::BLACK))
    }
}

pub struct RumbleMappingFactory;

impl RumbleMappingFactory {
    pub fn create_from_config(
        store: &mut dyn ConfigStore,
        prefix: &str,
        port: usize,
        id: &str,
    ) -> Option<RumbleMapping> {
        let mut reader = ConfigReader {
            store,
            prefix,
            category: RumbleMapping::CATEGORY,
            id,
        };
        let class = reader.string(rumble::CLASS_FIELD).unwrap_or_default();
        if class != rumble::GAMEPAD_RUMBLE_CLASS {
            return reader.unknown_class(&class);
        }

        let percent = |value: Option<i64>| value.and_then(|v| u8::try_from(v).ok()).filter(|v| *v <= 100);
        let low = percent(reader.integer("LowFrequencyIntensity"));
        let high = percent(reader.integer("HighFrequencyIntensity"));
        match (low, high) {
            (Some(low), Some(high)) => Some(RumbleMapping::new(port, low, high)),
            _ => reader.heal("intensity"),
        }
    }

    /// Any input on a rumble-capable device of `port`
    pub fn create_from_live_input(ctx: &PollContext<'_>, port: usize) -> Option<RumbleMapping> {
        scan_port(ctx, port, |device| device.capabilities.has_rumble)?;
        Some(RumbleMapping::new(
            port,
            DEFAULT_INTENSITY_PERCENT,
            DEFAULT_INTENSITY_PERCENT,
        ))
    }
}
