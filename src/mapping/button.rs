//! Button mappings: anything that can set one bit of the pad bitmask

use super::{InputMapping, PersistedMapping, PhysicalDeviceType, PollContext};
use crate::controller::buttons::{normalize_axis, AxisDirection, GamepadAxis, GamepadButton, PadButtons};
use crate::persistence::{mapping_field_key, save_or_log, ConfigStore};
use crate::physical_device::Scancode;

pub const CLASS_FIELD: &str = "ButtonMappingClass";
pub const GAMEPAD_BUTTON_CLASS: &str = "SDLButtonToButtonMapping";
pub const GAMEPAD_AXIS_DIRECTION_CLASS: &str = "SDLAxisDirectionToButtonMapping";
pub const KEYBOARD_KEY_CLASS: &str = "KeyboardKeyToButtonMapping";
pub const VIRTUAL_BUTTON_CLASS: &str = "VirtualButtonToButtonMapping";

/// Physical source of a button mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonSource {
    GamepadButton(GamepadButton),
    /// One half of a gamepad axis read as a digital button
    GamepadAxisDirection(GamepadAxis, AxisDirection),
    KeyboardKey(Scancode),
    /// Raw button index of the virtual pad, read from the shadow cache
    VirtualButton(i32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ButtonMapping {
    port: usize,
    bitmask: PadButtons,
    source: ButtonSource,
}

impl ButtonMapping {
    pub fn new(port: usize, bitmask: PadButtons, source: ButtonSource) -> Self {
        Self {
            port,
            bitmask,
            source,
        }
    }

    pub fn port(&self) -> usize {
        self.port
    }

    pub fn bitmask(&self) -> PadButtons {
        self.bitmask
    }

    pub fn source(&self) -> ButtonSource {
        self.source
    }

    /// Persisted class discriminator
    pub fn class_name(&self) -> &'static str {
        match self.source {
            ButtonSource::GamepadButton(_) => GAMEPAD_BUTTON_CLASS,
            ButtonSource::GamepadAxisDirection(..) => GAMEPAD_AXIS_DIRECTION_CLASS,
            ButtonSource::KeyboardKey(_) => KEYBOARD_KEY_CLASS,
            ButtonSource::VirtualButton(_) => VIRTUAL_BUTTON_CLASS,
        }
    }

    /// True if the physical source currently reports pressed
    pub fn is_pressed(&self, ctx: &PollContext<'_>) -> bool {
        if ctx.suppresses(self.device_type()) {
            return false;
        }

        match self.source {
            ButtonSource::GamepadButton(button) => ctx
                .devices_for_port(self.port)
                .any(|device| ctx.gamepad_button(device, button)),
            ButtonSource::GamepadAxisDirection(axis, direction) => {
                ctx.devices_for_port(self.port).any(|device| {
                    let value = normalize_axis(ctx.gamepad_axis(device, axis));
                    AxisDirection::classify(value, ctx.axis_threshold) == Some(direction)
                })
            }
            ButtonSource::KeyboardKey(key) => ctx.keyboard.is_pressed(key),
            ButtonSource::VirtualButton(index) => {
                ctx.virtual_pad_on_port(self.port) && ctx.virtual_pad.button_state(index)
            }
        }
    }

    /// ORs the bit into `buttons` if pressed. Never clears bits.
    pub fn update_pad(&self, ctx: &PollContext<'_>, buttons: &mut PadButtons) {
        if self.is_pressed(ctx) {
            buttons.insert(self.bitmask);
        }
    }
}

impl InputMapping for ButtonMapping {
    fn id(&self) -> String {
        let prefix = format!("P{}-B{}", self.port, self.bitmask.bits());
        match self.source {
            ButtonSource::GamepadButton(button) => format!("{}-SDLB{}", prefix, button.index()),
            ButtonSource::GamepadAxisDirection(axis, direction) => {
                format!("{}-SDLA{}-AD{}", prefix, axis.index(), direction.label())
            }
            ButtonSource::KeyboardKey(key) => format!("{}-KB{}", prefix, key),
            ButtonSource::VirtualButton(index) => format!("{}-VB{}", prefix, index),
        }
    }

    fn device_type(&self) -> PhysicalDeviceType {
        match self.source {
            ButtonSource::GamepadButton(_) | ButtonSource::GamepadAxisDirection(..) => {
                PhysicalDeviceType::Gamepad
            }
            ButtonSource::KeyboardKey(_) => PhysicalDeviceType::KeyboardKey,
            ButtonSource::VirtualButton(_) => PhysicalDeviceType::VirtualController,
        }
    }

    fn physical_input_name(&self) -> String {
        match self.source {
            ButtonSource::GamepadButton(button) => button.display_name(),
            ButtonSource::GamepadAxisDirection(axis, direction) => axis.display_name(Some(direction)),
            ButtonSource::KeyboardKey(key) => format!("Key {}", key),
            ButtonSource::VirtualButton(index) => format!("B{}", index),
        }
    }
}

impl PersistedMapping for ButtonMapping {
    const CATEGORY: &'static str = "ButtonMappings";

    fn save_to_config(&self, store: &mut dyn ConfigStore, prefix: &str) {
        let id = self.id();
        let key = |field: &str| mapping_field_key(prefix, Self::CATEGORY, &id, field);

        store.set_string(&key(CLASS_FIELD), self.class_name());
        store.set_integer(&key("Bitmask"), i64::from(self.bitmask.bits()));
        match self.source {
            ButtonSource::GamepadButton(button) => {
                store.set_integer(&key("SDLControllerButton"), i64::from(button.index()));
            }
            ButtonSource::GamepadAxisDirection(axis, direction) => {
                store.set_integer(&key("SDLControllerAxis"), i64::from(axis.index()));
                store.set_integer(&key("AxisDirection"), i64::from(direction.as_i32()));
            }
            ButtonSource::KeyboardKey(key_code) => {
                store.set_integer(&key("KeyboardScancode"), i64::from(key_code.0));
            }
            ButtonSource::VirtualButton(index) => {
                store.set_integer(&key("VirtualButtonIndex"), i64::from(index));
            }
        }
        save_or_log(store);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::simulated::SimulatedBackend;
    use crate::mobile::VirtualControllerBridge;
    use crate::persistence::TomlConfigStore;
    use crate::physical_device::keyboard::keys;
    use crate::physical_device::{DeviceRegistry, KeyboardState};

    #[test]
    fn test_identity_strings() {
        let m = ButtonMapping::new(0, PadButtons::A, ButtonSource::GamepadButton(GamepadButton::South));
        assert_eq!(m.id(), "P0-B32768-SDLB0");

        let m = ButtonMapping::new(
            1,
            PadButtons::Z,
            ButtonSource::GamepadAxisDirection(GamepadAxis::LeftTrigger, AxisDirection::Positive),
        );
        assert_eq!(m.id(), "P1-B8-SDLA4-ADPOS");

        let m = ButtonMapping::new(0, PadButtons::START, ButtonSource::KeyboardKey(keys::ENTER));
        assert_eq!(m.id(), "P0-B2048-KB40");
        assert_eq!(m.device_type(), PhysicalDeviceType::KeyboardKey);
    }

    #[test]
    fn test_save_writes_class_and_fields() {
        let mut store = TomlConfigStore::in_memory();
        let m = ButtonMapping::new(0, PadButtons::B, ButtonSource::GamepadButton(GamepadButton::West));
        m.save_to_config(&mut store, "Controllers");

        let base = "Controllers.ButtonMappings.P0-B16384-SDLB2";
        assert_eq!(
            store.get_string(&format!("{}.ButtonMappingClass", base)).as_deref(),
            Some(GAMEPAD_BUTTON_CLASS)
        );
        assert_eq!(store.get_integer(&format!("{}.Bitmask", base)), Some(16384));
        assert_eq!(store.get_integer(&format!("{}.SDLControllerButton", base)), Some(2));
        assert_eq!(store.save_count(), 1);

        m.erase_from_config(&mut store, "Controllers");
        assert!(!store.contains_subtree(base));
    }

    #[test]
    fn test_axis_direction_needs_threshold() {
        let mut backend = SimulatedBackend::new();
        let mut registry = DeviceRegistry::new(0);
        let id = backend.connect_gamepad("pad");
        registry.handle_connect(&backend, id);
        let pad = VirtualControllerBridge::new();
        let keyboard = KeyboardState::new();
        let m = ButtonMapping::new(
            0,
            PadButtons::DPAD_LEFT,
            ButtonSource::GamepadAxisDirection(GamepadAxis::LeftX, AxisDirection::Negative),
        );

        backend.set_axis(id, GamepadAxis::LeftX, -20000);
        let ctx = PollContext::new(&backend, &registry, &pad, &keyboard);
        assert!(!m.is_pressed(&ctx));

        backend.set_axis(id, GamepadAxis::LeftX, -30000);
        let ctx = PollContext::new(&backend, &registry, &pad, &keyboard);
        assert!(m.is_pressed(&ctx));
    }

    #[test]
    fn test_other_port_devices_are_ignored() {
        let mut backend = SimulatedBackend::new();
        let mut registry = DeviceRegistry::new(0);
        let id = backend.connect_gamepad("pad");
        registry.handle_connect(&backend, id);
        registry.assign_to_port(id, 2);
        backend.set_button(id, GamepadButton::South, true);
        let pad = VirtualControllerBridge::new();
        let keyboard = KeyboardState::new();
        let ctx = PollContext::new(&backend, &registry, &pad, &keyboard);

        let port0 = ButtonMapping::new(0, PadButtons::A, ButtonSource::GamepadButton(GamepadButton::South));
        let port2 = ButtonMapping::new(2, PadButtons::A, ButtonSource::GamepadButton(GamepadButton::South));
        assert!(!port0.is_pressed(&ctx));
        assert!(port2.is_pressed(&ctx));
    }
}
