//! Controller port
//!
//! One logical controller slot. A port owns ordered mapping lists per target
//! and folds them into a [`PortState`] once per frame:
//!
//! 1. buttons: every mapping is polled and ORs its bit in
//! 2. axes: every mapping writes its slot when deflected
//! 3. LED: the last mapping with an opinion stages the color command
//!
//! The staged LED color is pushed to the port's LED-capable devices only
//! when it differs from the last color sent.

use crate::backend::InputBackend;
use crate::controller::buttons::{AxisDirection, GamepadAxis, GamepadButton, LogicalAxis, PadButtons, Rgb8};
use crate::mapping::{
    AxisMapping, AxisMappingFactory, AxisSource, ButtonMapping, ButtonMappingFactory, ButtonSource,
    InputMapping, LedColorSource, LedMapping, LedMappingFactory, PersistedMapping, PollContext,
    RumbleMapping, RumbleMappingFactory,
};
use crate::mapping::rumble::DEFAULT_INTENSITY_PERCENT;
use crate::persistence::{mapping_key, save_or_log, ConfigStore};
use crate::physical_device::keyboard::keys;
use crate::physical_device::{DeviceRegistry, Scancode};
use serde::Serialize;
use tracing::{debug, info};

/// Aggregated state of one port for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PortState {
    pub buttons: PadButtons,
    pub axes: [i16; LogicalAxis::COUNT],
    /// Last LED command; `None` until something set a color
    pub led: Option<Rgb8>,
}

impl PortState {
    pub fn axis(&self, axis: LogicalAxis) -> i16 {
        self.axes[axis.slot()]
    }
}

const DEFAULT_GAMEPAD_BUTTONS: [(PadButtons, GamepadButton); 14] = [
    (PadButtons::A, GamepadButton::South),
    (PadButtons::B, GamepadButton::East),
    (PadButtons::X, GamepadButton::West),
    (PadButtons::Y, GamepadButton::North),
    (PadButtons::START, GamepadButton::Start),
    (PadButtons::SELECT, GamepadButton::Back),
    (PadButtons::DPAD_UP, GamepadButton::DPadUp),
    (PadButtons::DPAD_DOWN, GamepadButton::DPadDown),
    (PadButtons::DPAD_LEFT, GamepadButton::DPadLeft),
    (PadButtons::DPAD_RIGHT, GamepadButton::DPadRight),
    (PadButtons::L, GamepadButton::LeftShoulder),
    (PadButtons::R, GamepadButton::RightShoulder),
    (PadButtons::L_STICK, GamepadButton::LeftStick),
    (PadButtons::R_STICK, GamepadButton::RightStick),
];

const DEFAULT_GAMEPAD_AXES: [(LogicalAxis, GamepadAxis); 4] = [
    (LogicalAxis::StickX, GamepadAxis::LeftX),
    (LogicalAxis::StickY, GamepadAxis::LeftY),
    (LogicalAxis::RightStickX, GamepadAxis::RightX),
    (LogicalAxis::RightStickY, GamepadAxis::RightY),
];

const DEFAULT_KEYBOARD_BUTTONS: [(PadButtons, Scancode); 11] = [
    (PadButtons::A, keys::X),
    (PadButtons::B, keys::C),
    (PadButtons::X, keys::V),
    (PadButtons::START, keys::ENTER),
    (PadButtons::SELECT, keys::BACKSPACE),
    (PadButtons::DPAD_UP, keys::UP),
    (PadButtons::DPAD_DOWN, keys::DOWN),
    (PadButtons::DPAD_LEFT, keys::LEFT),
    (PadButtons::DPAD_RIGHT, keys::RIGHT),
    (PadButtons::L, keys::Q),
    (PadButtons::R, keys::E),
];

#[derive(Debug)]
pub struct ControllerPort {
    index: usize,
    button_mappings: Vec<ButtonMapping>,
    axis_mappings: Vec<AxisMapping>,
    led_mappings: Vec<LedMapping>,
    rumble_mappings: Vec<RumbleMapping>,
    state: PortState,
    /// Last color actually sent to the backend
    sent_led: Option<Rgb8>,
}

impl ControllerPort {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            button_mappings: Vec::new(),
            axis_mappings: Vec::new(),
            led_mappings: Vec::new(),
            rumble_mappings: Vec::new(),
            state: PortState::default(),
            sent_led: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// State produced by the last [`Self::update`]
    pub fn state(&self) -> PortState {
        self.state
    }

    pub fn button_mappings(&self) -> &[ButtonMapping] {
        &self.button_mappings
    }

    pub fn axis_mappings(&self) -> &[AxisMapping] {
        &self.axis_mappings
    }

    pub fn led_mappings(&self) -> &[LedMapping] {
        &self.led_mappings
    }

    pub fn rumble_mappings(&self) -> &[RumbleMapping] {
        &self.rumble_mappings
    }

    pub fn has_mappings(&self) -> bool {
        !(self.button_mappings.is_empty()
            && self.axis_mappings.is_empty()
            && self.led_mappings.is_empty()
            && self.rumble_mappings.is_empty())
    }

    /// Polls every mapping and returns the aggregated state.
    ///
    /// Every mapping is polled every frame, even after a bit is already set.
    pub fn update(&mut self, ctx: &PollContext<'_>, game_led: Option<Rgb8>) -> PortState {
        let mut buttons = PadButtons::empty();
        for mapping in &self.button_mappings {
            mapping.update_pad(ctx, &mut buttons);
        }

        let mut axes = [0; LogicalAxis::COUNT];
        for mapping in &self.axis_mappings {
            mapping.update_axes(ctx, &mut axes);
        }

        let mut led = self.state.led;
        for mapping in &self.led_mappings {
            if let Some(color) = mapping.color(game_led) {
                led = Some(color);
            }
        }

        self.state = PortState { buttons, axes, led };
        self.state
    }

    /// Sends the staged LED color if it changed since the last send.
    /// Returns the number of devices written.
    pub fn push_led(&mut self, backend: &mut dyn InputBackend, registry: &DeviceRegistry) -> usize {
        let Some(color) = self.state.led else {
            return 0;
        };
        if self.sent_led == Some(color) {
            return 0;
        }

        let mut written = 0;
        for device in registry
            .devices_for_port(self.index)
            .filter(|d| d.capabilities.has_led())
        {
            if backend.set_led(device.instance_id, color) {
                written += 1;
            } else {
                debug!("LED write to device {} failed", device.instance_id);
            }
        }
        debug!("Port {} LED set to {} on {} devices", self.index, color, written);
        self.sent_led = Some(color);
        written
    }

    /// Forgets the last sent color so the next frame resends it, e.g. after
    /// a new device joined the port
    pub fn invalidate_led(&mut self) {
        self.sent_led = None;
    }

    /// Starts rumble on every rumble-capable device of the port
    pub fn start_rumble(&self, backend: &mut dyn InputBackend, registry: &DeviceRegistry) {
        for mapping in &self.rumble_mappings {
            let (low, high) = mapping.motor_intensities();
            self.rumble_devices(backend, registry, low, high);
        }
    }

    pub fn stop_rumble(&self, backend: &mut dyn InputBackend, registry: &DeviceRegistry) {
        self.rumble_devices(backend, registry, 0, 0);
    }

    fn rumble_devices(&self, backend: &mut dyn InputBackend, registry: &DeviceRegistry, low: u16, high: u16) {
        for device in registry
            .devices_for_port(self.index)
            .filter(|d| d.capabilities.has_rumble)
        {
            if !backend.set_rumble(device.instance_id, low, high) {
                debug!("Rumble write to device {} failed", device.instance_id);
            }
        }
    }

    /// Adds a mapping, replacing one with the same identity
    pub fn add_button_mapping(&mut self, mapping: ButtonMapping) {
        upsert(&mut self.button_mappings, mapping);
    }

    pub fn add_axis_mapping(&mut self, mapping: AxisMapping) {
        upsert(&mut self.axis_mappings, mapping);
    }

    pub fn add_led_mapping(&mut self, mapping: LedMapping) {
        upsert(&mut self.led_mappings, mapping);
    }

    pub fn add_rumble_mapping(&mut self, mapping: RumbleMapping) {
        upsert(&mut self.rumble_mappings, mapping);
    }

    /// Removes a mapping and erases it from `store`, then rewrites the id list
    pub fn remove_button_mapping(&mut self, id: &str, store: &mut dyn ConfigStore, prefix: &str) -> bool {
        let removed = remove_by_id(&mut self.button_mappings, id, store, prefix);
        if removed {
            self.save_id_list::<ButtonMapping>(store, prefix);
        }
        removed
    }

    pub fn remove_axis_mapping(&mut self, id: &str, store: &mut dyn ConfigStore, prefix: &str) -> bool {
        let removed = remove_by_id(&mut self.axis_mappings, id, store, prefix);
        if removed {
            self.save_id_list::<AxisMapping>(store, prefix);
        }
        removed
    }

    pub fn remove_led_mapping(&mut self, id: &str, store: &mut dyn ConfigStore, prefix: &str) -> bool {
        let removed = remove_by_id(&mut self.led_mappings, id, store, prefix);
        if removed {
            self.save_id_list::<LedMapping>(store, prefix);
        }
        removed
    }

    pub fn remove_rumble_mapping(&mut self, id: &str, store: &mut dyn ConfigStore, prefix: &str) -> bool {
        let removed = remove_by_id(&mut self.rumble_mappings, id, store, prefix);
        if removed {
            self.save_id_list::<RumbleMapping>(store, prefix);
        }
        removed
    }

    /// Removes every mapping from the port and from `store`
    pub fn clear_all_mappings(&mut self, store: &mut dyn ConfigStore, prefix: &str) {
        for m in self.button_mappings.drain(..) {
            m.erase_from_config(store, prefix);
        }
        for m in self.axis_mappings.drain(..) {
            m.erase_from_config(store, prefix);
        }
        for m in self.led_mappings.drain(..) {
            m.erase_from_config(store, prefix);
        }
        for m in self.rumble_mappings.drain(..) {
            m.erase_from_config(store, prefix);
        }
        self.save_id_lists(store, prefix);
    }

    /// `<prefix>.Port<N>.<Category>Ids`, N is 1-based
    pub fn id_list_key(&self, prefix: &str, category: &str) -> String {
        format!("{}.Port{}.{}Ids", prefix, self.index + 1, category)
    }

    /// `<prefix>.Port<N>.Initialized`, set once the port was first saved
    pub fn initialized_key(&self, prefix: &str) -> String {
        format!("{}.Port{}.Initialized", prefix, self.index + 1)
    }

    /// Whether this port was saved before, even if it has no mappings now.
    /// Stores written without the marker count as initialized when they
    /// hold any mapping for the port.
    pub fn is_initialized(&self, store: &dyn ConfigStore, prefix: &str) -> bool {
        store.get_integer(&self.initialized_key(prefix)).is_some_and(|v| v != 0) || self.has_mappings()
    }

    /// Replaces the mapping lists with what `store` holds for this port.
    /// Entries that fail to load are dropped from the list. Ids whose
    /// subtree was cleared while loading are also dropped from the stored
    /// id list.
    pub fn load_from_config(&mut self, store: &mut dyn ConfigStore, prefix: &str) {
        let port = self.index;

        let ids = self.read_id_list(store, prefix, ButtonMapping::CATEGORY);
        self.button_mappings = ids
            .iter()
            .filter_map(|id| ButtonMappingFactory::create_from_config(store, prefix, port, id))
            .collect();
        self.prune_id_list(store, prefix, ButtonMapping::CATEGORY, &ids);

        let ids = self.read_id_list(store, prefix, AxisMapping::CATEGORY);
        self.axis_mappings = ids
            .iter()
            .filter_map(|id| AxisMappingFactory::create_from_config(store, prefix, port, id))
            .collect();
        self.prune_id_list(store, prefix, AxisMapping::CATEGORY, &ids);

        let ids = self.read_id_list(store, prefix, LedMapping::CATEGORY);
        self.led_mappings = ids
            .iter()
            .filter_map(|id| LedMappingFactory::create_from_config(store, prefix, port, id))
            .collect();
        self.prune_id_list(store, prefix, LedMapping::CATEGORY, &ids);

        let ids = self.read_id_list(store, prefix, RumbleMapping::CATEGORY);
        self.rumble_mappings = ids
            .iter()
            .filter_map(|id| RumbleMappingFactory::create_from_config(store, prefix, port, id))
            .collect();
        self.prune_id_list(store, prefix, RumbleMapping::CATEGORY, &ids);

        info!(
            "Port {} loaded {} button, {} axis, {} LED and {} rumble mappings",
            port,
            self.button_mappings.len(),
            self.axis_mappings.len(),
            self.led_mappings.len(),
            self.rumble_mappings.len()
        );
    }

    /// Persists every mapping, the id lists and the initialized marker
    pub fn save_to_config(&self, store: &mut dyn ConfigStore, prefix: &str) {
        store.set_integer(&self.initialized_key(prefix), 1);
        for m in &self.button_mappings {
            m.save_to_config(store, prefix);
        }
        for m in &self.axis_mappings {
            m.save_to_config(store, prefix);
        }
        for m in &self.led_mappings {
            m.save_to_config(store, prefix);
        }
        for m in &self.rumble_mappings {
            m.save_to_config(store, prefix);
        }
        self.save_id_lists(store, prefix);
    }

    /// Populates gamepad defaults, plus keyboard defaults if requested
    pub fn add_default_mappings(&mut self, include_keyboard: bool) {
        let port = self.index;
        for (bitmask, button) in DEFAULT_GAMEPAD_BUTTONS {
            self.add_button_mapping(ButtonMapping::new(port, bitmask, ButtonSource::GamepadButton(button)));
        }
        self.add_button_mapping(ButtonMapping::new(
            port,
            PadButtons::Z,
            ButtonSource::GamepadAxisDirection(GamepadAxis::LeftTrigger, AxisDirection::Positive),
        ));
        for (target, axis) in DEFAULT_GAMEPAD_AXES {
            self.add_axis_mapping(AxisMapping::new(port, target, AxisSource::GamepadAxis(axis)));
        }
        self.add_led_mapping(LedMapping::new(port, LedColorSource::Game, Rgb8::BLACK));
        self.add_rumble_mapping(RumbleMapping::new(
            port,
            DEFAULT_INTENSITY_PERCENT,
            DEFAULT_INTENSITY_PERCENT,
        ));

        if include_keyboard {
            for (bitmask, key) in DEFAULT_KEYBOARD_BUTTONS {
                self.add_button_mapping(ButtonMapping::new(port, bitmask, ButtonSource::KeyboardKey(key)));
            }
            self.add_button_mapping(ButtonMapping::new(port, PadButtons::Z, ButtonSource::KeyboardKey(keys::Z)));
            self.add_axis_mapping(AxisMapping::new(
                port,
                LogicalAxis::StickX,
                AxisSource::KeyboardKeys {
                    negative: keys::A,
                    positive: keys::D,
                },
            ));
            self.add_axis_mapping(AxisMapping::new(
                port,
                LogicalAxis::StickY,
                AxisSource::KeyboardKeys {
                    negative: keys::W,
                    positive: keys::S,
                },
            ));
        }
        info!("Port {} populated with default mappings", port);
    }

    fn read_id_list(&self, store: &dyn ConfigStore, prefix: &str, category: &str) -> Vec<String> {
        store
            .get_string(&self.id_list_key(prefix, category))
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Rewrites the id list without ids that have no subtree left.
    /// Entries with an unknown class keep their subtree and stay listed.
    fn prune_id_list(&self, store: &mut dyn ConfigStore, prefix: &str, category: &str, ids: &[String]) {
        let kept: Vec<&str> = ids
            .iter()
            .map(String::as_str)
            .filter(|id| store.contains_subtree(&mapping_key(prefix, category, id)))
            .collect();
        if kept.len() == ids.len() {
            return;
        }

        info!(
            "Port {} dropping {} stale {} ids",
            self.index,
            ids.len() - kept.len(),
            category
        );
        let key = self.id_list_key(prefix, category);
        if kept.is_empty() {
            store.clear(&key);
        } else {
            store.set_string(&key, &kept.join(","));
        }
        save_or_log(store);
    }

    fn save_id_list<M: PersistedMapping>(&self, store: &mut dyn ConfigStore, prefix: &str)
    where
        Self: MappingList<M>,
    {
        let ids: Vec<String> = <Self as MappingList<M>>::list(self)
            .iter()
            .map(InputMapping::id)
            .collect();
        let key = self.id_list_key(prefix, M::CATEGORY);
        if ids.is_empty() {
            store.clear(&key);
        } else {
            store.set_string(&key, &ids.join(","));
        }
        save_or_log(store);
    }

    fn save_id_lists(&self, store: &mut dyn ConfigStore, prefix: &str) {
        self.save_id_list::<ButtonMapping>(store, prefix);
        self.save_id_list::<AxisMapping>(store, prefix);
        self.save_id_list::<LedMapping>(store, prefix);
        self.save_id_list::<RumbleMapping>(store, prefix);
    }
}

/// Access to the port's list for one mapping type
trait MappingList<M> {
    fn list(&self) -> &[M];
}

impl MappingList<ButtonMapping> for ControllerPort {
    fn list(&self) -> &[ButtonMapping] {
        &self.button_mappings
    }
}

impl MappingList<AxisMapping> for ControllerPort {
    fn list(&self) -> &[AxisMapping] {
        &self.axis_mappings
    }
}

impl MappingList<LedMapping> for ControllerPort {
    fn list(&self) -> &[LedMapping] {
        &self.led_mappings
    }
}

impl MappingList<RumbleMapping> for ControllerPort {
    fn list(&self) -> &[RumbleMapping] {
        &self.rumble_mappings
    }
}

fn upsert<M: InputMapping>(list: &mut Vec<M>, mapping: M) {
    let id = mapping.id();
    match list.iter_mut().find(|m| m.id() == id) {
        Some(existing) => *existing = mapping,
        None => list.push(mapping),
    }
}

fn remove_by_id<M: PersistedMapping>(
    list: &mut Vec<M>,
    id: &str,
    store: &mut dyn ConfigStore,
    prefix: &str,
) -> bool {
    match list.iter().position(|m| m.id() == id) {
        Some(position) => {
            let mapping = list.remove(position);
            mapping.erase_from_config(store, prefix);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::simulated::SimulatedBackend;
    use crate::backend::DeviceCapabilities;
    use crate::mobile::VirtualControllerBridge;
    use crate::persistence::TomlConfigStore;
    use crate::physical_device::KeyboardState;

    const PREFIX: &str = "Controllers";

    #[test]
    fn test_or_across_mappings_for_same_bit() {
        let mut backend = SimulatedBackend::new();
        let mut registry = DeviceRegistry::new(0);
        let first = backend.connect_gamepad("first");
        let second = backend.connect_gamepad("second");
        registry.handle_connect(&backend, first);
        registry.handle_connect(&backend, second);
        let pad = VirtualControllerBridge::new();
        let keyboard = KeyboardState::new();

        let mut port = ControllerPort::new(0);
        port.add_button_mapping(ButtonMapping::new(0, PadButtons::A, ButtonSource::GamepadButton(GamepadButton::South)));
        port.add_button_mapping(ButtonMapping::new(0, PadButtons::A, ButtonSource::GamepadButton(GamepadButton::East)));

        for (south, east) in [(false, false), (true, false), (false, true), (true, true)] {
            backend.set_button(second, GamepadButton::South, south);
            backend.set_button(first, GamepadButton::East, east);
            let ctx = PollContext::new(&backend, &registry, &pad, &keyboard);
            let state = port.update(&ctx, None);
            assert_eq!(state.buttons.contains(PadButtons::A), south || east);
        }
    }

    #[test]
    fn test_led_is_sent_only_on_change() {
        let mut backend = SimulatedBackend::new();
        let mut registry = DeviceRegistry::new(0);
        let id = backend.connect_with_capabilities(DeviceCapabilities {
            has_rgb_led: true,
            ..Default::default()
        });
        registry.handle_connect(&backend, id);
        let pad = VirtualControllerBridge::new();
        let keyboard = KeyboardState::new();

        let mut port = ControllerPort::new(0);
        port.add_led_mapping(LedMapping::new(0, LedColorSource::Game, Rgb8::BLACK));

        let red = Rgb8::new(255, 0, 0);
        for _ in 0..3 {
            let ctx = PollContext::new(&backend, &registry, &pad, &keyboard);
            port.update(&ctx, Some(red));
            port.push_led(&mut backend, &registry);
        }
        assert_eq!(backend.led_writes(), 1);
        assert_eq!(backend.led(id), Some(red));

        // No game color this frame keeps the previous command
        let ctx = PollContext::new(&backend, &registry, &pad, &keyboard);
        assert_eq!(port.update(&ctx, None).led, Some(red));
        assert_eq!(port.push_led(&mut backend, &registry), 0);
    }

    #[test]
    fn test_save_and_load_restores_lists() {
        let mut store = TomlConfigStore::in_memory();
        let mut port = ControllerPort::new(1);
        port.add_default_mappings(false);
        port.save_to_config(&mut store, PREFIX);

        let ids = store.get_string("Controllers.Port2.ButtonMappingsIds").unwrap();
        assert!(ids.starts_with("P1-B32768-SDLB0,"));

        let mut reloaded = ControllerPort::new(1);
        reloaded.load_from_config(&mut store, PREFIX);
        assert_eq!(reloaded.button_mappings(), port.button_mappings());
        assert_eq!(reloaded.axis_mappings(), port.axis_mappings());
        assert_eq!(reloaded.led_mappings(), port.led_mappings());
        assert_eq!(reloaded.rumble_mappings(), port.rumble_mappings());
    }

    #[test]
    fn test_remove_erases_and_updates_id_list() {
        let mut store = TomlConfigStore::in_memory();
        let mut port = ControllerPort::new(0);
        let a = ButtonMapping::new(0, PadButtons::A, ButtonSource::GamepadButton(GamepadButton::South));
        let b = ButtonMapping::new(0, PadButtons::B, ButtonSource::GamepadButton(GamepadButton::East));
        port.add_button_mapping(a.clone());
        port.add_button_mapping(b.clone());
        port.save_to_config(&mut store, PREFIX);

        assert!(port.remove_button_mapping(&a.id(), &mut store, PREFIX));
        assert!(!port.remove_button_mapping(&a.id(), &mut store, PREFIX));

        assert!(!store.contains_subtree(&format!("Controllers.ButtonMappings.{}", a.id())));
        assert_eq!(
            store.get_string("Controllers.Port1.ButtonMappingsIds").as_deref(),
            Some(b.id().as_str())
        );
    }

    #[test]
    fn test_add_replaces_same_identity() {
        let mut port = ControllerPort::new(0);
        port.add_axis_mapping(AxisMapping::new(0, LogicalAxis::StickX, AxisSource::GamepadAxis(GamepadAxis::LeftX)));
        port.add_axis_mapping(
            AxisMapping::new(0, LogicalAxis::StickX, AxisSource::GamepadAxis(GamepadAxis::LeftX)).with_response(0.2, 1.0),
        );
        assert_eq!(port.axis_mappings().len(), 1);
        assert_eq!(port.axis_mappings()[0].deadzone(), 0.2);
    }

    #[test]
    fn test_rumble_reaches_capable_devices_only() {
        let mut backend = SimulatedBackend::new();
        let mut registry = DeviceRegistry::new(0);
        let plain = backend.connect_gamepad("plain");
        let motor = backend.connect_with_capabilities(DeviceCapabilities {
            has_rumble: true,
            ..Default::default()
        });
        registry.handle_connect(&backend, plain);
        registry.handle_connect(&backend, motor);

        let mut port = ControllerPort::new(0);
        port.add_rumble_mapping(RumbleMapping::new(0, 100, 50));
        port.start_rumble(&mut backend, &registry);
        assert_eq!(backend.rumble(motor), (u16::MAX, 32767));
        assert_eq!(backend.rumble(plain), (0, 0));

        port.stop_rumble(&mut backend, &registry);
        assert_eq!(backend.rumble(motor), (0, 0));
    }

    #[test]
    fn test_healed_mapping_leaves_id_list() {
        let mut store = TomlConfigStore::in_memory();
        let mut port = ControllerPort::new(0);
        let a = ButtonMapping::new(0, PadButtons::A, ButtonSource::GamepadButton(GamepadButton::South));
        let b = ButtonMapping::new(0, PadButtons::B, ButtonSource::GamepadButton(GamepadButton::East));
        port.add_button_mapping(a.clone());
        port.add_button_mapping(b.clone());
        port.save_to_config(&mut store, PREFIX);
        store.set_integer(&format!("Controllers.ButtonMappings.{}.SDLControllerButton", b.id()), 99);

        let mut reloaded = ControllerPort::new(0);
        reloaded.load_from_config(&mut store, PREFIX);
        assert_eq!(reloaded.button_mappings(), &[a.clone()]);
        assert_eq!(
            store.get_string("Controllers.Port1.ButtonMappingsIds").as_deref(),
            Some(a.id().as_str())
        );

        // Nothing left to heal on the next start
        let saves = store.save_count();
        ControllerPort::new(0).load_from_config(&mut store, PREFIX);
        assert_eq!(store.save_count(), saves);
    }

    #[test]
    fn test_unknown_class_stays_listed() {
        let mut store = TomlConfigStore::in_memory();
        store.set_string("Controllers.Port1.ButtonMappingsIds", "P0-B1-FUTURE");
        store.set_string("Controllers.ButtonMappings.P0-B1-FUTURE.ButtonMappingClass", "FutureMapping");

        let mut port = ControllerPort::new(0);
        port.load_from_config(&mut store, PREFIX);
        assert!(port.button_mappings().is_empty());
        assert_eq!(
            store.get_string("Controllers.Port1.ButtonMappingsIds").as_deref(),
            Some("P0-B1-FUTURE")
        );
    }

    #[test]
    fn test_cleared_port_stays_initialized() {
        let mut store = TomlConfigStore::in_memory();
        let mut port = ControllerPort::new(2);
        assert!(!port.is_initialized(&store, PREFIX));

        port.add_default_mappings(false);
        port.save_to_config(&mut store, PREFIX);
        port.clear_all_mappings(&mut store, PREFIX);
        assert!(!port.has_mappings());
        assert!(port.is_initialized(&store, PREFIX));
        assert!(store.get_string("Controllers.Port3.ButtonMappingsIds").is_none());
    }
}
