//! Control deck
//!
//! Owns the backend, the device registry, the hot-plug bridge, the virtual
//! pad and all [`MAX_CONTROLLERS`] ports. The host drives it once per frame:
//!
//! ```text
//! process_device_events()  ──►  read(&FrameInput)  ──►  [PortState; MAX_CONTROLLERS]
//!   (drain hot-plug queue)        (poll + aggregate + LED push)
//! ```
//!
//! `read` takes `&mut self`, so it can neither be re-entered nor run
//! concurrently with a drain.

use super::buttons::{LogicalAxis, PadButtons, Rgb8, MAX_CONTROLLERS};
use super::port::{ControllerPort, PortState};
use crate::backend::InputBackend;
use crate::config::DeckSettings;
use crate::mapping::{
    AxisMapping, AxisMappingFactory, ButtonMapping, ButtonMappingFactory, LedMapping, LedMappingFactory,
    PollContext, RumbleMapping, RumbleMappingFactory,
};
use crate::mobile::VirtualControllerBridge;
use crate::persistence::ConfigStore;
use crate::physical_device::{DeviceEventBridge, DeviceRegistry, DrainStats, KeyboardState};
use tracing::{debug, info, warn};

/// Per-frame input from the host
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameInput {
    /// Set while a modal UI has focus. Keyboard mappings keep working.
    pub gamepad_input_blocked: bool,
    /// LED colors requested by game logic, per port
    pub led_colors: [Option<Rgb8>; MAX_CONTROLLERS],
}

impl FrameInput {
    pub fn blocked() -> Self {
        Self {
            gamepad_input_blocked: true,
            ..Default::default()
        }
    }

    pub fn with_led(mut self, port: usize, color: Rgb8) -> Self {
        if let Some(slot) = self.led_colors.get_mut(port) {
            *slot = Some(color);
        }
        self
    }
}

pub struct ControlDeck<B: InputBackend> {
    backend: B,
    registry: DeviceRegistry,
    hotplug: DeviceEventBridge,
    ports: [ControllerPort; MAX_CONTROLLERS],
    virtual_pad: VirtualControllerBridge,
    keyboard: KeyboardState,
    prefix: String,
    axis_threshold: f32,
    frames: u64,
}

impl<B: InputBackend> ControlDeck<B> {
    pub fn new(backend: B, settings: &DeckSettings) -> Self {
        info!(
            "Creating control deck: {} ports, default port {}, prefix '{}'",
            MAX_CONTROLLERS, settings.default_port, settings.config_prefix
        );
        Self {
            backend,
            registry: DeviceRegistry::new(settings.default_port),
            hotplug: DeviceEventBridge::new(),
            ports: std::array::from_fn(ControllerPort::new),
            virtual_pad: VirtualControllerBridge::new(),
            keyboard: KeyboardState::new(),
            prefix: settings.config_prefix.clone(),
            axis_threshold: settings.live_input_threshold,
            frames: 0,
        }
    }

    /// Loads every port from `store`. Ports that were never saved get the
    /// defaults (port 0 also gets keyboard defaults), which are saved. A
    /// port the user emptied stays empty.
    pub fn init(&mut self, store: &mut dyn ConfigStore) {
        for port in self.ports.iter_mut() {
            port.load_from_config(store, &self.prefix);
            if !port.is_initialized(store, &self.prefix) {
                port.add_default_mappings(port.index() == 0);
                port.save_to_config(store, &self.prefix);
            } else if store.get_integer(&port.initialized_key(&self.prefix)).is_none() {
                // Written before the marker existed
                port.save_to_config(store, &self.prefix);
            }
        }
        let stats = self.process_device_events();
        info!(
            "Control deck initialized, {} devices connected ({} add-events)",
            self.registry.len(),
            stats.added
        );
    }

    /// Drains queued hot-plug events into the registry. Call once per frame
    /// before [`Self::read`].
    pub fn process_device_events(&mut self) -> DrainStats {
        let stats = self.hotplug.process_events(&mut self.backend, &mut self.registry);
        if stats.added > 0 {
            // New devices have not seen the current LED color yet
            for port in self.ports.iter_mut() {
                port.invalidate_led();
            }
        }
        stats
    }

    /// Polls and aggregates every port in index order
    pub fn read(&mut self, input: &FrameInput) -> [PortState; MAX_CONTROLLERS] {
        let ports = &mut self.ports;
        let ctx = PollContext::new(&self.backend, &self.registry, &self.virtual_pad, &self.keyboard)
            .with_input_blocked(input.gamepad_input_blocked)
            .with_axis_threshold(self.axis_threshold);

        let mut states = [PortState::default(); MAX_CONTROLLERS];
        for (state, port) in states.iter_mut().zip(ports.iter_mut()) {
            *state = port.update(&ctx, input.led_colors[port.index()]);
        }

        for port in self.ports.iter_mut() {
            port.push_led(&mut self.backend, &self.registry);
        }

        self.frames += 1;
        if self.frames % 600 == 0 {
            debug!("Control deck read {} frames", self.frames);
        }
        states
    }

    /// Context for live-input rebinding and custom polling
    pub fn poll_context(&self) -> PollContext<'_> {
        PollContext::new(&self.backend, &self.registry, &self.virtual_pad, &self.keyboard)
            .with_axis_threshold(self.axis_threshold)
    }

    pub fn create_button_mapping_from_live_input(&self, port: usize, bitmask: PadButtons) -> Option<ButtonMapping> {
        ButtonMappingFactory::create_from_live_input(&self.poll_context(), port, bitmask)
            .or_else(|| ButtonMappingFactory::create_from_keyboard(&self.keyboard, port, bitmask))
    }

    pub fn create_axis_mapping_from_live_input(&self, port: usize, target: LogicalAxis) -> Option<AxisMapping> {
        AxisMappingFactory::create_from_live_input(&self.poll_context(), port, target)
    }

    pub fn create_led_mapping_from_live_input(&self, port: usize) -> Option<LedMapping> {
        LedMappingFactory::create_from_live_input(&self.poll_context(), port)
    }

    pub fn create_rumble_mapping_from_live_input(&self, port: usize) -> Option<RumbleMapping> {
        RumbleMappingFactory::create_from_live_input(&self.poll_context(), port)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut DeviceRegistry {
        &mut self.registry
    }

    pub fn port(&self, index: usize) -> Option<&ControllerPort> {
        self.ports.get(index)
    }

    pub fn port_mut(&mut self, index: usize) -> Option<&mut ControllerPort> {
        self.ports.get_mut(index)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn keyboard_mut(&mut self) -> &mut KeyboardState {
        &mut self.keyboard
    }

    pub fn virtual_controller(&self) -> &VirtualControllerBridge {
        &self.virtual_pad
    }

    /// For state that does not touch the backend, e.g. camera input
    pub fn virtual_controller_mut(&mut self) -> &mut VirtualControllerBridge {
        &mut self.virtual_pad
    }

    pub fn attach_virtual_controller(&mut self) -> bool {
        self.virtual_pad
            .attach_controller(&mut self.backend, &mut self.registry)
    }

    pub fn detach_virtual_controller(&mut self) {
        self.virtual_pad
            .detach_controller(&mut self.backend, &mut self.registry);
    }

    pub fn set_virtual_button(&mut self, index: i32, pressed: bool) {
        self.virtual_pad.set_button(&mut self.backend, index, pressed);
    }

    pub fn set_virtual_axis(&mut self, index: i32, value: i16) {
        self.virtual_pad.set_axis(&mut self.backend, index, value);
    }

    pub fn start_rumble(&mut self, port: usize) {
        match self.ports.get(port) {
            Some(p) => p.start_rumble(&mut self.backend, &self.registry),
            None => warn!("Rumble requested for invalid port {}", port),
        }
    }

    pub fn stop_rumble(&mut self, port: usize) {
        match self.ports.get(port) {
            Some(p) => p.stop_rumble(&mut self.backend, &self.registry),
            None => warn!("Rumble stop requested for invalid port {}", port),
        }
    }

    /// Removes every mapping of `port` from the port and from `store`.
    /// Returns false for an invalid port.
    pub fn clear_port_mappings(&mut self, port: usize, store: &mut dyn ConfigStore) -> bool {
        match self.ports.get_mut(port) {
            Some(p) => {
                p.clear_all_mappings(store, &self.prefix);
                info!("Port {} mappings cleared", port);
                true
            }
            None => {
                warn!("Clear requested for invalid port {}", port);
                false
            }
        }
    }

    /// Persists every port
    pub fn save(&self, store: &mut dyn ConfigStore) {
        for port in &self.ports {
            port.save_to_config(store, &self.prefix);
        }
    }

    pub fn shutdown(&mut self) {
        for port in 0..MAX_CONTROLLERS {
            self.stop_rumble(port);
        }
        if self.virtual_pad.is_attached() {
            self.detach_virtual_controller();
        }
        let (added, removed) = self.hotplug.totals();
        info!(
            "Control deck shut down after {} frames ({} device adds, {} removes)",
            self.frames, added, removed
        );
    }
}
