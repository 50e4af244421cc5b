//! In-process backend with scripted devices
//!
//! Used by the test-suite and by the binary's `--simulated` mode. Device
//! state is set directly; hot-plug events can additionally be injected from
//! any thread through a [`HotplugSender`], mirroring platforms that detect
//! devices on a background thread.
//!
//! `stale_virtual_reads` reproduces the mobile defect: a virtual device read
//! right after a write still returns the pre-write value.

use super::{
    DeviceCapabilities, EventKind, InputBackend, InstanceId, PlatformEvent,
    VirtualDeviceDescriptor,
};
use crate::controller::buttons::{GamepadAxis, GamepadButton, Rgb8};
use std::collections::{BTreeMap, VecDeque};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Thread-safe handle for queueing events into a [`SimulatedBackend`]
#[derive(Clone, Debug)]
pub struct HotplugSender {
    tx: mpsc::UnboundedSender<PlatformEvent>,
}

impl HotplugSender {
    pub fn send(&self, event: PlatformEvent) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(e) => {
                warn!("Simulated backend dropped event: {}", e);
                false
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
struct SimulatedDevice {
    caps: DeviceCapabilities,
    buttons: BTreeMap<GamepadButton, bool>,
    joystick_buttons: BTreeMap<usize, bool>,
    axes: BTreeMap<GamepadAxis, i16>,
    /// Values visible to readers of a virtual device
    visible_raw_buttons: BTreeMap<usize, bool>,
    visible_raw_axes: BTreeMap<usize, i16>,
    /// Values written but not yet observed by readers
    pending_raw_buttons: BTreeMap<usize, bool>,
    pending_raw_axes: BTreeMap<usize, i16>,
    led: Option<Rgb8>,
    rumble: (u16, u16),
}

#[derive(Debug)]
pub struct SimulatedBackend {
    devices: BTreeMap<InstanceId, SimulatedDevice>,
    queue: VecDeque<PlatformEvent>,
    injected: mpsc::UnboundedReceiver<PlatformEvent>,
    injector: mpsc::UnboundedSender<PlatformEvent>,
    next_instance_id: InstanceId,
    mappings: Vec<String>,
    stale_virtual_reads: bool,
    led_writes: usize,
    fail_virtual_attach: bool,
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBackend {
    pub fn new() -> Self {
        let (injector, injected) = mpsc::unbounded_channel();
        Self {
            devices: BTreeMap::new(),
            queue: VecDeque::new(),
            injected,
            injector,
            next_instance_id: 1,
            mappings: Vec::new(),
            stale_virtual_reads: true,
            led_writes: 0,
            fail_virtual_attach: false,
        }
    }

    pub fn hotplug_sender(&self) -> HotplugSender {
        HotplugSender {
            tx: self.injector.clone(),
        }
    }

    /// Adds a standard gamepad and queues its add-event
    pub fn connect_gamepad(&mut self, name: &str) -> InstanceId {
        let caps = DeviceCapabilities {
            name: name.to_string(),
            button_count: GamepadButton::ALL.len(),
            axis_count: GamepadAxis::ALL.len(),
            ..Default::default()
        };
        self.connect_with_capabilities(caps)
    }

    pub fn connect_with_capabilities(&mut self, caps: DeviceCapabilities) -> InstanceId {
        let id = self.next_instance_id;
        self.next_instance_id += 1;
        self.connect_with_id(id, caps);
        id
    }

    /// Adds a device under a caller-chosen id, allowing id reuse after removal
    pub fn connect_with_id(&mut self, instance_id: InstanceId, caps: DeviceCapabilities) {
        debug!("Simulated device {} connected: {}", instance_id, caps.name);
        self.devices.insert(
            instance_id,
            SimulatedDevice {
                caps,
                ..Default::default()
            },
        );
        self.next_instance_id = self.next_instance_id.max(instance_id + 1);
        self.queue.push_back(PlatformEvent::added(instance_id));
    }

    /// Removes a device and queues its remove-event
    pub fn disconnect(&mut self, instance_id: InstanceId) {
        if self.devices.remove(&instance_id).is_some() {
            debug!("Simulated device {} disconnected", instance_id);
            self.queue.push_back(PlatformEvent::removed(instance_id));
        }
    }

    pub fn push_event(&mut self, event: PlatformEvent) {
        self.queue.push_back(event);
    }

    pub fn queued_events(&self) -> usize {
        self.queue.len()
    }

    pub fn set_button(&mut self, instance_id: InstanceId, button: GamepadButton, pressed: bool) {
        if let Some(device) = self.devices.get_mut(&instance_id) {
            device.buttons.insert(button, pressed);
        }
    }

    pub fn set_joystick_button(&mut self, instance_id: InstanceId, index: usize, pressed: bool) {
        if let Some(device) = self.devices.get_mut(&instance_id) {
            device.joystick_buttons.insert(index, pressed);
        }
    }

    pub fn set_axis(&mut self, instance_id: InstanceId, axis: GamepadAxis, value: i16) {
        if let Some(device) = self.devices.get_mut(&instance_id) {
            device.axes.insert(axis, value);
        }
    }

    pub fn led(&self, instance_id: InstanceId) -> Option<Rgb8> {
        self.devices.get(&instance_id).and_then(|d| d.led)
    }

    pub fn led_writes(&self) -> usize {
        self.led_writes
    }

    pub fn rumble(&self, instance_id: InstanceId) -> (u16, u16) {
        self.devices
            .get(&instance_id)
            .map(|d| d.rumble)
            .unwrap_or_default()
    }

    pub fn mappings(&self) -> &[String] {
        &self.mappings
    }

    /// When disabled, virtual writes become visible immediately
    pub fn set_stale_virtual_reads(&mut self, stale: bool) {
        self.stale_virtual_reads = stale;
    }

    pub fn set_fail_virtual_attach(&mut self, fail: bool) {
        self.fail_virtual_attach = fail;
    }

    /// Makes pending virtual writes visible, as the platform eventually does
    pub fn settle_virtual_state(&mut self) {
        for device in self.devices.values_mut() {
            let buttons = std::mem::take(&mut device.pending_raw_buttons);
            device.visible_raw_buttons.extend(buttons);
            let axes = std::mem::take(&mut device.pending_raw_axes);
            device.visible_raw_axes.extend(axes);
        }
    }

    fn drain_injected(&mut self) {
        while let Ok(event) = self.injected.try_recv() {
            self.queue.push_back(event);
        }
    }
}

impl InputBackend for SimulatedBackend {
    fn pump(&mut self) {
        self.drain_injected();
    }

    fn pop_event(&mut self, kinds: &[EventKind]) -> Option<PlatformEvent> {
        self.drain_injected();
        let position = self.queue.iter().position(|e| kinds.contains(&e.kind()))?;
        self.queue.remove(position)
    }

    fn connected_instances(&self) -> Vec<InstanceId> {
        self.devices.keys().copied().collect()
    }

    fn capabilities(&self, instance_id: InstanceId) -> Option<DeviceCapabilities> {
        self.devices.get(&instance_id).map(|d| d.caps.clone())
    }

    fn button(&self, instance_id: InstanceId, button: GamepadButton) -> bool {
        let Some(device) = self.devices.get(&instance_id) else {
            return false;
        };
        if device.caps.is_virtual {
            // The mapping layer never sees virtual writes
            return false;
        }
        device.buttons.get(&button).copied().unwrap_or(false)
    }

    fn joystick_button(&self, instance_id: InstanceId, index: usize) -> bool {
        let Some(device) = self.devices.get(&instance_id) else {
            return false;
        };
        if device.caps.is_virtual {
            return device.visible_raw_buttons.get(&index).copied().unwrap_or(false);
        }
        device.joystick_buttons.get(&index).copied().unwrap_or(false)
    }

    fn axis(&self, instance_id: InstanceId, axis: GamepadAxis) -> i16 {
        let Some(device) = self.devices.get(&instance_id) else {
            return 0;
        };
        if device.caps.is_virtual {
            return device
                .visible_raw_axes
                .get(&(axis.index() as usize))
                .copied()
                .unwrap_or(0);
        }
        device.axes.get(&axis).copied().unwrap_or(0)
    }

    fn set_led(&mut self, instance_id: InstanceId, color: Rgb8) -> bool {
        match self.devices.get_mut(&instance_id) {
            Some(device) if device.caps.has_led() => {
                device.led = Some(color);
                self.led_writes += 1;
                true
            }
            _ => false,
        }
    }

    fn set_rumble(&mut self, instance_id: InstanceId, low: u16, high: u16) -> bool {
        match self.devices.get_mut(&instance_id) {
            Some(device) if device.caps.has_rumble => {
                device.rumble = (low, high);
                true
            }
            _ => false,
        }
    }

    fn attach_virtual(&mut self, descriptor: &VirtualDeviceDescriptor) -> Option<InstanceId> {
        if self.fail_virtual_attach {
            return None;
        }
        let caps = DeviceCapabilities {
            name: descriptor.name.clone(),
            button_count: descriptor.button_count,
            axis_count: descriptor.axis_count,
            is_virtual: true,
            ..Default::default()
        };
        // Virtual devices do not produce an add-event here
        let id = self.next_instance_id;
        self.next_instance_id += 1;
        self.devices.insert(
            id,
            SimulatedDevice {
                caps,
                ..Default::default()
            },
        );
        Some(id)
    }

    fn detach_virtual(&mut self, instance_id: InstanceId) -> bool {
        match self.devices.get(&instance_id) {
            Some(device) if device.caps.is_virtual => {
                self.devices.remove(&instance_id);
                true
            }
            _ => false,
        }
    }

    fn add_mapping(&mut self, mapping: &str) -> bool {
        self.mappings.push(mapping.to_string());
        true
    }

    fn set_virtual_button(&mut self, instance_id: InstanceId, index: usize, pressed: bool) -> bool {
        let stale = self.stale_virtual_reads;
        match self.devices.get_mut(&instance_id) {
            Some(device) if device.caps.is_virtual && index < device.caps.button_count => {
                if stale {
                    device.pending_raw_buttons.insert(index, pressed);
                } else {
                    device.visible_raw_buttons.insert(index, pressed);
                }
                true
            }
            _ => false,
        }
    }

    fn set_virtual_axis(&mut self, instance_id: InstanceId, index: usize, value: i16) -> bool {
        let stale = self.stale_virtual_reads;
        match self.devices.get_mut(&instance_id) {
            Some(device) if device.caps.is_virtual && index < device.caps.axis_count => {
                if stale {
                    device.pending_raw_axes.insert(index, value);
                } else {
                    device.visible_raw_axes.insert(index, value);
                }
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_event_filters_without_reordering() {
        let mut backend = SimulatedBackend::new();
        backend.push_event(PlatformEvent::Other {
            description: "window resized".into(),
        });
        let a = backend.connect_gamepad("pad a");
        backend.disconnect(a);
        let kinds = [EventKind::DeviceAdded, EventKind::DeviceRemoved];

        assert_eq!(backend.pop_event(&kinds).map(|e| e.kind()), Some(EventKind::DeviceAdded));
        assert_eq!(backend.pop_event(&kinds).map(|e| e.kind()), Some(EventKind::DeviceRemoved));
        assert!(backend.pop_event(&kinds).is_none());
        assert_eq!(backend.queued_events(), 1);
    }

    #[test]
    fn test_hotplug_sender_from_other_thread() {
        let mut backend = SimulatedBackend::new();
        let sender = backend.hotplug_sender();
        std::thread::spawn(move || {
            sender.send(PlatformEvent::added(42));
        })
        .join()
        .unwrap();

        let event = backend.pop_event(&[EventKind::DeviceAdded]);
        assert!(matches!(event, Some(PlatformEvent::DeviceAdded { instance_id: 42, .. })));
    }

    #[test]
    fn test_virtual_writes_are_stale_until_settled() {
        let mut backend = SimulatedBackend::new();
        let descriptor = VirtualDeviceDescriptor {
            name: "touch".into(),
            axis_count: 6,
            button_count: 18,
            button_mask: 0,
        };
        let id = backend.attach_virtual(&descriptor).unwrap();

        assert!(backend.set_virtual_button(id, 3, true));
        assert!(!backend.joystick_button(id, 3));
        backend.settle_virtual_state();
        assert!(backend.joystick_button(id, 3));
    }

    #[test]
    fn test_unknown_device_reads_neutral() {
        let backend = SimulatedBackend::new();
        assert!(!backend.button(99, GamepadButton::South));
        assert_eq!(backend.axis(99, GamepadAxis::LeftX), 0);
        assert!(backend.capabilities(99).is_none());
    }
}
