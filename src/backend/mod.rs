//! Platform input backend boundary
//!
//! Everything the deck needs from the operating system goes through
//! [`InputBackend`]: device enumeration, per-device button/axis queries,
//! LED and rumble actuation, virtual device management and an event queue
//! that can be drained selectively by [`EventKind`].
//!
//! Two implementations ship with the crate:
//!
//! 1. [`gilrs::GilrsBackend`] - desktop gamepads through gilrs
//! 2. [`simulated::SimulatedBackend`] - deterministic in-process devices
//!
//! Queries are infallible by design: an unknown instance id reads as
//! released/centered. Writes report success as `bool` and callers decide
//! whether to log.

pub mod gilrs;
pub mod simulated;

use crate::controller::buttons::{GamepadAxis, GamepadButton, Rgb8};
use chrono::{DateTime, Local};

/// Backend-assigned device id. Not stable across replug.
pub type InstanceId = u32;

/// Static capabilities read from the backend when a device connects
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeviceCapabilities {
    pub name: String,
    pub button_count: usize,
    pub axis_count: usize,
    pub has_rgb_led: bool,
    pub has_mono_led: bool,
    pub has_rumble: bool,
    pub is_virtual: bool,
}

impl DeviceCapabilities {
    pub fn has_led(&self) -> bool {
        self.has_rgb_led || self.has_mono_led
    }
}

/// Description used to create a virtual device
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualDeviceDescriptor {
    pub name: String,
    pub axis_count: usize,
    pub button_count: usize,
    /// Bit `n` set means raw button `n` carries a standard gamepad button
    pub button_mask: u32,
}

/// Kinds of events a backend can queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    DeviceAdded,
    DeviceRemoved,
    Other,
}

/// Queued backend event
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformEvent {
    DeviceAdded {
        instance_id: InstanceId,
        timestamp: DateTime<Local>,
    },
    DeviceRemoved {
        instance_id: InstanceId,
        timestamp: DateTime<Local>,
    },
    /// Any event this subsystem does not consume
    Other { description: String },
}

impl PlatformEvent {
    pub fn added(instance_id: InstanceId) -> Self {
        Self::DeviceAdded {
            instance_id,
            timestamp: Local::now(),
        }
    }

    pub fn removed(instance_id: InstanceId) -> Self {
        Self::DeviceRemoved {
            instance_id,
            timestamp: Local::now(),
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::DeviceAdded { .. } => EventKind::DeviceAdded,
            Self::DeviceRemoved { .. } => EventKind::DeviceRemoved,
            Self::Other { .. } => EventKind::Other,
        }
    }
}

/// Errors raised while bringing up a backend
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Failed to initialize input backend: {0}")]
    InitializationError(String),

    #[error("Backend not available on this platform: {0}")]
    Unsupported(String),
}

/// Platform input backend used by the registry, mappings and the mobile bridge
pub trait InputBackend {
    /// Pulls pending platform state into the backend. Never blocks.
    fn pump(&mut self) {}

    /// Removes and returns the oldest queued event whose kind is in `kinds`.
    /// Events of other kinds stay queued in their original order.
    fn pop_event(&mut self, kinds: &[EventKind]) -> Option<PlatformEvent>;

    /// Instance ids of every device currently present, ascending
    fn connected_instances(&self) -> Vec<InstanceId>;

    fn capabilities(&self, instance_id: InstanceId) -> Option<DeviceCapabilities>;

    /// Standard button state through the backend's gamepad mapping layer
    fn button(&self, instance_id: InstanceId, button: GamepadButton) -> bool;

    /// Raw joystick button state, bypassing the mapping layer.
    ///
    /// Optional: backends without raw joystick access keep this default and
    /// the mapping layer is the only source of button state.
    fn joystick_button(&self, _instance_id: InstanceId, _index: usize) -> bool {
        false
    }

    /// Axis value in the signed 16-bit range
    fn axis(&self, instance_id: InstanceId, axis: GamepadAxis) -> i16;

    fn set_led(&mut self, _instance_id: InstanceId, _color: Rgb8) -> bool {
        false
    }

    /// Intensities are 0..=u16::MAX; zero on both stops rumble
    fn set_rumble(&mut self, _instance_id: InstanceId, _low: u16, _high: u16) -> bool {
        false
    }

    fn attach_virtual(&mut self, _descriptor: &VirtualDeviceDescriptor) -> Option<InstanceId> {
        None
    }

    fn detach_virtual(&mut self, _instance_id: InstanceId) -> bool {
        false
    }

    /// Registers a `guid,name,bindings` mapping string with the mapping layer
    fn add_mapping(&mut self, _mapping: &str) -> bool {
        false
    }

    fn set_virtual_button(&mut self, _instance_id: InstanceId, _index: usize, _pressed: bool) -> bool {
        false
    }

    fn set_virtual_axis(&mut self, _instance_id: InstanceId, _index: usize, _value: i16) -> bool {
        false
    }
}

/// Lets a deck own a backend chosen at runtime, e.g. behind the C boundary
impl<B: InputBackend + ?Sized> InputBackend for Box<B> {
    fn pump(&mut self) {
        (**self).pump()
    }

    fn pop_event(&mut self, kinds: &[EventKind]) -> Option<PlatformEvent> {
        (**self).pop_event(kinds)
    }

    fn connected_instances(&self) -> Vec<InstanceId> {
        (**self).connected_instances()
    }

    fn capabilities(&self, instance_id: InstanceId) -> Option<DeviceCapabilities> {
        (**self).capabilities(instance_id)
    }

    fn button(&self, instance_id: InstanceId, button: GamepadButton) -> bool {
        (**self).button(instance_id, button)
    }

    fn joystick_button(&self, instance_id: InstanceId, index: usize) -> bool {
        (**self).joystick_button(instance_id, index)
    }

    fn axis(&self, instance_id: InstanceId, axis: GamepadAxis) -> i16 {
        (**self).axis(instance_id, axis)
    }

    fn set_led(&mut self, instance_id: InstanceId, color: Rgb8) -> bool {
        (**self).set_led(instance_id, color)
    }

    fn set_rumble(&mut self, instance_id: InstanceId, low: u16, high: u16) -> bool {
        (**self).set_rumble(instance_id, low, high)
    }

    fn attach_virtual(&mut self, descriptor: &VirtualDeviceDescriptor) -> Option<InstanceId> {
        (**self).attach_virtual(descriptor)
    }

    fn detach_virtual(&mut self, instance_id: InstanceId) -> bool {
        (**self).detach_virtual(instance_id)
    }

    fn add_mapping(&mut self, mapping: &str) -> bool {
        (**self).add_mapping(mapping)
    }

    fn set_virtual_button(&mut self, instance_id: InstanceId, index: usize, pressed: bool) -> bool {
        (**self).set_virtual_button(instance_id, index, pressed)
    }

    fn set_virtual_axis(&mut self, instance_id: InstanceId, index: usize, value: i16) -> bool {
        (**self).set_virtual_axis(instance_id, index, value)
    }
}
