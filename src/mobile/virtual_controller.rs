//! Virtual controller lifecycle and write/read paths
//!
//! The pad is a statum typestate: only an `Attached` pad owns a backend
//! device and can write to it. [`VirtualControllerBridge`] wraps both states
//! behind the flat attach/detach/set/get boundary the platform UI calls.

use super::shadow_cache::{ShadowStateCache, MAX_VIRTUAL_AXES, MAX_VIRTUAL_BUTTONS};
use crate::backend::{InputBackend, InstanceId, VirtualDeviceDescriptor};
use crate::physical_device::registry::DeviceRegistry;
use statum::{machine, state};
use tracing::{debug, error, info, warn};

/// Tells the backend which raw indices carry which standard inputs.
/// Button order matches [`crate::controller::buttons::GamepadButton::joystick_index`].
pub const VIRTUAL_CONTROLLER_MAPPING: &str = "00000000000000000000746f75636870,Touch Controller,\
a:b0,b:b1,x:b2,y:b3,back:b4,guide:b5,start:b6,leftstick:b7,rightstick:b8,\
leftshoulder:b9,rightshoulder:b10,dpup:b11,dpdown:b12,dpleft:b13,dpright:b14,\
leftx:a0,lefty:a1,rightx:a2,righty:a3,lefttrigger:a4,righttrigger:a5,";

const VIRTUAL_CONTROLLER_NAME: &str = "Touch Controller";

/// Raw buttons 0..=14 carry standard gamepad buttons
const STANDARD_BUTTON_MASK: u32 = (1 << 15) - 1;

#[state]
#[derive(Debug, Clone)]
pub enum PadState {
    Detached,
    Attached,
}

#[machine]
#[derive(Debug)]
pub struct VirtualPad<S: PadState> {
    instance_id: Option<InstanceId>,
    cache: ShadowStateCache,
}

impl<S: PadState> VirtualPad<S> {
    pub fn cache(&self) -> &ShadowStateCache {
        &self.cache
    }
}

impl VirtualPad<Detached> {
    pub fn create() -> Self {
        Self::new(None, ShadowStateCache::default())
    }

    /// Creates and opens the backend device, registers its mapping string and
    /// re-enumerates the registry. On failure the detached pad is returned.
    pub fn attach(
        mut self,
        backend: &mut dyn InputBackend,
        registry: &mut DeviceRegistry,
    ) -> Result<VirtualPad<Attached>, Self> {
        let descriptor = VirtualDeviceDescriptor {
            name: VIRTUAL_CONTROLLER_NAME.to_string(),
            axis_count: MAX_VIRTUAL_AXES,
            button_count: MAX_VIRTUAL_BUTTONS,
            button_mask: STANDARD_BUTTON_MASK,
        };

        let Some(instance_id) = backend.attach_virtual(&descriptor) else {
            error!("Could not create overlay virtual controller");
            return Err(self);
        };

        // Without the mapping the device is visible but reads as idle
        if !backend.add_mapping(VIRTUAL_CONTROLLER_MAPPING) {
            warn!("Backend rejected virtual controller mapping string");
        }

        // Virtual devices do not reliably produce an add-event
        registry.refresh_connected_devices(&*backend);

        info!("Virtual controller attached as device {}", instance_id);
        self.instance_id = Some(instance_id);
        self.cache.clear();
        Ok(self.transition())
    }
}

impl VirtualPad<Attached> {
    pub fn instance_id(&self) -> Option<InstanceId> {
        self.instance_id
    }

    pub fn detach(
        mut self,
        backend: &mut dyn InputBackend,
        registry: &mut DeviceRegistry,
    ) -> VirtualPad<Detached> {
        if let Some(instance_id) = self.instance_id.take() {
            if !backend.detach_virtual(instance_id) {
                warn!("Backend failed to detach virtual device {}", instance_id);
            }
            registry.handle_disconnect(instance_id);
        }
        self.cache.clear();
        info!("Virtual controller detached");
        self.transition()
    }

    /// Cache first, then the best-effort backend write
    pub fn write_button(&mut self, backend: &mut dyn InputBackend, index: i32, pressed: bool) {
        if !self.cache.set_button(index, pressed) {
            debug!("Ignoring virtual button {} out of range", index);
            return;
        }
        if let Some(instance_id) = self.instance_id {
            if !backend.set_virtual_button(instance_id, index as usize, pressed) {
                debug!("Backend virtual button write {} failed", index);
            }
        }
    }

    /// Cache first, then the best-effort backend write
    pub fn write_axis(&mut self, backend: &mut dyn InputBackend, index: i32, value: i16) {
        if !self.cache.set_axis(index, value) {
            debug!("Ignoring virtual axis {} out of range", index);
            return;
        }
        if let Some(instance_id) = self.instance_id {
            if !backend.set_virtual_axis(instance_id, index as usize, value) {
                debug!("Backend virtual axis write {} failed", index);
            }
        }
    }
}

#[derive(Debug)]
enum PadSlot {
    Detached(VirtualPad<Detached>),
    Attached(VirtualPad<Attached>),
}

/// Flat boundary between platform UI code and the virtual pad
#[derive(Debug)]
pub struct VirtualControllerBridge {
    slot: PadSlot,
    camera_yaw: f32,
    camera_pitch: f32,
}

impl Default for VirtualControllerBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualControllerBridge {
    pub fn new() -> Self {
        Self {
            slot: PadSlot::Detached(VirtualPad::create()),
            camera_yaw: 0.0,
            camera_pitch: 0.0,
        }
    }

    pub fn is_attached(&self) -> bool {
        matches!(self.slot, PadSlot::Attached(_))
    }

    /// Whether touchscreen controls currently feed input
    pub fn is_using_touchscreen_controls(&self) -> bool {
        self.is_attached()
    }

    pub fn instance_id(&self) -> Option<InstanceId> {
        match &self.slot {
            PadSlot::Attached(pad) => pad.instance_id(),
            PadSlot::Detached(_) => None,
        }
    }

    pub fn attach_controller(
        &mut self,
        backend: &mut dyn InputBackend,
        registry: &mut DeviceRegistry,
    ) -> bool {
        let slot = std::mem::replace(&mut self.slot, PadSlot::Detached(VirtualPad::create()));
        match slot {
            PadSlot::Attached(pad) => {
                debug!("Virtual controller already attached");
                self.slot = PadSlot::Attached(pad);
                true
            }
            PadSlot::Detached(pad) => match pad.attach(backend, registry) {
                Ok(attached) => {
                    self.slot = PadSlot::Attached(attached);
                    true
                }
                Err(detached) => {
                    self.slot = PadSlot::Detached(detached);
                    false
                }
            },
        }
    }

    pub fn detach_controller(
        &mut self,
        backend: &mut dyn InputBackend,
        registry: &mut DeviceRegistry,
    ) {
        let slot = std::mem::replace(&mut self.slot, PadSlot::Detached(VirtualPad::create()));
        self.slot = match slot {
            PadSlot::Attached(pad) => PadSlot::Detached(pad.detach(backend, registry)),
            detached => detached,
        };
    }

    /// A negative `index` addresses axis `-index`, deflected to full positive
    /// scale when pressed and full negative scale when released.
    pub fn set_button(&mut self, backend: &mut dyn InputBackend, index: i32, pressed: bool) {
        let PadSlot::Attached(pad) = &mut self.slot else {
            debug!("Virtual button {} set while detached", index);
            return;
        };
        if index < 0 {
            let Some(axis) = index.checked_neg() else {
                return;
            };
            let value = if pressed { i16::MAX } else { i16::MIN };
            pad.write_axis(backend, axis, value);
        } else {
            pad.write_button(backend, index, pressed);
        }
    }

    pub fn set_axis(&mut self, backend: &mut dyn InputBackend, index: i32, value: i16) {
        let PadSlot::Attached(pad) = &mut self.slot else {
            debug!("Virtual axis {} set while detached", index);
            return;
        };
        pad.write_axis(backend, index, value);
    }

    /// Reads the cache only, never the backend
    pub fn button_state(&self, index: i32) -> bool {
        self.cache().button(index)
    }

    /// Reads the cache only, never the backend
    pub fn axis_state(&self, index: i32) -> i16 {
        self.cache().axis(index)
    }

    /// Axis 0 is yaw, axis 1 is pitch
    pub fn set_camera_state(&mut self, axis: i32, value: f32) {
        match axis {
            0 => self.camera_yaw = value,
            1 => self.camera_pitch = value,
            _ => warn!("Invalid camera axis: {}", axis),
        }
    }

    pub fn camera_yaw(&self) -> f32 {
        self.camera_yaw
    }

    pub fn camera_pitch(&self) -> f32 {
        self.camera_pitch
    }

    fn cache(&self) -> &ShadowStateCache {
        match &self.slot {
            PadSlot::Attached(pad) => pad.cache(),
            PadSlot::Detached(pad) => pad.cache(),
        }
    }
}
