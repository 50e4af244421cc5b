//! Connected physical device registry
//!
//! Tracks every device the backend reported as added, keyed by instance id,
//! together with the logical port it is assigned to. Per-port iteration is
//! ordered by instance id and allocation-free, so mappings can call it every
//! frame.
//!
//! Instance ids may be reused after a replug. Each entry therefore carries a
//! connection serial that grows on every connect; anything that must tell
//! two connections apart compares serials, not ids.

use crate::backend::{DeviceCapabilities, InputBackend, InstanceId};
use crate::controller::buttons::MAX_CONTROLLERS;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectedDevice {
    pub instance_id: InstanceId,
    pub port: usize,
    pub capabilities: DeviceCapabilities,
    pub connection_serial: u64,
}

#[derive(Debug)]
pub struct DeviceRegistry {
    devices: BTreeMap<InstanceId, ConnectedDevice>,
    default_port: usize,
    next_serial: u64,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeviceRegistry {
    pub fn new(default_port: usize) -> Self {
        let default_port = if default_port < MAX_CONTROLLERS {
            default_port
        } else {
            warn!(
                "Default port {} out of range, using port 0",
                default_port
            );
            0
        };
        Self {
            devices: BTreeMap::new(),
            default_port,
            next_serial: 1,
        }
    }

    /// Handles an add-event. Returns false if the device was already
    /// connected or the backend no longer knows it.
    pub fn handle_connect(&mut self, backend: &dyn InputBackend, instance_id: InstanceId) -> bool {
        if self.devices.contains_key(&instance_id) {
            debug!("Device {} already connected, ignoring add-event", instance_id);
            return false;
        }

        let Some(capabilities) = backend.capabilities(instance_id) else {
            warn!("Add-event for device {} which the backend cannot open", instance_id);
            return false;
        };

        let serial = self.next_serial;
        self.next_serial += 1;
        info!(
            "Device connected: id={} name='{}' buttons={} axes={} led={} rumble={} virtual={} -> port {}",
            instance_id,
            capabilities.name,
            capabilities.button_count,
            capabilities.axis_count,
            capabilities.has_led(),
            capabilities.has_rumble,
            capabilities.is_virtual,
            self.default_port
        );
        self.devices.insert(
            instance_id,
            ConnectedDevice {
                instance_id,
                port: self.default_port,
                capabilities,
                connection_serial: serial,
            },
        );
        true
    }

    /// Handles a remove-event. Unknown ids are ignored.
    pub fn handle_disconnect(&mut self, instance_id: InstanceId) -> bool {
        match self.devices.remove(&instance_id) {
            Some(device) => {
                info!(
                    "Device disconnected: id={} name='{}' (port {})",
                    instance_id, device.capabilities.name, device.port
                );
                true
            }
            None => {
                debug!("Remove-event for unknown device {}", instance_id);
                false
            }
        }
    }

    /// Devices assigned to `port`, ascending by instance id
    pub fn devices_for_port(&self, port: usize) -> impl Iterator<Item = &ConnectedDevice> + '_ {
        self.devices.values().filter(move |d| d.port == port)
    }

    pub fn get(&self, instance_id: InstanceId) -> Option<&ConnectedDevice> {
        self.devices.get(&instance_id)
    }

    pub fn is_connected(&self, instance_id: InstanceId) -> bool {
        self.devices.contains_key(&instance_id)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Moves a device to another port
    pub fn assign_to_port(&mut self, instance_id: InstanceId, port: usize) -> bool {
        if port >= MAX_CONTROLLERS {
            warn!("Refusing to assign device {} to invalid port {}", instance_id, port);
            return false;
        }
        match self.devices.get_mut(&instance_id) {
            Some(device) => {
                info!("Device {} moved from port {} to port {}", instance_id, device.port, port);
                device.port = port;
                true
            }
            None => false,
        }
    }

    /// Re-enumerates the backend from scratch.
    ///
    /// Needed after devices appear outside the event stream (virtual
    /// devices). Devices still present keep their port and serial.
    pub fn refresh_connected_devices(&mut self, backend: &dyn InputBackend) {
        let present = backend.connected_instances();

        let stale: Vec<InstanceId> = self
            .devices
            .keys()
            .filter(|id| !present.contains(id))
            .copied()
            .collect();
        for id in stale {
            self.handle_disconnect(id);
        }

        for id in present {
            if !self.devices.contains_key(&id) {
                self.handle_connect(backend, id);
            }
        }
        info!("Refreshed connected devices: {} present", self.devices.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::simulated::SimulatedBackend;

    #[test]
    fn test_connect_and_disconnect_lifecycle() {
        let mut backend = SimulatedBackend::new();
        let id = backend.connect_gamepad("pad");
        let mut registry = DeviceRegistry::new(0);

        assert!(registry.handle_connect(&backend, id));
        assert!(!registry.handle_connect(&backend, id));
        assert!(registry.is_connected(id));

        assert!(registry.handle_disconnect(id));
        assert!(!registry.handle_disconnect(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_devices_for_port_are_ordered_by_id() {
        let mut backend = SimulatedBackend::new();
        let mut registry = DeviceRegistry::new(0);
        let ids: Vec<_> = (0..3).map(|i| backend.connect_gamepad(&format!("pad {}", i))).collect();
        for id in ids.iter().rev() {
            registry.handle_connect(&backend, *id);
        }
        registry.assign_to_port(ids[1], 1);

        let port0: Vec<_> = registry.devices_for_port(0).map(|d| d.instance_id).collect();
        assert_eq!(port0, vec![ids[0], ids[2]]);
        let port1: Vec<_> = registry.devices_for_port(1).map(|d| d.instance_id).collect();
        assert_eq!(port1, vec![ids[1]]);
    }

    #[test]
    fn test_reused_instance_id_gets_new_serial() {
        let mut backend = SimulatedBackend::new();
        let mut registry = DeviceRegistry::new(0);
        let id = backend.connect_gamepad("first");
        registry.handle_connect(&backend, id);
        let first_serial = registry.get(id).unwrap().connection_serial;

        backend.disconnect(id);
        registry.handle_disconnect(id);
        backend.connect_with_id(id, DeviceCapabilities { name: "second".into(), ..Default::default() });
        registry.handle_connect(&backend, id);

        let device = registry.get(id).unwrap();
        assert_eq!(device.capabilities.name, "second");
        assert!(device.connection_serial > first_serial);
    }

    #[test]
    fn test_refresh_picks_up_silent_devices() {
        let mut backend = SimulatedBackend::new();
        let mut registry = DeviceRegistry::new(0);
        let stale = backend.connect_gamepad("gone");
        registry.handle_connect(&backend, stale);
        backend.disconnect(stale);
        let fresh = backend.connect_gamepad("new");

        registry.refresh_connected_devices(&backend);

        assert!(!registry.is_connected(stale));
        assert!(registry.is_connected(fresh));
    }

    #[test]
    fn test_assign_to_invalid_port_rejected() {
        let mut backend = SimulatedBackend::new();
        let mut registry = DeviceRegistry::new(0);
        let id = backend.connect_gamepad("pad");
        registry.handle_connect(&backend, id);
        assert!(!registry.assign_to_port(id, MAX_CONTROLLERS));
        assert_eq!(registry.get(id).unwrap().port, 0);
    }
}
