//! Once-per-frame drain of device add/remove events into the registry

use super::registry::DeviceRegistry;
use crate::backend::{EventKind, InputBackend, PlatformEvent};
use tracing::{debug, warn};

const DEVICE_EVENTS: [EventKind; 2] = [EventKind::DeviceAdded, EventKind::DeviceRemoved];

/// Counts of what one drain did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainStats {
    pub added: usize,
    pub removed: usize,
}

#[derive(Debug, Default)]
pub struct DeviceEventBridge {
    total_added: u64,
    total_removed: u64,
}

impl DeviceEventBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forwards every queued add/remove event, oldest first.
    /// Other event kinds stay queued.
    pub fn process_events(
        &mut self,
        backend: &mut dyn InputBackend,
        registry: &mut DeviceRegistry,
    ) -> DrainStats {
        backend.pump();

        let mut stats = DrainStats::default();
        while let Some(event) = backend.pop_event(&DEVICE_EVENTS) {
            match event {
                PlatformEvent::DeviceAdded {
                    instance_id,
                    timestamp,
                } => {
                    debug!(
                        "Device added event: {} at {}",
                        instance_id,
                        timestamp.format("%H:%M:%S.%3f")
                    );
                    if registry.handle_connect(&*backend, instance_id) {
                        stats.added += 1;
                    }
                }
                PlatformEvent::DeviceRemoved {
                    instance_id,
                    timestamp,
                } => {
                    debug!(
                        "Device removed event: {} at {}",
                        instance_id,
                        timestamp.format("%H:%M:%S.%3f")
                    );
                    if registry.handle_disconnect(instance_id) {
                        stats.removed += 1;
                    }
                }
                PlatformEvent::Other { description } => {
                    warn!("Backend returned unrequested event: {}", description);
                }
            }
        }

        self.total_added += stats.added as u64;
        self.total_removed += stats.removed as u64;
        stats
    }

    pub fn totals(&self) -> (u64, u64) {
        (self.total_added, self.total_removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::simulated::SimulatedBackend;

    #[test]
    fn test_add_then_remove_in_same_frame_leaves_device_absent() {
        let mut backend = SimulatedBackend::new();
        let mut registry = DeviceRegistry::new(0);
        let mut bridge = DeviceEventBridge::new();

        let id = backend.connect_gamepad("flaky");
        backend.push_event(PlatformEvent::removed(id));

        let stats = bridge.process_events(&mut backend, &mut registry);
        assert_eq!(stats, DrainStats { added: 1, removed: 1 });
        assert!(!registry.is_connected(id));
    }

    #[test]
    fn test_remove_then_add_in_same_frame_leaves_device_present() {
        let mut backend = SimulatedBackend::new();
        let mut registry = DeviceRegistry::new(0);
        let mut bridge = DeviceEventBridge::new();

        let id = backend.connect_gamepad("pad");
        bridge.process_events(&mut backend, &mut registry);

        backend.push_event(PlatformEvent::removed(id));
        backend.push_event(PlatformEvent::added(id));
        bridge.process_events(&mut backend, &mut registry);

        assert!(registry.is_connected(id));
        assert_eq!(bridge.totals(), (2, 1));
    }

    #[test]
    fn test_other_events_are_left_queued() {
        let mut backend = SimulatedBackend::new();
        let mut registry = DeviceRegistry::new(0);
        let mut bridge = DeviceEventBridge::new();

        backend.push_event(PlatformEvent::Other {
            description: "key down".into(),
        });
        backend.connect_gamepad("pad");
        bridge.process_events(&mut backend, &mut registry);

        assert_eq!(backend.queued_events(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_events_injected_from_detection_thread() {
        let mut backend = SimulatedBackend::new();
        let mut registry = DeviceRegistry::new(0);
        let mut bridge = DeviceEventBridge::new();
        let id = backend.connect_gamepad("pad");
        // Drop the synchronous add-event, deliver it from another thread instead
        backend.pop_event(&DEVICE_EVENTS);

        let sender = backend.hotplug_sender();
        std::thread::spawn(move || sender.send(PlatformEvent::added(id)))
            .join()
            .unwrap();

        bridge.process_events(&mut backend, &mut registry);
        assert!(registry.is_connected(id));
    }
}
