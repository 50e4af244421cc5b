//! Desktop backend built on gilrs
//!
//! gilrs performs device detection on its own thread; state and hot-plug
//! notifications reach us through `next_event`, which [`GilrsBackend::pump`]
//! drains into a local queue. Connected/Disconnected become device events,
//! everything else is kept as [`PlatformEvent::Other`] for other consumers.
//!
//! Rumble runs as one looping force-feedback effect per device. Replacing
//! or dropping the effect stops the motors.
//!
//! gilrs exposes no raw joystick button index, so `joystick_button` keeps
//! the trait default and only the mapping layer is queried.

use super::{BackendError, DeviceCapabilities, EventKind, InputBackend, InstanceId, PlatformEvent};
use crate::controller::buttons::{GamepadAxis, GamepadButton, AXIS_FULL_SCALE};
use ::gilrs::ff::{BaseEffect, BaseEffectType, Effect, EffectBuilder, Envelope, Repeat, Replay, Ticks};
use ::gilrs::{Axis, Button, Event, EventType, GamepadId, Gilrs};
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, error, info, warn};

/// Bound on unconsumed non-device events
const MAX_OTHER_EVENTS: usize = 256;

/// Length of one rumble period; the effect repeats until replaced
const RUMBLE_PERIOD_MS: u32 = 1000;

pub struct GilrsBackend {
    gilrs: Gilrs,
    ids: BTreeMap<InstanceId, GamepadId>,
    queue: VecDeque<PlatformEvent>,
    rumble: BTreeMap<InstanceId, Effect>,
}

impl GilrsBackend {
    pub fn new() -> Result<Self, BackendError> {
        info!("Initializing gilrs controller interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Successfully initialized gilrs");
                g
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(BackendError::InitializationError(e.to_string()));
            }
        };

        let mut backend = Self {
            gilrs,
            ids: BTreeMap::new(),
            queue: VecDeque::new(),
            rumble: BTreeMap::new(),
        };

        // Devices present at startup never produce a Connected event
        let present: Vec<GamepadId> = backend.gilrs.gamepads().map(|(id, _)| id).collect();
        for id in present {
            let instance_id = to_instance_id(id);
            backend.ids.insert(instance_id, id);
            backend.queue.push_back(PlatformEvent::added(instance_id));
        }
        info!("Found {} gamepads at startup", backend.ids.len());

        Ok(backend)
    }

    fn gamepad_id(&self, instance_id: InstanceId) -> Option<GamepadId> {
        self.ids.get(&instance_id).copied()
    }

    fn push_other(&mut self, description: String) {
        if self.queue.iter().filter(|e| e.kind() == EventKind::Other).count() >= MAX_OTHER_EVENTS {
            if let Some(position) = self.queue.iter().position(|e| e.kind() == EventKind::Other) {
                self.queue.remove(position);
            }
        }
        self.queue.push_back(PlatformEvent::Other { description });
    }

    fn supports_rumble(&self, instance_id: InstanceId) -> bool {
        self.gamepad_id(instance_id)
            .and_then(|id| self.gilrs.connected_gamepad(id))
            .is_some_and(|gamepad| gamepad.is_ff_supported())
    }
}

impl InputBackend for GilrsBackend {
    fn pump(&mut self) {
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            let instance_id = to_instance_id(id);
            match event {
                EventType::Connected => {
                    info!("Controller connected event detected: {}", instance_id);
                    self.ids.insert(instance_id, id);
                    self.queue.push_back(PlatformEvent::added(instance_id));
                }
                EventType::Disconnected => {
                    warn!("Controller disconnected event detected: {}", instance_id);
                    self.ids.remove(&instance_id);
                    self.rumble.remove(&instance_id);
                    self.queue.push_back(PlatformEvent::removed(instance_id));
                }
                other => {
                    debug!("Queued gilrs event for other consumers: {:?}", other);
                    self.push_other(format!("{:?}", other));
                }
            }
        }
    }

    fn pop_event(&mut self, kinds: &[EventKind]) -> Option<PlatformEvent> {
        let position = self.queue.iter().position(|e| kinds.contains(&e.kind()))?;
        self.queue.remove(position)
    }

    fn connected_instances(&self) -> Vec<InstanceId> {
        self.ids
            .iter()
            .filter(|(_, id)| self.gilrs.connected_gamepad(**id).is_some())
            .map(|(instance_id, _)| *instance_id)
            .collect()
    }

    fn capabilities(&self, instance_id: InstanceId) -> Option<DeviceCapabilities> {
        let gamepad = self.gilrs.connected_gamepad(self.gamepad_id(instance_id)?)?;
        Some(DeviceCapabilities {
            name: gamepad.name().to_string(),
            button_count: GamepadButton::ALL.len(),
            axis_count: GamepadAxis::ALL.len(),
            has_rgb_led: false,
            has_mono_led: false,
            has_rumble: gamepad.is_ff_supported(),
            is_virtual: false,
        })
    }

    fn button(&self, instance_id: InstanceId, button: GamepadButton) -> bool {
        let Some(gamepad) = self
            .gamepad_id(instance_id)
            .and_then(|id| self.gilrs.connected_gamepad(id))
        else {
            return false;
        };
        map_button(button).is_some_and(|b| gamepad.is_pressed(b))
    }

    fn axis(&self, instance_id: InstanceId, axis: GamepadAxis) -> i16 {
        let Some(gamepad) = self
            .gamepad_id(instance_id)
            .and_then(|id| self.gilrs.connected_gamepad(id))
        else {
            return 0;
        };
        let value = match axis {
            // gilrs reports y-up as positive, console pads use y-down
            GamepadAxis::LeftX => gamepad.value(Axis::LeftStickX),
            GamepadAxis::LeftY => -gamepad.value(Axis::LeftStickY),
            GamepadAxis::RightX => gamepad.value(Axis::RightStickX),
            GamepadAxis::RightY => -gamepad.value(Axis::RightStickY),
            GamepadAxis::LeftTrigger => gamepad
                .button_data(Button::LeftTrigger2)
                .map(|d| d.value())
                .unwrap_or_else(|| gamepad.value(Axis::LeftZ)),
            GamepadAxis::RightTrigger => gamepad
                .button_data(Button::RightTrigger2)
                .map(|d| d.value())
                .unwrap_or_else(|| gamepad.value(Axis::RightZ)),
        };
        (value.clamp(-1.0, 1.0) * AXIS_FULL_SCALE) as i16
    }

    fn set_rumble(&mut self, instance_id: InstanceId, low: u16, high: u16) -> bool {
        if !self.supports_rumble(instance_id) {
            return false;
        }
        let Some(id) = self.gamepad_id(instance_id) else {
            return false;
        };

        // Dropping the running effect stops it
        self.rumble.remove(&instance_id);
        let effects = rumble_effects(low, high);
        if effects.is_empty() {
            debug!("Rumble stopped on device {}", instance_id);
            return true;
        }

        let mut builder = EffectBuilder::new();
        for effect in effects {
            builder.add_effect(effect);
        }
        let effect = match builder
            .gamepads(&[id])
            .repeat(Repeat::Infinitely)
            .finish(&mut self.gilrs)
        {
            Ok(effect) => effect,
            Err(e) => {
                warn!("Failed to build rumble effect for device {}: {}", instance_id, e);
                return false;
            }
        };
        if let Err(e) = effect.play() {
            warn!("Failed to start rumble on device {}: {}", instance_id, e);
            return false;
        }

        debug!("Rumble on device {}: low={} high={}", instance_id, low, high);
        self.rumble.insert(instance_id, effect);
        true
    }
}

/// Strong drives the low-frequency motor, Weak the high-frequency one.
/// A motor at zero gets no effect; both at zero means stop.
fn rumble_effects(low: u16, high: u16) -> Vec<BaseEffect> {
    [
        (low, BaseEffectType::Strong { magnitude: low }),
        (high, BaseEffectType::Weak { magnitude: high }),
    ]
    .into_iter()
    .filter(|(magnitude, _)| *magnitude > 0)
    .map(|(_, kind)| BaseEffect {
        kind,
        scheduling: Replay {
            play_for: Ticks::from_ms(RUMBLE_PERIOD_MS),
            ..Default::default()
        },
        envelope: Envelope::default(),
    })
    .collect()
}

fn to_instance_id(id: GamepadId) -> InstanceId {
    usize::from(id) as InstanceId
}

// Helper function to map our GamepadButton to gilrs Button
fn map_button(button: GamepadButton) -> Option<Button> {
    match button {
        GamepadButton::South => Some(Button::South),
        GamepadButton::East => Some(Button::East),
        GamepadButton::West => Some(Button::West),
        GamepadButton::North => Some(Button::North),
        GamepadButton::Back => Some(Button::Select),
        GamepadButton::Guide => Some(Button::Mode),
        GamepadButton::Start => Some(Button::Start),
        GamepadButton::LeftStick => Some(Button::LeftThumb),
        GamepadButton::RightStick => Some(Button::RightThumb),
        GamepadButton::LeftShoulder => Some(Button::LeftTrigger),
        GamepadButton::RightShoulder => Some(Button::RightTrigger),
        GamepadButton::DPadUp => Some(Button::DPadUp),
        GamepadButton::DPadDown => Some(Button::DPadDown),
        GamepadButton::DPadLeft => Some(Button::DPadLeft),
        GamepadButton::DPadRight => Some(Button::DPadRight),
        _ => None,
    }
}
