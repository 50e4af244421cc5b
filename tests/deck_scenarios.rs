use controldeck::backend::simulated::SimulatedBackend;
use controldeck::backend::{DeviceCapabilities, InputBackend, PlatformEvent};
use controldeck::controller::buttons::{AxisDirection, GamepadAxis, GamepadButton, LogicalAxis, PadButtons, Rgb8};
use controldeck::controller::ControllerPort;
use controldeck::mapping::{
    ButtonMapping, ButtonMappingFactory, ButtonSource, InputMapping, LedMappingFactory, PersistedMapping,
    PollContext,
};
use controldeck::mobile::VirtualControllerBridge;
use controldeck::persistence::{ConfigStore, TomlConfigStore};
use controldeck::physical_device::keyboard::keys;
use controldeck::physical_device::{DeviceEventBridge, DeviceRegistry, KeyboardState};
use controldeck::{ControlDeck, DeckSettings, FrameInput};

const PREFIX: &str = "Controllers";

fn deck() -> (ControlDeck<SimulatedBackend>, TomlConfigStore) {
    let mut store = TomlConfigStore::in_memory();
    let mut deck = ControlDeck::new(SimulatedBackend::new(), &DeckSettings::default());
    deck.init(&mut store);
    (deck, store)
}

#[test]
fn test_or_monotonicity_over_device_subsets() {
    let mut backend = SimulatedBackend::new();
    let mut registry = DeviceRegistry::new(0);
    let pad = VirtualControllerBridge::new();
    let keyboard = KeyboardState::new();
    let mut port = ControllerPort::new(0);
    for button in [GamepadButton::South, GamepadButton::East, GamepadButton::West] {
        port.add_button_mapping(ButtonMapping::new(0, PadButtons::A, ButtonSource::GamepadButton(button)));
    }

    // Each device is absent, connected but idle, or pressing its own button
    let buttons = [GamepadButton::South, GamepadButton::East, GamepadButton::West];
    for combo in 0..27u32 {
        let mut expected = false;
        let mut ids = Vec::new();
        for (slot, button) in buttons.iter().enumerate() {
            let state = (combo / 3u32.pow(slot as u32)) % 3;
            if state == 0 {
                continue;
            }
            let id = backend.connect_gamepad("pad");
            backend.set_button(id, *button, state == 2);
            registry.handle_connect(&backend, id);
            expected |= state == 2;
            ids.push(id);
        }

        let ctx = PollContext::new(&backend, &registry, &pad, &keyboard);
        let state = port.update(&ctx, None);
        assert_eq!(state.buttons.contains(PadButtons::A), expected, "combo {}", combo);

        for id in ids {
            backend.disconnect(id);
            registry.handle_disconnect(id);
        }
    }
}

#[test]
fn test_reloaded_mapping_polls_identically() {
    let mut backend = SimulatedBackend::new();
    let mut registry = DeviceRegistry::new(0);
    let id = backend.connect_gamepad("pad");
    registry.handle_connect(&backend, id);
    let pad = VirtualControllerBridge::new();
    let keyboard = KeyboardState::new();

    let mut store = TomlConfigStore::in_memory();
    let original = ButtonMapping::new(
        0,
        PadButtons::DPAD_RIGHT,
        ButtonSource::GamepadAxisDirection(GamepadAxis::LeftX, AxisDirection::Positive),
    );
    original.save_to_config(&mut store, PREFIX);
    let reloaded = ButtonMappingFactory::create_from_config(&mut store, PREFIX, 0, &original.id()).unwrap();
    assert_eq!(reloaded.id(), original.id());

    for value in [0, 10000, 22937, 22938, 32767, -32768, 30000] {
        backend.set_axis(id, GamepadAxis::LeftX, value);
        let ctx = PollContext::new(&backend, &registry, &pad, &keyboard);
        assert_eq!(reloaded.is_pressed(&ctx), original.is_pressed(&ctx), "value {}", value);
    }
}

#[test]
fn test_led_self_heal_empties_subtree() {
    let mut store = TomlConfigStore::in_memory();
    store.set_string("Controllers.LEDMappings.P2.LEDMappingClass", "SDLLEDMapping");
    store.set_integer("Controllers.LEDMappings.P2.ColorSource", 42);
    store.set_color("Controllers.LEDMappings.P2.SavedColor", Rgb8::new(255, 255, 255));

    assert!(LedMappingFactory::create_from_config(&mut store, PREFIX, 2, "P2").is_none());
    assert!(!store.contains_subtree("Controllers.LEDMappings.P2"));
    assert!(store.is_empty());
}

#[test]
fn test_shadow_cache_is_read_back_same_tick() {
    let (mut deck, _store) = deck();
    assert!(deck.attach_virtual_controller());

    deck.set_virtual_button(3, true);
    assert!(deck.virtual_controller().button_state(3));

    let id = deck.virtual_controller().instance_id().unwrap();
    assert!(!deck.backend().joystick_button(id, 3));

    // Default A mapping reads raw button 0 of the virtual pad from the cache
    deck.set_virtual_button(0, true);
    let states = deck.read(&FrameInput::default());
    assert!(states[0].buttons.contains(PadButtons::A | PadButtons::Y));
}

#[test]
fn test_virtual_stick_reaches_port_axes() {
    let (mut deck, _store) = deck();
    deck.attach_virtual_controller();
    deck.set_virtual_axis(0, -20000);
    deck.set_virtual_button(-1, true);

    let states = deck.read(&FrameInput::default());
    assert_eq!(states[0].axis(LogicalAxis::StickX), -20000);
    assert_eq!(states[0].axis(LogicalAxis::StickY), i16::MAX);
}

#[test]
fn test_removed_device_polls_inactive() {
    let (mut deck, _store) = deck();
    let id = deck.backend_mut().connect_gamepad("pad");
    deck.backend_mut().set_button(id, GamepadButton::South, true);
    deck.process_device_events();
    assert!(deck.read(&FrameInput::default())[0].buttons.contains(PadButtons::A));

    deck.backend_mut().disconnect(id);
    deck.process_device_events();
    for _ in 0..1000 {
        let states = deck.read(&FrameInput::default());
        assert!(states.iter().all(|s| s.buttons.is_empty()));
    }
}

#[test]
fn test_rebinding_flow() {
    let (mut deck, _store) = deck();
    assert!(deck.create_button_mapping_from_live_input(0, PadButtons::B).is_none());

    let id = deck.backend_mut().connect_gamepad("pad");
    deck.process_device_events();
    deck.backend_mut().set_axis(id, GamepadAxis::RightX, i16::MAX);
    deck.backend_mut().set_button(id, GamepadButton::West, true);

    let mapping = deck.create_button_mapping_from_live_input(0, PadButtons::B).unwrap();
    assert_eq!(mapping.source(), ButtonSource::GamepadButton(GamepadButton::West));
    assert_eq!(mapping.id(), "P0-B16384-SDLB2");
}

#[test]
fn test_negative_index_convention() {
    let (mut deck, _store) = deck();
    deck.attach_virtual_controller();

    deck.set_virtual_button(-3, true);
    assert_eq!(deck.virtual_controller().axis_state(3), 32767);
    deck.set_virtual_button(-3, false);
    assert_eq!(deck.virtual_controller().axis_state(3), -32768);
}

#[test]
fn test_input_blocked_gate_keeps_keyboard() {
    let mut backend = SimulatedBackend::new();
    let mut registry = DeviceRegistry::new(0);
    let id = backend.connect_gamepad("pad");
    registry.handle_connect(&backend, id);
    backend.set_button(id, GamepadButton::South, true);
    let pad = VirtualControllerBridge::new();
    let mut keyboard = KeyboardState::new();
    keyboard.press(keys::X);

    let gamepad = ButtonMapping::new(0, PadButtons::A, ButtonSource::GamepadButton(GamepadButton::South));
    let key = ButtonMapping::new(0, PadButtons::A, ButtonSource::KeyboardKey(keys::X));

    let mut both = ControllerPort::new(0);
    both.add_button_mapping(gamepad.clone());
    both.add_button_mapping(key);
    let mut gamepad_only = ControllerPort::new(0);
    gamepad_only.add_button_mapping(gamepad);

    let ctx = PollContext::new(&backend, &registry, &pad, &keyboard).with_input_blocked(true);
    assert!(both.update(&ctx, None).buttons.contains(PadButtons::A));
    assert!(!gamepad_only.update(&ctx, None).buttons.contains(PadButtons::A));

    let ctx = PollContext::new(&backend, &registry, &pad, &keyboard);
    assert!(gamepad_only.update(&ctx, None).buttons.contains(PadButtons::A));
}

#[test]
fn test_blocked_frame_through_deck() {
    let (mut deck, _store) = deck();
    let id = deck.backend_mut().connect_gamepad("pad");
    deck.process_device_events();
    deck.backend_mut().set_button(id, GamepadButton::Start, true);
    deck.keyboard_mut().press(keys::ENTER);
    deck.keyboard_mut().press(keys::D);

    let states = deck.read(&FrameInput::blocked());
    assert!(states[0].buttons.contains(PadButtons::START));
    assert_eq!(states[0].axis(LogicalAxis::StickX), i16::MAX);

    deck.keyboard_mut().release_all();
    let states = deck.read(&FrameInput::blocked());
    assert!(states[0].buttons.is_empty());
}

#[test]
fn test_replug_under_same_id_is_tracked() {
    let (mut deck, _store) = deck();
    deck.backend_mut()
        .connect_with_id(7, DeviceCapabilities { name: "first".into(), ..Default::default() });
    deck.process_device_events();
    let first = deck.registry().get(7).unwrap().connection_serial;

    deck.backend_mut().disconnect(7);
    deck.backend_mut()
        .connect_with_id(7, DeviceCapabilities { name: "second".into(), ..Default::default() });
    let stats = deck.process_device_events();
    assert_eq!((stats.added, stats.removed), (1, 1));

    let device = deck.registry().get(7).unwrap();
    assert_eq!(device.capabilities.name, "second");
    assert!(device.connection_serial > first);

    deck.backend_mut().set_button(7, GamepadButton::South, true);
    assert!(deck.read(&FrameInput::default())[0].buttons.contains(PadButtons::A));
}

#[test]
fn test_hotplug_from_another_thread() {
    let mut backend = SimulatedBackend::new();
    let mut registry = DeviceRegistry::new(0);
    let mut bridge = DeviceEventBridge::new();
    let id = backend.connect_gamepad("pad");
    bridge.process_events(&mut backend, &mut registry);
    assert!(registry.is_connected(id));

    backend.push_event(PlatformEvent::Other {
        description: "window focus".into(),
    });
    let sender = backend.hotplug_sender();
    std::thread::spawn(move || sender.send(PlatformEvent::removed(id)))
        .join()
        .unwrap();

    let stats = bridge.process_events(&mut backend, &mut registry);
    assert_eq!(stats.removed, 1);
    assert!(!registry.is_connected(id));
    assert_eq!(backend.queued_events(), 1);
}

#[test]
fn test_led_game_color_reaches_devices_once() {
    let (mut deck, _store) = deck();
    let id = deck.backend_mut().connect_with_capabilities(DeviceCapabilities {
        has_rgb_led: true,
        ..Default::default()
    });
    deck.process_device_events();

    let blue = Rgb8::new(0, 0, 255);
    for _ in 0..5 {
        deck.read(&FrameInput::default().with_led(0, blue));
    }
    assert_eq!(deck.backend().led(id), Some(blue));
    assert_eq!(deck.backend().led_writes(), 1);
}

#[test]
fn test_port_mappings_survive_restart() {
    let (mut deck, mut store) = deck();
    let port = deck.port_mut(1).unwrap();
    port.add_button_mapping(ButtonMapping::new(1, PadButtons::Z, ButtonSource::KeyboardKey(keys::SPACE)));
    deck.save(&mut store);

    let mut restarted = ControlDeck::new(SimulatedBackend::new(), &DeckSettings::default());
    restarted.init(&mut store);
    let ids: Vec<String> = restarted.port(1).unwrap().button_mappings().iter().map(|m| m.id()).collect();
    assert!(ids.contains(&"P1-B8-KB44".to_string()));
}
