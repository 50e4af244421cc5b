use color_eyre::{eyre::eyre, Result};
use controldeck::backend::gilrs::GilrsBackend;
use controldeck::backend::simulated::SimulatedBackend;
use controldeck::controller::buttons::GamepadButton;
use controldeck::mobile::DeckHandle;
use controldeck::persistence::{ConfigStore, TomlConfigStore};
use controldeck::{ControlDeck, DeckSettings, FrameInput, InputBackend, PortState};
use std::time::Duration;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let simulated = std::env::args().any(|arg| arg == "--simulated");

    let settings = DeckSettings::load_or_create(DeckSettings::default_path()).unwrap_or_else(|e| {
        eprintln!("Failed to load settings, using defaults: {}", e);
        DeckSettings::default()
    });
    setup(settings.tracing_level())?;

    let mut store = TomlConfigStore::open(settings.mapping_path())
        .map_err(|e| eyre!("Failed to open mapping store: {}", e))?;

    let backend: Box<dyn InputBackend> = if simulated {
        info!("Starting with simulated backend");
        let mut backend = SimulatedBackend::new();
        let pad = backend.connect_gamepad("Simulated Pad");
        backend.set_button(pad, GamepadButton::South, true);
        Box::new(backend)
    } else {
        Box::new(GilrsBackend::new().map_err(|e| eyre!("Failed to start backend: {}", e))?)
    };
    let deck: DeckHandle = ControlDeck::new(backend, &settings);
    run(deck, &mut store, &settings).await
}

async fn run<B: InputBackend>(
    mut deck: ControlDeck<B>,
    store: &mut dyn ConfigStore,
    settings: &DeckSettings,
) -> Result<()> {
    deck.init(store);

    let period = Duration::from_secs_f64(1.0 / f64::from(settings.frame_rate_hz));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    info!("Reading controllers at {} Hz, Ctrl+C to stop", settings.frame_rate_hz);

    let mut last: Option<[PortState; controldeck::controller::buttons::MAX_CONTROLLERS]> = None;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let stats = deck.process_device_events();
                if stats.added > 0 || stats.removed > 0 {
                    info!(
                        "Devices: +{} -{} ({} connected)",
                        stats.added,
                        stats.removed,
                        deck.registry().len()
                    );
                }

                let states = deck.read(&FrameInput::default());
                if last.as_ref() != Some(&states) {
                    for (port, state) in states.iter().enumerate() {
                        if !state.buttons.is_empty() || state.axes.iter().any(|a| *a != 0) {
                            debug!("Port {}: buttons={:?} axes={:?}", port + 1, state.buttons, state.axes);
                        }
                    }
                    last = Some(states);
                }
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!("Failed to listen for Ctrl+C: {}", e);
                }
                break;
            }
        }
    }

    deck.shutdown();
    deck.save(store);
    info!("Stopped");
    Ok(())
}

fn setup(level: Level) -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    setup_logging_env(level);
    Ok(())
}

fn setup_logging_env(level: Level) {
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
