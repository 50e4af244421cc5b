//! Physical device tracking
//!
//! ```text
//! Backend event queue ──► DeviceEventBridge ──► DeviceRegistry ──► Mappings
//!   (any thread)          (drained per frame)    (main thread)      (poll)
//! ```
//!
//! 1. [`hotplug`] - FIFO drain of add/remove events, once per frame
//! 2. [`registry`] - live device set per logical port
//! 3. [`keyboard`] - key state for keyboard-sourced mappings

pub mod hotplug;
pub mod keyboard;
pub mod registry;

pub use hotplug::{DeviceEventBridge, DrainStats};
pub use keyboard::{KeyboardState, Scancode};
pub use registry::{ConnectedDevice, DeviceRegistry};
