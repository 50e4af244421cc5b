//! Controller input normalization
//!
//! Turns hot-plugged gamepads, the keyboard and a touch-driven virtual pad
//! into a fixed set of logical controller ports read once per frame.

pub mod backend;
pub mod config;
pub mod controller;
pub mod mapping;
pub mod mobile;
pub mod persistence;
pub mod physical_device;

pub use backend::{InputBackend, InstanceId};
pub use config::DeckSettings;
pub use controller::{ControlDeck, FrameInput, PortState};
