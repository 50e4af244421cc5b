//! Logical controller side
//!
//! 1. [`buttons`] - pad bitmask, axes and the physical input vocabulary
//! 2. [`port`] - one logical slot aggregating its mappings per frame
//! 3. [`deck`] - every port plus the device plumbing, read once per frame
//!
//! # Architecture
//!
//! ```text
//! Registry ─┐
//! Shadow ───┼──► Mappings ──► ControllerPort ──► ControlDeck::read ──► [PortState; 4]
//! Keyboard ─┘      (poll)        (OR / write)
//! ```

pub mod buttons;
pub mod deck;
pub mod port;

pub use deck::{ControlDeck, FrameInput};
pub use port::{ControllerPort, PortState};
