//! Mobile virtual controller
//!
//! Touch and gyro input from the platform UI is exposed as a virtual gamepad
//! so that the regular mapping pipeline can consume it. The platform backend
//! misreports virtual device state right after a write, so every write goes
//! to a [`ShadowStateCache`] first and readers only ever consult the cache.
//!
//! ```text
//! Platform UI ──► VirtualControllerBridge ──► ShadowStateCache ──► Mappings
//!                         │                    (read path)
//!                         └──► backend write (best effort)
//! ```

pub mod ffi;
pub mod shadow_cache;
pub mod virtual_controller;

pub use ffi::DeckHandle;
pub use shadow_cache::{ShadowStateCache, MAX_VIRTUAL_AXES, MAX_VIRTUAL_BUTTONS};
pub use virtual_controller::{VirtualControllerBridge, VIRTUAL_CONTROLLER_MAPPING};
