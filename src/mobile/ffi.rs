//! C boundary for platform UI code
//!
//! Android and iOS glue calls these with a deck handle the host application
//! owns and hands out. There is no global deck: every call names its handle,
//! and a null handle is a no-op that returns the neutral value.
//!
//! # Safety
//!
//! A non-null handle must point to a live [`DeckHandle`] and must not be used
//! from two threads at once. All calls belong on the thread that reads the
//! deck each frame.

use crate::backend::InputBackend;
use crate::controller::ControlDeck;
use tracing::debug;

/// Deck type shared with platform code; the backend is picked at runtime
pub type DeckHandle = ControlDeck<Box<dyn InputBackend>>;

unsafe fn deck_mut<'a>(deck: *mut DeckHandle) -> Option<&'a mut DeckHandle> {
    let deck = unsafe { deck.as_mut() };
    if deck.is_none() {
        debug!("Virtual controller call with null deck handle");
    }
    deck
}

/// # Safety
/// See the module documentation.
#[no_mangle]
pub unsafe extern "C" fn controldeck_attach_controller(deck: *mut DeckHandle) -> bool {
    unsafe { deck_mut(deck) }.is_some_and(|deck| deck.attach_virtual_controller())
}

/// # Safety
/// See the module documentation.
#[no_mangle]
pub unsafe extern "C" fn controldeck_detach_controller(deck: *mut DeckHandle) {
    if let Some(deck) = unsafe { deck_mut(deck) } {
        deck.detach_virtual_controller();
    }
}

/// Negative `button` values address axis `-button`.
///
/// # Safety
/// See the module documentation.
#[no_mangle]
pub unsafe extern "C" fn controldeck_set_button(deck: *mut DeckHandle, button: i32, pressed: bool) {
    if let Some(deck) = unsafe { deck_mut(deck) } {
        deck.set_virtual_button(button, pressed);
    }
}

/// # Safety
/// See the module documentation.
#[no_mangle]
pub unsafe extern "C" fn controldeck_set_axis(deck: *mut DeckHandle, axis: i32, value: i16) {
    if let Some(deck) = unsafe { deck_mut(deck) } {
        deck.set_virtual_axis(axis, value);
    }
}

/// # Safety
/// See the module documentation.
#[no_mangle]
pub unsafe extern "C" fn controldeck_get_button_state(deck: *mut DeckHandle, button: i32) -> bool {
    unsafe { deck_mut(deck) }.is_some_and(|deck| deck.virtual_controller().button_state(button))
}

/// Axis 0 is yaw, axis 1 is pitch.
///
/// # Safety
/// See the module documentation.
#[no_mangle]
pub unsafe extern "C" fn controldeck_set_camera_state(deck: *mut DeckHandle, axis: i32, value: f32) {
    if let Some(deck) = unsafe { deck_mut(deck) } {
        deck.virtual_controller_mut().set_camera_state(axis, value);
    }
}

/// # Safety
/// See the module documentation.
#[no_mangle]
pub unsafe extern "C" fn controldeck_is_using_touchscreen_controls(deck: *mut DeckHandle) -> bool {
    unsafe { deck_mut(deck) }.is_some_and(|deck| deck.virtual_controller().is_using_touchscreen_controls())
}
