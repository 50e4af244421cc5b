//! Keyboard state fed by the host event pump

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Platform-independent key scancode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Scancode(pub u16);

impl fmt::Display for Scancode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// USB HID usage ids for the keys used by the default layout
pub mod keys {
    use super::Scancode;

    pub const A: Scancode = Scancode(4);
    pub const D: Scancode = Scancode(7);
    pub const S: Scancode = Scancode(22);
    pub const W: Scancode = Scancode(26);
    pub const X: Scancode = Scancode(27);
    pub const C: Scancode = Scancode(6);
    pub const Z: Scancode = Scancode(29);
    pub const Q: Scancode = Scancode(20);
    pub const E: Scancode = Scancode(8);
    pub const V: Scancode = Scancode(25);
    pub const ENTER: Scancode = Scancode(40);
    pub const BACKSPACE: Scancode = Scancode(42);
    pub const SPACE: Scancode = Scancode(44);
    pub const RIGHT: Scancode = Scancode(79);
    pub const LEFT: Scancode = Scancode(80);
    pub const DOWN: Scancode = Scancode(81);
    pub const UP: Scancode = Scancode(82);
}

#[derive(Debug, Default, Clone)]
pub struct KeyboardState {
    pressed: BTreeSet<Scancode>,
}

impl KeyboardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, key: Scancode) {
        self.pressed.insert(key);
    }

    pub fn release(&mut self, key: Scancode) {
        self.pressed.remove(&key);
    }

    /// Releases everything, e.g. when the window loses focus
    pub fn release_all(&mut self) {
        self.pressed.clear();
    }

    pub fn is_pressed(&self, key: Scancode) -> bool {
        self.pressed.contains(&key)
    }

    /// Lowest pressed scancode, used for rebinding
    pub fn first_pressed(&self) -> Option<Scancode> {
        self.pressed.iter().next().copied()
    }
}
