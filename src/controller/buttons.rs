//! Logical and physical input vocabulary shared by every subsystem
//!
//! Logical side: [`PadButtons`] (one bit per console button) and
//! [`LogicalAxis`] (analog slots of a console pad).
//! Physical side: [`GamepadButton`] and [`GamepadAxis`] in the fixed scan order
//! used for any-input detection.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of logical controller ports the simulation always reads
pub const MAX_CONTROLLERS: usize = 4;

/// Full-scale value of a signed 16-bit axis
pub const AXIS_FULL_SCALE: f32 = 32767.0;

bitflags! {
    /// Console pad button bits, one bit per logical button
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct PadButtons: u16 {
        const A          = 0x8000;
        const B          = 0x4000;
        const X          = 0x2000;
        const Y          = 0x1000;
        const START      = 0x0800;
        const SELECT     = 0x0400;
        const DPAD_UP    = 0x0200;
        const DPAD_DOWN  = 0x0100;
        const DPAD_LEFT  = 0x0080;
        const DPAD_RIGHT = 0x0040;
        const L          = 0x0020;
        const R          = 0x0010;
        const Z          = 0x0008;
        const L_STICK    = 0x0004;
        const R_STICK    = 0x0002;
    }
}

/// Stick half used when an axis is read as a digital direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisDirection {
    Negative = -1,
    Positive = 1,
}

impl AxisDirection {
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            -1 => Some(Self::Negative),
            1 => Some(Self::Positive),
            _ => None,
        }
    }

    /// Classifies a normalized axis value against a threshold
    pub fn classify(normalized: f32, threshold: f32) -> Option<Self> {
        if normalized < -threshold {
            Some(Self::Negative)
        } else if normalized > threshold {
            Some(Self::Positive)
        } else {
            None
        }
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Negative => "NEG",
            Self::Positive => "POS",
        }
    }
}

/// Standard gamepad buttons in scan order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GamepadButton {
    South = 0,
    East = 1,
    West = 2,
    North = 3,
    Back = 4,
    Guide = 5,
    Start = 6,
    LeftStick = 7,
    RightStick = 8,
    LeftShoulder = 9,
    RightShoulder = 10,
    DPadUp = 11,
    DPadDown = 12,
    DPadLeft = 13,
    DPadRight = 14,
    Misc1 = 15,
    RightPaddle1 = 16,
    LeftPaddle1 = 17,
    RightPaddle2 = 18,
    LeftPaddle2 = 19,
}

impl GamepadButton {
    pub const ALL: [GamepadButton; 20] = [
        Self::South,
        Self::East,
        Self::West,
        Self::North,
        Self::Back,
        Self::Guide,
        Self::Start,
        Self::LeftStick,
        Self::RightStick,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::DPadUp,
        Self::DPadDown,
        Self::DPadLeft,
        Self::DPadRight,
        Self::Misc1,
        Self::RightPaddle1,
        Self::LeftPaddle1,
        Self::RightPaddle2,
        Self::LeftPaddle2,
    ];

    pub fn index(self) -> i32 {
        self as i32
    }

    pub fn from_index(index: i32) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    /// Raw joystick button index behind the standard button.
    ///
    /// Must stay in sync with the virtual controller mapping string.
    pub fn joystick_index(self) -> Option<usize> {
        match self {
            Self::South => Some(0),
            Self::East => Some(1),
            Self::West => Some(2),
            Self::North => Some(3),
            Self::Back => Some(4),
            Self::Guide => Some(5),
            Self::Start => Some(6),
            Self::LeftStick => Some(7),
            Self::RightStick => Some(8),
            Self::LeftShoulder => Some(9),
            Self::RightShoulder => Some(10),
            Self::DPadUp => Some(11),
            Self::DPadDown => Some(12),
            Self::DPadLeft => Some(13),
            Self::DPadRight => Some(14),
            _ => None,
        }
    }

    /// Short name shown in rebinding UIs
    pub fn display_name(self) -> String {
        let name = match self {
            Self::South => "A",
            Self::East => "B",
            Self::West => "X",
            Self::North => "Y",
            Self::Back => "View",
            Self::Guide => "Guide",
            Self::Start => "Start",
            Self::LeftStick => "LS",
            Self::RightStick => "RS",
            Self::LeftShoulder => "LB",
            Self::RightShoulder => "RB",
            Self::DPadUp => "D-Pad Up",
            Self::DPadDown => "D-Pad Down",
            Self::DPadLeft => "D-Pad Left",
            Self::DPadRight => "D-Pad Right",
            Self::Misc1 => "Share",
            Self::RightPaddle1 => "P1",
            Self::LeftPaddle1 => "P2",
            Self::RightPaddle2 => "P3",
            Self::LeftPaddle2 => "P4",
        };
        name.to_string()
    }
}

/// Standard gamepad axes in scan order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GamepadAxis {
    LeftX = 0,
    LeftY = 1,
    RightX = 2,
    RightY = 3,
    LeftTrigger = 4,
    RightTrigger = 5,
}

impl GamepadAxis {
    pub const ALL: [GamepadAxis; 6] = [
        Self::LeftX,
        Self::LeftY,
        Self::RightX,
        Self::RightY,
        Self::LeftTrigger,
        Self::RightTrigger,
    ];

    pub fn index(self) -> i32 {
        self as i32
    }

    pub fn from_index(index: i32) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn display_name(self, direction: Option<AxisDirection>) -> String {
        let base = match self {
            Self::LeftX => "Left Stick X",
            Self::LeftY => "Left Stick Y",
            Self::RightX => "Right Stick X",
            Self::RightY => "Right Stick Y",
            Self::LeftTrigger => "LT",
            Self::RightTrigger => "RT",
        };
        match direction {
            Some(AxisDirection::Negative) => format!("{} -", base),
            Some(AxisDirection::Positive) => format!("{} +", base),
            None => base.to_string(),
        }
    }
}

/// Analog slots of the console pad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalAxis {
    StickX = 0,
    StickY = 1,
    RightStickX = 2,
    RightStickY = 3,
}

impl LogicalAxis {
    pub const COUNT: usize = 4;

    pub const ALL: [LogicalAxis; 4] = [
        Self::StickX,
        Self::StickY,
        Self::RightStickX,
        Self::RightStickY,
    ];

    pub fn slot(self) -> usize {
        self as usize
    }

    pub fn from_index(index: i32) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }
}

/// 24-bit RGB color for controller LEDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb8 {
    pub const BLACK: Rgb8 = Rgb8 { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Rgb8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Converts a raw signed 16-bit axis reading to [-1.0, 1.0]
pub fn normalize_axis(raw: i16) -> f32 {
    (raw as f32 / AXIS_FULL_SCALE).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_order_is_index_order() {
        for (i, button) in GamepadButton::ALL.iter().enumerate() {
            assert_eq!(button.index(), i as i32);
        }
        for (i, axis) in GamepadAxis::ALL.iter().enumerate() {
            assert_eq!(axis.index(), i as i32);
        }
    }

    #[test]
    fn test_from_index_rejects_out_of_range() {
        assert_eq!(GamepadButton::from_index(-1), None);
        assert_eq!(GamepadButton::from_index(20), None);
        assert_eq!(GamepadAxis::from_index(6), None);
        assert_eq!(GamepadButton::from_index(2), Some(GamepadButton::West));
    }

    #[test]
    fn test_axis_direction_classification() {
        assert_eq!(AxisDirection::classify(-0.8, 0.7), Some(AxisDirection::Negative));
        assert_eq!(AxisDirection::classify(0.71, 0.7), Some(AxisDirection::Positive));
        assert_eq!(AxisDirection::classify(0.7, 0.7), None);
        assert_eq!(AxisDirection::classify(0.0, 0.7), None);
    }

    #[test]
    fn test_pad_buttons_one_bit_each() {
        for flag in PadButtons::all().iter() {
            assert_eq!(flag.bits().count_ones(), 1);
        }
    }

    #[test]
    fn test_joystick_index_matches_standard_layout() {
        assert_eq!(GamepadButton::South.joystick_index(), Some(0));
        assert_eq!(GamepadButton::DPadRight.joystick_index(), Some(14));
        assert_eq!(GamepadButton::Misc1.joystick_index(), None);
    }
}
