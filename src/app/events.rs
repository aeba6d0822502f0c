//! Values carried by hardware notifications and user callbacks.
//!
//! Edge notifications arrive from the [`HardwarePin`](super::ports::HardwarePin)
//! collaborator, touch notifications from the
//! [`TouchSensor`](super::ports::TouchSensor). Both are delivered on the
//! collaborator's own thread.

use core::fmt;

/// Logic level of a digital line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Level {
    #[default]
    Low,
    High,
}

impl Level {
    pub fn is_high(self) -> bool {
        matches!(self, Self::High)
    }

    pub fn is_low(self) -> bool {
        matches!(self, Self::Low)
    }
}

impl core::ops::Not for Level {
    type Output = Self;

    fn not(self) -> Self {
        match self {
            Self::Low => Self::High,
            Self::High => Self::Low,
        }
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Self::High } else { Self::Low }
    }
}

impl From<Level> for bool {
    fn from(level: Level) -> Self {
        level.is_high()
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> Self {
        u8::from(level.is_high())
    }
}

/// Event reported by the capacitive touch controller for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TouchEvent {
    Press,
    Release,
    Held,
    /// Controller reported no touch; treated like a release.
    None,
}

impl TouchEvent {
    /// Every event a [`TouchChannel`](crate::drivers::touch::TouchChannel)
    /// subscribes to.
    pub const ALL: [Self; 4] = [Self::Press, Self::Release, Self::Held, Self::None];

    /// Slot index in per-event handler tables.
    pub fn index(self) -> usize {
        match self {
            Self::Press => 0,
            Self::Release => 1,
            Self::Held => 2,
            Self::None => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Press => "press",
            Self::Release => "release",
            Self::Held => "held",
            Self::None => "none",
        }
    }
}

impl fmt::Display for TouchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
