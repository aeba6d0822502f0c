//! Port traits: the boundary between the effects engine and the hardware.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ drivers (TimedOutput, DebouncedInput, ...)
//! ```
//!
//! Hardware backends (simulation, embedded-hal, a vendor GPIO library)
//! implement these traits. Drivers consume them via generics or trait
//! objects, so the effect state machines never touch registers directly.
//!
//! ## Threading notes
//!
//! - A [`HardwarePin`] is owned by exactly one driver and is always accessed
//!   through that driver's `Mutex`, so implementations need only be `Send`.
//! - Edge and touch callbacks are invoked on whatever thread the backend
//!   uses for notifications. Backends must not hold their own internal
//!   locks while invoking a callback.

use std::sync::Arc;

use super::events::{Level, TouchEvent};
use crate::error::PinError;

/// Callback a backend invokes on every (hardware-debounced) edge.
pub type EdgeCallback = Arc<dyn Fn() + Send + Sync>;

/// Callback a touch controller invokes with `(channel, event)`.
pub type TouchHandler = Arc<dyn Fn(u8, TouchEvent) + Send + Sync>;

// ───────────────────────────────────────────────────────────────
// Digital line (GPIO + PWM + edge detect)
// ───────────────────────────────────────────────────────────────

/// One physical GPIO line with software or hardware PWM.
///
/// Duty cycles are percentages (`0.0..=100.0`), frequencies in Hz. Values
/// are passed through unvalidated; out-of-range input is the backend's
/// to reject.
pub trait HardwarePin: Send {
    /// Sample the line.
    fn read(&mut self) -> Result<Level, PinError>;

    /// Drive the line to a static level.
    fn write_digital(&mut self, level: Level) -> Result<(), PinError>;

    /// Start PWM output at `frequency_hz` and `duty` percent.
    fn set_pwm(&mut self, frequency_hz: f32, duty: f32) -> Result<(), PinError>;

    /// Change the duty cycle of a running PWM.
    fn change_duty_cycle(&mut self, duty: f32) -> Result<(), PinError>;

    /// Change the frequency of a running PWM.
    fn change_frequency(&mut self, frequency_hz: f32) -> Result<(), PinError>;

    /// Stop PWM output. Stopping an idle PWM is a no-op.
    fn stop_pwm(&mut self) -> Result<(), PinError>;

    /// Install an edge-detect (both edges) subscription. The backend
    /// forwards at most one notification per `debounce_ms`.
    fn subscribe_edge(&mut self, callback: EdgeCallback, debounce_ms: u32)
    -> Result<(), PinError>;

    /// Remove the edge-detect subscription, if any.
    fn unsubscribe_edge(&mut self) -> Result<(), PinError>;
}

// ───────────────────────────────────────────────────────────────
// Pin allocation
// ───────────────────────────────────────────────────────────────

/// Hands out [`HardwarePin`]s by GPIO number.
///
/// Implementations MUST refuse a second claim of the same line with
/// [`PinError::AlreadyClaimed`]; this is what guarantees a single logical
/// owner per physical line.
pub trait PinProvider {
    type Pin: HardwarePin + 'static;

    fn claim(&mut self, gpio: u8) -> Result<Self::Pin, PinError>;
}

// ───────────────────────────────────────────────────────────────
// Capacitive touch controller
// ───────────────────────────────────────────────────────────────

/// Shared capacitive-touch controller (one per board).
pub trait TouchSensor: Send + Sync {
    /// Register `handler` for `event` on `channel`. Several handlers may be
    /// registered for the same pair; all are invoked.
    fn on_event(&self, channel: u8, event: TouchEvent, handler: TouchHandler)
    -> Result<(), PinError>;

    /// Allow several pads to report simultaneously.
    fn enable_multitouch(&self, enable: bool) -> Result<(), PinError>;

    /// Product ID register, used to detect the board.
    fn product_id(&self) -> Result<u8, PinError>;
}

// ───────────────────────────────────────────────────────────────
// Analog converter
// ───────────────────────────────────────────────────────────────

/// Single-ended ADC (present on the Pro board only).
pub trait AnalogSource: Send + Sync {
    /// Read `channel` in volts.
    fn read(&self, channel: u8) -> Result<f32, PinError>;
}
