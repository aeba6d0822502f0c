//! In-memory simulation backend.
//!
//! Implements every port trait without hardware so the library runs (and is
//! tested) on a host machine. Each [`SimPin`] records the last
//! [`CALL_HISTORY`] calls made to it;
//! a cloneable [`SimPinProbe`] stays with the test or simulator to inspect
//! that history and to drive input levels from the "outside world".
//!
//! Edge notifications raised through [`SimPinProbe::set_input`] are
//! delivered synchronously on the caller's thread, the way an ISR-backed
//! GPIO library delivers them on its own event thread. The backend enforces
//! the subscription's debounce interval, like the real edge-detect layer.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use heapless::HistoryBuffer;
use log::trace;

use crate::app::events::{Level, TouchEvent};
use crate::app::ports::{
    AnalogSource, EdgeCallback, HardwarePin, PinProvider, TouchHandler, TouchSensor,
};
use crate::drivers::worker::lock;
use crate::error::PinError;

// ── Call record ───────────────────────────────────────────────

/// Calls kept per line; older ones are overwritten.
pub const CALL_HISTORY: usize = 1024;

/// A single hardware call made to a [`SimPin`]. Reads are not recorded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PinCall {
    Write(Level),
    SetPwm { frequency_hz: f32, duty: f32 },
    ChangeDutyCycle(f32),
    ChangeFrequency(f32),
    StopPwm,
    Subscribe { debounce_ms: u32 },
    Unsubscribe,
}

/// PWM generator state of a simulated line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PwmState {
    pub running: bool,
    pub frequency_hz: f32,
    pub duty: f32,
}

struct EdgeSubscription {
    callback: EdgeCallback,
    debounce: Duration,
    last_delivery: Option<Instant>,
}

struct LineState {
    level: Level,
    pwm: PwmState,
    calls: HistoryBuffer<(Instant, PinCall), CALL_HISTORY>,
    total_calls: u64,
    edge: Option<EdgeSubscription>,
    fail_writes: bool,
}

struct SimLine {
    gpio: u8,
    state: Mutex<LineState>,
}

impl SimLine {
    fn record(&self, call: PinCall) -> Result<(), PinError> {
        let mut state = lock(&self.state);
        if state.fail_writes {
            return Err(match call {
                PinCall::Write(_) => PinError::WriteFailed,
                PinCall::Subscribe { .. } | PinCall::Unsubscribe => PinError::EdgeDetectFailed,
                _ => PinError::PwmFailed,
            });
        }
        state.calls.write((Instant::now(), call));
        state.total_calls += 1;
        match call {
            PinCall::Write(level) => state.level = level,
            PinCall::SetPwm { frequency_hz, duty } => {
                state.pwm = PwmState {
                    running: true,
                    frequency_hz,
                    duty,
                };
            }
            PinCall::ChangeDutyCycle(duty) => state.pwm.duty = duty,
            PinCall::ChangeFrequency(frequency_hz) => state.pwm.frequency_hz = frequency_hz,
            PinCall::StopPwm => state.pwm.running = false,
            PinCall::Subscribe { .. } | PinCall::Unsubscribe => {}
        }
        Ok(())
    }
}

// ── SimPin ────────────────────────────────────────────────────

/// Simulated GPIO line with PWM and edge detect.
pub struct SimPin {
    line: Arc<SimLine>,
}

impl SimPin {
    /// Create a line (initially LOW, PWM idle at 1 Hz / 0 %) and its probe.
    pub fn new(gpio: u8) -> (Self, SimPinProbe) {
        let line = Arc::new(SimLine {
            gpio,
            state: Mutex::new(LineState {
                level: Level::Low,
                pwm: PwmState {
                    running: false,
                    frequency_hz: 1.0,
                    duty: 0.0,
                },
                calls: HistoryBuffer::new(),
                total_calls: 0,
                edge: None,
                fail_writes: false,
            }),
        });
        (
            Self {
                line: Arc::clone(&line),
            },
            SimPinProbe { line },
        )
    }

    pub fn gpio(&self) -> u8 {
        self.line.gpio
    }
}

impl HardwarePin for SimPin {
    fn read(&mut self) -> Result<Level, PinError> {
        Ok(lock(&self.line.state).level)
    }

    fn write_digital(&mut self, level: Level) -> Result<(), PinError> {
        self.line.record(PinCall::Write(level))
    }

    fn set_pwm(&mut self, frequency_hz: f32, duty: f32) -> Result<(), PinError> {
        self.line.record(PinCall::SetPwm { frequency_hz, duty })
    }

    fn change_duty_cycle(&mut self, duty: f32) -> Result<(), PinError> {
        self.line.record(PinCall::ChangeDutyCycle(duty))
    }

    fn change_frequency(&mut self, frequency_hz: f32) -> Result<(), PinError> {
        self.line.record(PinCall::ChangeFrequency(frequency_hz))
    }

    fn stop_pwm(&mut self) -> Result<(), PinError> {
        self.line.record(PinCall::StopPwm)
    }

    fn subscribe_edge(
        &mut self,
        callback: EdgeCallback,
        debounce_ms: u32,
    ) -> Result<(), PinError> {
        self.line.record(PinCall::Subscribe { debounce_ms })?;
        lock(&self.line.state).edge = Some(EdgeSubscription {
            callback,
            debounce: Duration::from_millis(u64::from(debounce_ms)),
            last_delivery: None,
        });
        Ok(())
    }

    fn unsubscribe_edge(&mut self) -> Result<(), PinError> {
        self.line.record(PinCall::Unsubscribe)?;
        lock(&self.line.state).edge = None;
        Ok(())
    }
}

// ── SimPinProbe ───────────────────────────────────────────────

/// Test-side handle onto a [`SimPin`].
#[derive(Clone)]
pub struct SimPinProbe {
    line: Arc<SimLine>,
}

impl SimPinProbe {
    pub fn gpio(&self) -> u8 {
        self.line.gpio
    }

    /// Retained calls, oldest first.
    pub fn calls(&self) -> Vec<PinCall> {
        lock(&self.line.state)
            .calls
            .oldest_ordered()
            .map(|(_, call)| *call)
            .collect()
    }

    /// Every recorded call with the instant it was made.
    pub fn timed_calls(&self) -> Vec<(Instant, PinCall)> {
        lock(&self.line.state).calls.oldest_ordered().copied().collect()
    }

    /// Calls made since creation, including ones no longer retained.
    pub fn total_calls(&self) -> u64 {
        lock(&self.line.state).total_calls
    }

    /// Number of retained calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&PinCall) -> bool) -> usize {
        lock(&self.line.state)
            .calls
            .oldest_ordered()
            .filter(|(_, call)| pred(call))
            .count()
    }

    pub fn clear_calls(&self) {
        lock(&self.line.state).calls.clear();
    }

    pub fn level(&self) -> Level {
        lock(&self.line.state).level
    }

    pub fn pwm(&self) -> PwmState {
        lock(&self.line.state).pwm
    }

    pub fn is_subscribed(&self) -> bool {
        lock(&self.line.state).edge.is_some()
    }

    /// Make every subsequent write-side call fail.
    pub fn fail_writes(&self, fail: bool) {
        lock(&self.line.state).fail_writes = fail;
    }

    /// Drive the line from outside. A level change raises an edge
    /// notification unless it falls within the subscription's debounce
    /// interval. Returns `true` if a notification was delivered.
    pub fn set_input(&self, level: Level) -> bool {
        let callback = {
            let mut state = lock(&self.line.state);
            let changed = state.level != level;
            state.level = level;
            match state.edge.as_mut() {
                Some(edge) if changed => {
                    let now = Instant::now();
                    let bounced = edge
                        .last_delivery
                        .is_some_and(|last| now.duration_since(last) < edge.debounce);
                    if bounced {
                        trace!("sim GPIO {}: edge suppressed by debounce", self.line.gpio);
                        None
                    } else {
                        edge.last_delivery = Some(now);
                        Some(Arc::clone(&edge.callback))
                    }
                }
                _ => None,
            }
        };
        // Invoke without holding the line lock; the callback reads the pin.
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    /// Raise an edge notification that bypasses the backend's debounce,
    /// as a glitching edge-detect layer would.
    pub fn raw_edge(&self) -> bool {
        let callback = lock(&self.line.state)
            .edge
            .as_ref()
            .map(|edge| Arc::clone(&edge.callback));
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }
}

// ── Pin provider ──────────────────────────────────────────────

/// Hands out [`SimPin`]s and keeps their probes, refusing double claims.
#[derive(Default)]
pub struct SimBoardIo {
    claimed: HashSet<u8>,
    probes: HashMap<u8, SimPinProbe>,
}

impl SimBoardIo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe for a claimed line.
    pub fn probe(&self, gpio: u8) -> Option<SimPinProbe> {
        self.probes.get(&gpio).cloned()
    }
}

impl PinProvider for SimBoardIo {
    type Pin = SimPin;

    fn claim(&mut self, gpio: u8) -> Result<SimPin, PinError> {
        if !self.claimed.insert(gpio) {
            return Err(PinError::AlreadyClaimed(gpio));
        }
        let (pin, probe) = SimPin::new(gpio);
        self.probes.insert(gpio, probe);
        Ok(pin)
    }
}

// ── Touch controller ──────────────────────────────────────────

/// Simulated capacitive-touch controller.
pub struct SimTouchChip {
    product_id: u8,
    multitouch: Mutex<bool>,
    handlers: Mutex<Vec<(u8, TouchEvent, TouchHandler)>>,
}

impl SimTouchChip {
    pub fn new(product_id: u8) -> Self {
        Self {
            product_id,
            multitouch: Mutex::new(false),
            handlers: Mutex::new(Vec::new()),
        }
    }

    /// Deliver `event` on `channel` to every matching handler, on the
    /// caller's thread. Returns the number of handlers invoked.
    pub fn emit(&self, channel: u8, event: TouchEvent) -> usize {
        let matching: Vec<TouchHandler> = lock(&self.handlers)
            .iter()
            .filter(|(c, e, _)| *c == channel && *e == event)
            .map(|(_, _, handler)| Arc::clone(handler))
            .collect();
        for handler in &matching {
            handler(channel, event);
        }
        matching.len()
    }

    pub fn multitouch_enabled(&self) -> bool {
        *lock(&self.multitouch)
    }

    pub fn handler_count(&self) -> usize {
        lock(&self.handlers).len()
    }
}

impl TouchSensor for SimTouchChip {
    fn on_event(
        &self,
        channel: u8,
        event: TouchEvent,
        handler: TouchHandler,
    ) -> Result<(), PinError> {
        lock(&self.handlers).push((channel, event, handler));
        Ok(())
    }

    fn enable_multitouch(&self, enable: bool) -> Result<(), PinError> {
        *lock(&self.multitouch) = enable;
        Ok(())
    }

    fn product_id(&self) -> Result<u8, PinError> {
        Ok(self.product_id)
    }
}

// ── ADC ───────────────────────────────────────────────────────

/// Simulated four-channel ADC.
#[derive(Default)]
pub struct SimAdc {
    volts: Mutex<[f32; 4]>,
}

impl SimAdc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, channel: u8, volts: f32) {
        if let Some(slot) = lock(&self.volts).get_mut(usize::from(channel)) {
            *slot = volts;
        }
    }
}

impl AnalogSource for SimAdc {
    fn read(&self, channel: u8) -> Result<f32, PinError> {
        lock(&self.volts)
            .get(usize::from(channel))
            .copied()
            .ok_or(PinError::AdcReadFailed)
    }
}
