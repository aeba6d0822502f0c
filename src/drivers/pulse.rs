//! Four-phase brightness pulse: profile math and the 50 Hz scheduler.
//!
//! ## Profile
//!
//! ```text
//!  duty
//!  100 ┤      ┌──────────┐
//!      │     ╱            ╲
//!      │    ╱              ╲
//!    0 ┼───┘                └──────────┐  (repeats every period)
//!      └───┴──────┴──────────┴─────────┴──▶ t
//!         t_on     on       t_off    off
//! ```
//!
//! Phases are checked in the order rising, on, falling, off with inclusive
//! upper bounds, so an instant exactly on a boundary belongs to the earlier
//! phase (`delta == transition_on` is rising, which evaluates to 100).
//!
//! ## Scheduler
//!
//! [`PulseScheduler`] records the start instant, then on every tick
//! computes the duty from wall-clock elapsed time (not tick count, so a
//! late tick never skews the waveform) and writes it to the pin's PWM.
//! On cancellation the duty is forced to 0 before the worker exits.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, trace, warn};

use super::SharedPin;
use super::task::BackgroundTask;
use super::worker::lock;
use crate::app::ports::HardwarePin;
use crate::config::OutputTiming;
use crate::error::{Error, Result};

// ───────────────────────────────────────────────────────────────
// Profile
// ───────────────────────────────────────────────────────────────

/// Phase of a pulse cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Rising,
    On,
    Falling,
    Off,
}

/// Durations (seconds) of the four phases of one pulse cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseProfile {
    pub transition_on: f64,
    pub on: f64,
    pub transition_off: f64,
    pub off: f64,
}

impl PulseProfile {
    pub fn new(transition_on: f64, on: f64, transition_off: f64, off: f64) -> Self {
        Self {
            transition_on,
            on,
            transition_off,
            off,
        }
    }

    pub fn period(&self) -> f64 {
        self.transition_on + self.on + self.transition_off + self.off
    }

    /// No ramps at all: the profile is a plain square wave.
    pub fn is_square(&self) -> bool {
        self.transition_on == 0.0 && self.transition_off == 0.0
    }

    /// Every field finite and non-negative, and a non-zero period.
    pub fn is_valid(&self) -> bool {
        let fields = [self.transition_on, self.on, self.transition_off, self.off];
        fields.iter().all(|v| v.is_finite() && *v >= 0.0) && self.period() > 0.0
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(Error::Config("pulse profile needs non-negative durations and a non-zero period"))
        }
    }

    /// Phase for an offset `delta` into the cycle (`0 <= delta < period`).
    pub fn phase_at(&self, delta: f64) -> Phase {
        let rise_end = self.transition_on;
        let on_end = rise_end + self.on;
        let fall_end = on_end + self.transition_off;

        if delta <= rise_end {
            Phase::Rising
        } else if delta <= on_end {
            Phase::On
        } else if delta <= fall_end {
            Phase::Falling
        } else {
            Phase::Off
        }
    }

    /// Duty (percent) at offset `delta` into the cycle.
    pub fn duty_in_cycle(&self, delta: f64) -> u8 {
        let duty = match self.phase_at(delta) {
            Phase::Rising if self.transition_on == 0.0 => 100.0,
            Phase::Rising => (100.0 * delta / self.transition_on).round(),
            Phase::On => 100.0,
            Phase::Falling => {
                let into = delta - self.transition_on - self.on;
                (100.0 - 100.0 * into / self.transition_off).round()
            }
            Phase::Off => 0.0,
        };
        // Clamped to 0..=100, so the cast is exact.
        duty.clamp(0.0, 100.0) as u8
    }

    /// Duty (percent) `elapsed` seconds after the pulse started.
    pub fn duty_at(&self, elapsed: f64) -> u8 {
        let period = self.period();
        if !(period.is_finite() && period > 0.0) {
            return 0;
        }
        self.duty_in_cycle(elapsed.max(0.0).rem_euclid(period))
    }
}

// ───────────────────────────────────────────────────────────────
// Request with defaults
// ───────────────────────────────────────────────────────────────

/// Pulse parameters as a caller supplies them.
///
/// Every field left unset takes the value of `transition_on`, which itself
/// defaults to [`PulseRequest::DEFAULT_TRANSITION`]. So `PulseRequest::new()`
/// is a symmetric 0.5 s / 0.5 s / 0.5 s / 0.5 s breathe.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PulseRequest {
    transition_on: Option<f64>,
    on: Option<f64>,
    transition_off: Option<f64>,
    off: Option<f64>,
}

impl PulseRequest {
    pub const DEFAULT_TRANSITION: f64 = 0.5;

    pub fn new() -> Self {
        Self::default()
    }

    /// All four durations given explicitly.
    pub fn full(transition_on: f64, on: f64, transition_off: f64, off: f64) -> Self {
        Self {
            transition_on: Some(transition_on),
            on: Some(on),
            transition_off: Some(transition_off),
            off: Some(off),
        }
    }

    #[must_use]
    pub fn transition_on(mut self, secs: f64) -> Self {
        self.transition_on = Some(secs);
        self
    }

    #[must_use]
    pub fn on(mut self, secs: f64) -> Self {
        self.on = Some(secs);
        self
    }

    #[must_use]
    pub fn transition_off(mut self, secs: f64) -> Self {
        self.transition_off = Some(secs);
        self
    }

    #[must_use]
    pub fn off(mut self, secs: f64) -> Self {
        self.off = Some(secs);
        self
    }

    pub fn resolve(&self) -> PulseProfile {
        let t_on = self.transition_on.unwrap_or(Self::DEFAULT_TRANSITION);
        PulseProfile {
            transition_on: t_on,
            on: self.on.unwrap_or(t_on),
            transition_off: self.transition_off.unwrap_or(t_on),
            off: self.off.unwrap_or(t_on),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Scheduler
// ───────────────────────────────────────────────────────────────

/// Drives a pin's PWM duty along a [`PulseProfile`] on a worker thread.
pub struct PulseScheduler<P: HardwarePin + 'static> {
    pin: SharedPin<P>,
    fps: u32,
    stack_kb: usize,
    label: String,
    task: Option<BackgroundTask>,
    profile: Option<PulseProfile>,
}

impl<P: HardwarePin + 'static> PulseScheduler<P> {
    pub fn new(pin: SharedPin<P>, timing: &OutputTiming, label: impl Into<String>) -> Self {
        Self {
            pin,
            fps: timing.pulse_fps.max(1),
            stack_kb: timing.worker_stack_kb,
            label: label.into(),
            task: None,
            profile: None,
        }
    }

    /// Start pulsing. Any previous pulse is stopped first.
    ///
    /// The pin's PWM must already be running; only the duty is changed.
    pub fn start(&mut self, profile: PulseProfile) -> Result<()> {
        profile.validate()?;
        self.stop();

        let pin = Arc::clone(&self.pin);
        let tick = Duration::from_secs_f64(1.0 / f64::from(self.fps));
        let started = Instant::now();
        let label = self.label.clone();

        let mut task = BackgroundTask::once(format!("pulse-{}", self.label), move |token| {
            trace!("{}: pulse loop running", label);
            let mut failure = None;
            while !token.is_cancelled() {
                let duty = profile.duty_at(started.elapsed().as_secs_f64());
                if let Err(e) = lock(&pin).change_duty_cycle(f32::from(duty)) {
                    failure = Some(e);
                    break;
                }
                if !token.sleep(tick) {
                    break;
                }
            }
            // Leave the line dark however the loop ended.
            if let Err(e) = lock(&pin).change_duty_cycle(0.0) {
                warn!("{}: zeroing duty failed: {}", label, e);
            }
            match failure {
                Some(e) => Err(e.into()),
                None => Ok(()),
            }
        })
        .with_stack_kb(self.stack_kb);
        task.start()?;

        debug!(
            "{}: pulsing {:.2}/{:.2}/{:.2}/{:.2}s at {} fps",
            self.label, profile.transition_on, profile.on, profile.transition_off, profile.off, self.fps
        );
        self.task = Some(task);
        self.profile = Some(profile);
        Ok(())
    }

    /// Cancel and join the pulse worker. Idempotent.
    pub fn stop(&mut self) {
        if let Some(mut task) = self.task.take() {
            task.stop();
        }
        self.profile = None;
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(BackgroundTask::is_running)
    }

    /// Profile of the current pulse, if one was started and not stopped.
    pub fn profile(&self) -> Option<PulseProfile> {
        self.profile
    }
}
