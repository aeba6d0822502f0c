//! Timed output line: static levels, hardware-PWM blink, threaded
//! pulse and fade.
//!
//! ## Effect state machine
//!
//! ```text
//!             write/on/off/toggle
//!   ┌──────────────────────────────────────────────┐
//!   ▼                                              │
//!  Idle / Writing ──blink──▶ Blinking ──pulse──▶ Pulsing
//!   │      ▲                   │  ▲                 │
//!   │      └──── stop ─────────┘  └──── blink ──────┘
//!   └──fade──▶ Fading ──(duration elapsed)──▶ stays at `to`
//! ```
//!
//! Every transition runs the same teardown (cancel the fade worker, cancel
//! the pulse scheduler) before applying the new effect, so at most one
//! background task ever writes this line's PWM.
//!
//! | Effect   | Mechanism                          | Worker thread |
//! |----------|------------------------------------|---------------|
//! | Writing  | digital level, PWM stopped         | no            |
//! | Blinking | hardware PWM at `1 / (on + off)` Hz | no           |
//! | Pulsing  | 100 Hz PWM, duty set at 50 fps     | yes           |
//! | Fading   | 100 Hz PWM, duty set every 100 ms  | yes           |
//!
//! Blinking and Pulsing "own" the PWM: a following `blink` only retunes
//! it, and a following `write(High)` waits a settle delay after stopping
//! it before driving the line.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::{debug, trace};

use super::SharedPin;
use super::pulse::{PulseProfile, PulseRequest, PulseScheduler};
use super::task::{BackgroundTask, Step};
use super::worker::lock;
use crate::app::events::Level;
use crate::app::ports::HardwarePin;
use crate::config::OutputTiming;
use crate::error::Result;

/// The single active effect of a [`TimedOutput`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum EffectState {
    #[default]
    Idle,
    Writing(Level),
    Blinking { duty: f32, period: f64 },
    Pulsing(PulseProfile),
    Fading { from: f32, to: f32, duration: f64 },
}

impl EffectState {
    /// Blinking and Pulsing keep the hardware PWM running as an effect.
    pub fn owns_pwm(&self) -> bool {
        matches!(self, Self::Blinking { .. } | Self::Pulsing(_))
    }
}

/// One output line (buffered output or light) with timed effects.
pub struct TimedOutput<P: HardwarePin + 'static> {
    name: String,
    pin: SharedPin<P>,
    timing: OutputTiming,
    state: EffectState,
    pulse: PulseScheduler<P>,
    fade: Option<BackgroundTask>,
}

impl<P: HardwarePin + 'static> TimedOutput<P> {
    pub fn new(name: impl Into<String>, pin: P, timing: OutputTiming) -> Self {
        let name = name.into();
        let pin = Arc::new(Mutex::new(pin));
        let pulse = PulseScheduler::new(Arc::clone(&pin), &timing, name.clone());
        Self {
            name,
            pin,
            timing,
            state: EffectState::Idle,
            pulse,
            fade: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> EffectState {
        self.state
    }

    // ── Static levels ─────────────────────────────────────────

    /// Tear down any effect and drive the line to `level`.
    pub fn write(&mut self, level: Level) -> Result<Level> {
        let had_pwm_effect = self.state.owns_pwm();
        self.stop();

        {
            let mut pin = lock(&self.pin);
            pin.change_duty_cycle(100.0)?;
            pin.stop_pwm()?;
        }

        if had_pwm_effect && level.is_high() {
            // The PWM driver can swallow a HIGH written immediately after
            // it stops.
            std::thread::sleep(Duration::from_millis(self.timing.write_settle_ms));
        }

        lock(&self.pin).write_digital(level)?;
        self.state = EffectState::Writing(level);
        trace!("{}: write {:?}", self.name, level);
        Ok(level)
    }

    pub fn on(&mut self) -> Result<Level> {
        self.write(Level::High)
    }

    pub fn off(&mut self) -> Result<Level> {
        self.write(Level::Low)
    }

    /// Invert the line. A blinking or pulsing line is switched off.
    pub fn toggle(&mut self) -> Result<Level> {
        if self.state.owns_pwm() {
            return self.off();
        }
        let current = self.read()?;
        self.write(!current)
    }

    // ── Effects ───────────────────────────────────────────────

    /// Blink with `on` seconds lit and `off` seconds dark (`off` defaults
    /// to `on`). Uses hardware PWM only; no worker thread.
    pub fn blink(&mut self, on: f64, off: Option<f64>) -> Result<()> {
        let off = off.unwrap_or(on);
        let period = on + off;
        let (duty, frequency) = ((100.0 * on / period) as f32, (1.0 / period) as f32);

        let retune = self.state.owns_pwm();
        self.cancel_workers();

        {
            let mut pin = lock(&self.pin);
            if retune {
                pin.change_frequency(frequency)?;
                pin.change_duty_cycle(duty)?;
            } else {
                pin.set_pwm(frequency, duty)?;
            }
        }

        self.state = EffectState::Blinking { duty, period };
        debug!("{}: blink {:.3}s/{:.3}s ({:.1}% @ {:.3} Hz)", self.name, on, off, duty, frequency);
        Ok(())
    }

    /// Breathe along the four-phase profile described by `request`.
    ///
    /// A profile without ramps is a square wave and is handed to
    /// [`blink`](Self::blink) instead of starting a worker.
    pub fn pulse(&mut self, request: PulseRequest) -> Result<()> {
        let profile = request.resolve();
        profile.validate()?;
        let owned = self.state.owns_pwm();
        self.cancel_workers();

        if !owned {
            lock(&self.pin).set_pwm(self.timing.pulse_pwm_frequency_hz, 0.0)?;
            // The PWM is now running as an effect, whichever way we go.
            self.state = EffectState::Pulsing(profile);
        }

        if profile.is_square() {
            return self.blink(profile.on, Some(profile.off));
        }

        if let Err(e) = self.pulse.start(profile) {
            self.state = EffectState::Idle;
            return Err(e);
        }
        self.state = EffectState::Pulsing(profile);
        Ok(())
    }

    /// Ramp the duty linearly from `from` to `to` percent over `duration`
    /// seconds, then hold `to`.
    pub fn fade(&mut self, from: f32, to: f32, duration: f64) -> Result<()> {
        self.stop();
        lock(&self.pin).set_pwm(self.timing.pulse_pwm_frequency_hz, from)?;

        let pin = Arc::clone(&self.pin);
        let step = Duration::from_millis(self.timing.fade_step_ms);
        let started = Instant::now();

        let mut task = BackgroundTask::new(format!("fade-{}", self.name), move |token| {
            let elapsed = started.elapsed().as_secs_f64();
            if elapsed >= duration {
                lock(&pin).change_duty_cycle(to)?;
                return Ok(Step::Done);
            }
            let progress = elapsed / duration;
            let duty = (f64::from(from) + f64::from(to - from) * progress).round() as f32;
            lock(&pin).change_duty_cycle(duty)?;
            token.sleep(step);
            Ok(Step::Continue)
        })
        .with_stack_kb(self.timing.worker_stack_kb);
        task.start()?;

        self.fade = Some(task);
        self.state = EffectState::Fading { from, to, duration };
        debug!("{}: fade {}% -> {}% over {:.2}s", self.name, from, to, duration);
        Ok(())
    }

    /// Cancel any running effect. Idempotent; performs no pin writes.
    pub fn stop(&mut self) {
        self.cancel_workers();
        self.state = EffectState::Idle;
    }

    /// Cancel any effect, halt the PWM and drive the line LOW. Leaves the
    /// state Idle even if the pin rejects a call.
    pub fn release(&mut self) -> Result<()> {
        self.stop();
        let mut pin = lock(&self.pin);
        pin.stop_pwm()?;
        pin.write_digital(Level::Low)?;
        trace!("{}: released", self.name);
        Ok(())
    }

    fn cancel_workers(&mut self) {
        if let Some(mut fade) = self.fade.take() {
            fade.stop();
        }
        self.pulse.stop();
    }

    // ── Raw PWM ───────────────────────────────────────────────

    /// Start PWM directly. The effect state is left untouched.
    pub fn pwm(&mut self, frequency_hz: f32, duty: f32) -> Result<()> {
        lock(&self.pin).set_pwm(frequency_hz, duty)?;
        Ok(())
    }

    pub fn frequency(&mut self, frequency_hz: f32) -> Result<()> {
        lock(&self.pin).change_frequency(frequency_hz)?;
        Ok(())
    }

    pub fn duty_cycle(&mut self, duty: f32) -> Result<()> {
        lock(&self.pin).change_duty_cycle(duty)?;
        Ok(())
    }

    // ── Reads ─────────────────────────────────────────────────

    pub fn read(&self) -> Result<Level> {
        Ok(lock(&self.pin).read()?)
    }

    pub fn is_on(&self) -> Result<bool> {
        Ok(self.read()?.is_high())
    }

    pub fn is_off(&self) -> Result<bool> {
        Ok(self.read()?.is_low())
    }
}

impl<P: HardwarePin + 'static> Drop for TimedOutput<P> {
    fn drop(&mut self) {
        self.stop();
    }
}
