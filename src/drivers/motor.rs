//! H-bridge motor channel (two PWM-capable lines).
//!
//! Speed is a signed percentage. Positive speeds run PWM on the forward
//! line with the backward line held LOW; negative speeds the reverse. The
//! PWM only ever runs on one line at a time: moving it to the other line
//! stops the old one and waits `switch_delay` first so the bridge never
//! sees both halves driven.
//!
//! On a stopped motor both lines are LOW and no PWM runs.

use std::time::Duration;

use log::debug;

use crate::app::events::Level;
use crate::app::ports::HardwarePin;
use crate::error::{MotorError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorState {
    Stopped,
    Running { speed: u8, dir: Direction },
}

pub struct Motor<P: HardwarePin> {
    name: String,
    forward: P,
    backward: P,
    pwm_frequency_hz: f32,
    switch_delay: Duration,
    /// Line currently carrying the PWM.
    active: Option<Direction>,
    speed: i16,
    inverted: bool,
}

impl<P: HardwarePin> Motor<P> {
    pub fn new(
        name: impl Into<String>,
        mut forward: P,
        mut backward: P,
        pwm_frequency_hz: f32,
        switch_delay_ms: u64,
    ) -> Result<Self> {
        forward.write_digital(Level::Low)?;
        backward.write_digital(Level::Low)?;
        Ok(Self {
            name: name.into(),
            forward,
            backward,
            pwm_frequency_hz,
            switch_delay: Duration::from_millis(switch_delay_ms),
            active: None,
            speed: 0,
            inverted: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Drive at `speed` percent (`-100..=100`, sign is direction).
    pub fn speed(&mut self, speed: i16) -> Result<i16> {
        if !(-100..=100).contains(&speed) {
            return Err(MotorError::SpeedOutOfRange(speed).into());
        }
        self.speed = speed;

        let duty = f32::from(speed.unsigned_abs());
        match speed.signum() {
            1 => {
                self.backward.write_digital(Level::Low)?;
                self.route_pwm(Direction::Forward, duty)?;
            }
            -1 => {
                self.forward.write_digital(Level::Low)?;
                self.route_pwm(Direction::Backward, duty)?;
            }
            _ => self.release_pwm()?,
        }
        debug!("{}: speed {}", self.name, speed);
        Ok(speed)
    }

    /// Drive forwards at `speed` percent (`0..=100`), honouring
    /// [`invert`](Self::invert).
    pub fn forwards(&mut self, speed: u8) -> Result<i16> {
        let speed = Self::unsigned_speed(speed)?;
        self.speed(if self.inverted { -speed } else { speed })
    }

    /// Drive backwards at `speed` percent (`0..=100`), honouring
    /// [`invert`](Self::invert).
    pub fn backwards(&mut self, speed: u8) -> Result<i16> {
        let speed = Self::unsigned_speed(speed)?;
        self.speed(if self.inverted { speed } else { -speed })
    }

    /// Swap which way is "forwards" and re-apply the current speed in the
    /// new sense. Returns the new inversion flag.
    pub fn invert(&mut self) -> Result<bool> {
        self.inverted = !self.inverted;
        self.speed(-self.speed)?;
        Ok(self.inverted)
    }

    pub fn stop(&mut self) -> Result<()> {
        self.speed(0).map(|_| ())
    }

    pub fn current_speed(&self) -> i16 {
        self.speed
    }

    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    pub fn state(&self) -> MotorState {
        match self.active {
            Some(dir) => MotorState::Running {
                speed: self.speed.unsigned_abs() as u8,
                dir,
            },
            None => MotorState::Stopped,
        }
    }

    fn unsigned_speed(speed: u8) -> Result<i16> {
        if speed > 100 {
            return Err(MotorError::SpeedOutOfRange(i16::from(speed)).into());
        }
        Ok(i16::from(speed))
    }

    fn line(&mut self, dir: Direction) -> &mut P {
        match dir {
            Direction::Forward => &mut self.forward,
            Direction::Backward => &mut self.backward,
        }
    }

    fn route_pwm(&mut self, dir: Direction, duty: f32) -> Result<()> {
        if self.active == Some(dir) {
            self.line(dir).change_duty_cycle(duty)?;
            return Ok(());
        }
        self.release_pwm()?;
        let frequency = self.pwm_frequency_hz;
        self.line(dir).set_pwm(frequency, duty)?;
        self.active = Some(dir);
        Ok(())
    }

    fn release_pwm(&mut self) -> Result<()> {
        if let Some(dir) = self.active.take() {
            let line = self.line(dir);
            line.stop_pwm()?;
            line.write_digital(Level::Low)?;
            std::thread::sleep(self.switch_delay);
        }
        Ok(())
    }
}
