//! `embedded-hal` 1.0 backed output line.
//!
//! [`HalPin`] pairs a digital handle (`InputPin + OutputPin`) with a PWM
//! channel (`SetDutyCycle`) for the same physical line, which is how most
//! HALs split the two roles. embedded-hal has no frequency trait, so a
//! frequency setter may be supplied by the platform; without one the PWM
//! runs at whatever frequency the channel was configured with and
//! `change_frequency` reports [`PinError::Unsupported`].
//!
//! Edge detection is outside embedded-hal's blocking traits; inputs that
//! need callbacks use a backend with interrupt support.

use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::pwm::SetDutyCycle;
use log::trace;

use crate::app::events::Level;
use crate::app::ports::{EdgeCallback, HardwarePin};
use crate::error::PinError;

/// Platform hook that retunes the PWM timer feeding this line.
pub type FrequencySetter = Box<dyn FnMut(f32) -> Result<(), PinError> + Send>;

pub struct HalPin<IO, PWM> {
    io: IO,
    pwm: PWM,
    set_frequency: Option<FrequencySetter>,
}

impl<IO, PWM> HalPin<IO, PWM>
where
    IO: InputPin + OutputPin + Send,
    PWM: SetDutyCycle + Send,
{
    pub fn new(io: IO, pwm: PWM) -> Self {
        Self {
            io,
            pwm,
            set_frequency: None,
        }
    }

    #[must_use]
    pub fn with_frequency_setter(mut self, setter: FrequencySetter) -> Self {
        self.set_frequency = Some(setter);
        self
    }

    pub fn release(self) -> (IO, PWM) {
        (self.io, self.pwm)
    }

    fn apply_duty(&mut self, duty: f32) -> Result<(), PinError> {
        // Clamped to 0..=100 first.
        let percent = duty.round().clamp(0.0, 100.0) as u8;
        self.pwm
            .set_duty_cycle_percent(percent)
            .map_err(|_| PinError::PwmFailed)
    }
}

impl<IO, PWM> HardwarePin for HalPin<IO, PWM>
where
    IO: InputPin + OutputPin + Send,
    PWM: SetDutyCycle + Send,
{
    fn read(&mut self) -> Result<Level, PinError> {
        self.io
            .is_high()
            .map(Level::from)
            .map_err(|_| PinError::ReadFailed)
    }

    fn write_digital(&mut self, level: Level) -> Result<(), PinError> {
        let result = match level {
            Level::High => self.io.set_high(),
            Level::Low => self.io.set_low(),
        };
        result.map_err(|_| PinError::WriteFailed)
    }

    fn set_pwm(&mut self, frequency_hz: f32, duty: f32) -> Result<(), PinError> {
        match self.set_frequency.as_mut() {
            Some(set) => set(frequency_hz)?,
            None => trace!("hal pin: fixed PWM frequency, {} Hz ignored", frequency_hz),
        }
        self.apply_duty(duty)
    }

    fn change_duty_cycle(&mut self, duty: f32) -> Result<(), PinError> {
        self.apply_duty(duty)
    }

    fn change_frequency(&mut self, frequency_hz: f32) -> Result<(), PinError> {
        let set = self.set_frequency.as_mut().ok_or(PinError::Unsupported)?;
        set(frequency_hz)
    }

    fn stop_pwm(&mut self) -> Result<(), PinError> {
        self.pwm
            .set_duty_cycle_fully_off()
            .map_err(|_| PinError::PwmFailed)
    }

    fn subscribe_edge(&mut self, _callback: EdgeCallback, _debounce_ms: u32) -> Result<(), PinError> {
        Err(PinError::Unsupported)
    }

    fn unsubscribe_edge(&mut self) -> Result<(), PinError> {
        Ok(())
    }
}
