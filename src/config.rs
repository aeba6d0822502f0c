//! Board configuration parameters
//!
//! Every timing constant the effects engine, input dispatch and motor
//! drivers depend on. Defaults match the Explorer HAT reference behaviour;
//! an application may override them from a JSON document.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Core board configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    // --- Pulse / fade effects ---
    /// Pulse scheduler refresh rate (ticks per second)
    pub pulse_fps: u32,
    /// PWM carrier frequency used while pulsing or fading (Hz)
    pub pulse_pwm_frequency_hz: f32,
    /// Fade sampling interval (milliseconds)
    pub fade_step_ms: u64,
    /// Delay between stopping PWM and driving the line HIGH (milliseconds)
    pub write_settle_ms: u64,

    // --- Inputs ---
    /// Default minimum gap between accepted input edges (milliseconds)
    pub debounce_ms: u32,

    // --- Motors ---
    /// Motor PWM frequency (Hz)
    pub motor_pwm_frequency_hz: f32,
    /// Delay after stopping PWM before moving it to the other line (milliseconds)
    pub motor_switch_delay_ms: u64,

    // --- Analog ---
    /// Analog watcher poll interval (milliseconds)
    pub analog_poll_ms: u64,
    /// Default change threshold for analog watchers (volts)
    pub analog_sensitivity: f32,

    // --- Workers ---
    /// Stack size for effect and user task threads (KiB)
    pub worker_stack_kb: usize,

    // --- Touch ---
    /// Expected product ID of the capacitive touch controller
    pub touch_product_id: u8,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            // Effects
            pulse_fps: 50,
            pulse_pwm_frequency_hz: 100.0,
            fade_step_ms: 100,
            write_settle_ms: 20,

            // Inputs
            debounce_ms: 20,

            // Motors
            motor_pwm_frequency_hz: 100.0,
            motor_switch_delay_ms: 5,

            // Analog
            analog_poll_ms: 10,
            analog_sensitivity: 0.1,

            // Workers
            worker_stack_kb: 256,

            // Touch (CAP1208)
            touch_product_id: 107,
        }
    }
}

impl BoardConfig {
    /// Parse a JSON document; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|_| Error::Config("malformed JSON"))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would stall or spin the worker threads.
    pub fn validate(&self) -> Result<()> {
        if self.pulse_fps == 0 || self.pulse_fps > 1000 {
            return Err(Error::Config("pulse_fps must be 1..=1000"));
        }
        if self.pulse_pwm_frequency_hz.is_nan() || self.pulse_pwm_frequency_hz <= 0.0 {
            return Err(Error::Config("pulse_pwm_frequency_hz must be positive"));
        }
        if self.motor_pwm_frequency_hz.is_nan() || self.motor_pwm_frequency_hz <= 0.0 {
            return Err(Error::Config("motor_pwm_frequency_hz must be positive"));
        }
        if self.fade_step_ms == 0 {
            return Err(Error::Config("fade_step_ms must be non-zero"));
        }
        if self.analog_poll_ms == 0 {
            return Err(Error::Config("analog_poll_ms must be non-zero"));
        }
        if self.analog_sensitivity.is_nan() || self.analog_sensitivity < 0.0 {
            return Err(Error::Config("analog_sensitivity must be non-negative"));
        }
        if self.worker_stack_kb < 16 {
            return Err(Error::Config("worker_stack_kb must be at least 16"));
        }
        Ok(())
    }

    /// Timing subset handed to each output.
    pub fn output_timing(&self) -> OutputTiming {
        OutputTiming {
            pulse_fps: self.pulse_fps,
            pulse_pwm_frequency_hz: self.pulse_pwm_frequency_hz,
            fade_step_ms: self.fade_step_ms,
            write_settle_ms: self.write_settle_ms,
            worker_stack_kb: self.worker_stack_kb,
        }
    }
}

/// Per-output copy of the effect timing constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputTiming {
    pub pulse_fps: u32,
    pub pulse_pwm_frequency_hz: f32,
    pub fade_step_ms: u64,
    pub write_settle_ms: u64,
    pub worker_stack_kb: usize,
}

impl Default for OutputTiming {
    fn default() -> Self {
        BoardConfig::default().output_timing()
    }
}
