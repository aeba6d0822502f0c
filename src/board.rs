//! Board context: every component of one Explorer HAT, built once.
//!
//! ```text
//! ┌──────────────────────────── Board ────────────────────────────┐
//! │ light   blue yellow(amber) red green     TimedOutput × 4      │
//! │ output  one two three four               TimedOutput × 4      │
//! │ input   one two three four               DebouncedInput × 4   │
//! │ touch   one … eight                      TouchChannel × 8     │
//! │ motor   one two                (Pro)     Motor × 2            │
//! │ analog  one two three four     (Pro)     AnalogInput × 4      │
//! │ tasks                                    TaskRegistry         │
//! │ run_loop                                 RunLoop              │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! The Pro variant is detected by the presence of an ADC.
//!
//! ## Shutdown order
//!
//! 1. stop every light/output effect and analog watcher
//! 2. clear input edge subscriptions
//! 3. stop all user tasks and pending timeouts
//! 4. stop motors (both bridge lines LOW)
//! 5. release light and output lines (PWM stopped, driven LOW)
//! 6. release anyone parked in the run loop
//!
//! Each step is attempted regardless of failures in earlier ones; failures
//! are logged. `Drop` runs the sequence if `shutdown()` was not called.

use std::sync::Arc;

use log::{error, info, warn};

use crate::app::ports::{AnalogSource, HardwarePin, PinProvider, TouchSensor};
use crate::collection::Collection;
use crate::config::BoardConfig;
use crate::drivers::analog::AnalogInput;
use crate::drivers::input::DebouncedInput;
use crate::drivers::motor::Motor;
use crate::drivers::output::TimedOutput;
use crate::drivers::touch::TouchChannel;
use crate::error::{Error, Result};
use crate::pins;
use crate::runloop::RunLoop;
use crate::scheduler::TaskRegistry;

const NUMBER_NAMES: [&str; 8] = ["one", "two", "three", "four", "five", "six", "seven", "eight"];

pub struct Board<P: HardwarePin + 'static> {
    config: BoardConfig,
    touch_chip: Arc<dyn TouchSensor>,
    is_pro: bool,
    shut_down: bool,

    pub light: Collection<TimedOutput<P>>,
    pub output: Collection<TimedOutput<P>>,
    pub input: Collection<DebouncedInput<P>>,
    pub touch: Collection<TouchChannel>,
    pub motor: Collection<Motor<P>>,
    pub analog: Collection<AnalogInput>,
    pub tasks: TaskRegistry,
    run_loop: RunLoop,
}

impl<P: HardwarePin + 'static> Board<P> {
    /// Claim every line from `io` and bind every touch pad.
    ///
    /// Fails if the configuration is invalid, the touch controller does not
    /// report the expected product ID, or a line cannot be claimed.
    pub fn new<IO>(
        io: &mut IO,
        touch_chip: Arc<dyn TouchSensor>,
        adc: Option<Arc<dyn AnalogSource>>,
        config: BoardConfig,
    ) -> Result<Self>
    where
        IO: PinProvider<Pin = P>,
    {
        config.validate()?;

        let product_id = touch_chip.product_id()?;
        if product_id != config.touch_product_id {
            error!(
                "Board: touch controller product id {:#04x}, expected {:#04x}",
                product_id, config.touch_product_id
            );
            return Err(Error::Config("Explorer HAT not found"));
        }

        let timing = config.output_timing();

        let mut light = Collection::new();
        for (name, gpio) in [
            ("blue", pins::LED1_GPIO),
            ("yellow", pins::LED2_GPIO),
            ("red", pins::LED3_GPIO),
            ("green", pins::LED4_GPIO),
        ] {
            light.add(name, TimedOutput::new(name, io.claim(gpio)?, timing))?;
        }
        light.alias("amber", "yellow")?;

        let mut output = Collection::new();
        for (name, gpio) in NUMBER_NAMES.into_iter().zip([
            pins::OUT1_GPIO,
            pins::OUT2_GPIO,
            pins::OUT3_GPIO,
            pins::OUT4_GPIO,
        ]) {
            output.add(name, TimedOutput::new(name, io.claim(gpio)?, timing))?;
        }

        let mut input = Collection::new();
        for (name, gpio) in NUMBER_NAMES.into_iter().zip([
            pins::IN1_GPIO,
            pins::IN2_GPIO,
            pins::IN3_GPIO,
            pins::IN4_GPIO,
        ]) {
            let line = DebouncedInput::new(name, io.claim(gpio)?)?.with_debounce_ms(config.debounce_ms);
            input.add(name, line)?;
        }

        let mut touch = Collection::new();
        for (name, (channel, alias)) in NUMBER_NAMES.into_iter().zip(pins::TOUCH_CHANNELS) {
            touch.add(name, TouchChannel::new(touch_chip.as_ref(), channel, alias)?)?;
        }

        let mut motor = Collection::new();
        let mut analog = Collection::new();
        let is_pro = adc.is_some();
        if let Some(adc) = adc {
            for (name, fw, bw) in [
                ("one", pins::M1_FORWARD_GPIO, pins::M1_BACKWARD_GPIO),
                ("two", pins::M2_FORWARD_GPIO, pins::M2_BACKWARD_GPIO),
            ] {
                let m = Motor::new(
                    name,
                    io.claim(fw)?,
                    io.claim(bw)?,
                    config.motor_pwm_frequency_hz,
                    config.motor_switch_delay_ms,
                )?;
                motor.add(name, m)?;
            }
            for ((name, channel), alias) in NUMBER_NAMES.into_iter().zip(pins::ANALOG_CHANNELS).zip(1..) {
                let a = AnalogInput::new(
                    channel,
                    alias,
                    Arc::clone(&adc),
                    config.analog_poll_ms,
                    config.analog_sensitivity,
                )
                .with_stack_kb(config.worker_stack_kb);
                analog.add(name, a)?;
            }
            info!("Board: Explorer HAT Pro detected");
        } else {
            info!("Board: Explorer HAT detected (no ADC)");
        }

        Ok(Self {
            tasks: TaskRegistry::new(config.worker_stack_kb),
            config,
            touch_chip,
            is_pro,
            shut_down: false,
            light,
            output,
            input,
            touch,
            motor,
            analog,
            run_loop: RunLoop::new(),
        })
    }

    pub fn is_pro(&self) -> bool {
        self.is_pro
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// Handle onto the board's run loop; clones share state.
    pub fn run_loop(&self) -> RunLoop {
        self.run_loop.clone()
    }

    /// Let several touch pads report at once.
    pub fn enable_multitouch(&self, enable: bool) -> Result<()> {
        self.touch_chip.enable_multitouch(enable)?;
        Ok(())
    }

    /// Stop everything in order and leave the hardware quiescent.
    /// Idempotent.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        info!("Board: shutting down");

        info!("Board: stopping effects");
        for out in self.light.iter_mut().chain(self.output.iter_mut()) {
            out.stop();
        }
        for a in self.analog.iter_mut() {
            a.stop();
        }

        for input in self.input.iter() {
            if let Err(e) = input.clear_events() {
                warn!("Board: clearing input '{}' failed: {}", input.name(), e);
            }
        }

        info!("Board: stopping user tasks");
        self.tasks.stop_all();

        for m in self.motor.iter_mut() {
            if let Err(e) = m.stop() {
                warn!("Board: stopping motor '{}' failed: {}", m.name(), e);
            }
        }

        info!("Board: releasing output lines");
        for out in self.light.iter_mut().chain(self.output.iter_mut()) {
            if let Err(e) = out.release() {
                warn!("Board: releasing '{}' failed: {}", out.name(), e);
            }
        }

        self.run_loop.stop();
        info!("Board: shutdown complete");
    }
}

impl<P: HardwarePin + 'static> Drop for Board<P> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
