//! Test rig and extra fakes for integration tests.
//!
//! `Rig` builds a board on the simulation backend and keeps the backend
//! handles around so tests can drive inputs and inspect outputs.
//! `FlakyPin` fails on demand to exercise error paths.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use explorerhat::adapters::sim::{SimAdc, SimBoardIo, SimPin, SimPinProbe, SimTouchChip};
use explorerhat::app::ports::{AnalogSource, EdgeCallback, HardwarePin, TouchSensor};
use explorerhat::{Board, BoardConfig, Level, PinError};

// ── Rig ───────────────────────────────────────────────────────

pub struct Rig {
    pub board: Board<SimPin>,
    pub io: SimBoardIo,
    pub chip: Arc<SimTouchChip>,
    pub adc: Option<Arc<SimAdc>>,
}

#[allow(dead_code)]
impl Rig {
    pub fn basic() -> Self {
        Self::build(false, BoardConfig::default())
    }

    pub fn pro() -> Self {
        Self::build(true, BoardConfig::default())
    }

    pub fn build(pro: bool, config: BoardConfig) -> Self {
        let mut io = SimBoardIo::new();
        let chip = Arc::new(SimTouchChip::new(config.touch_product_id));
        let adc = pro.then(|| Arc::new(SimAdc::new()));
        let board = Board::new(
            &mut io,
            Arc::clone(&chip) as Arc<dyn TouchSensor>,
            adc.as_ref().map(|a| Arc::clone(a) as Arc<dyn AnalogSource>),
            config,
        )
        .expect("board construction");
        Self {
            board,
            io,
            chip,
            adc,
        }
    }

    pub fn probe(&self, gpio: u8) -> SimPinProbe {
        self.io.probe(gpio).expect("line claimed by board")
    }
}

/// Poll `f` until it holds or `timeout_ms` passes.
pub fn wait_until(timeout_ms: u64, mut f: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < Duration::from_millis(timeout_ms) {
        if f() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    f()
}

// ── FlakyPin ──────────────────────────────────────────────────

/// A line whose PWM calls fail while `broken` is set, or for the next
/// `faults` calls.
pub struct FlakyPin {
    inner: SimPin,
    pub broken: Arc<AtomicBool>,
    faults: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl FlakyPin {
    pub fn new(gpio: u8) -> (Self, SimPinProbe, Arc<AtomicBool>) {
        let (inner, probe) = SimPin::new(gpio);
        let broken = Arc::new(AtomicBool::new(false));
        (
            Self {
                inner,
                broken: Arc::clone(&broken),
                faults: Arc::new(AtomicUsize::new(0)),
            },
            probe,
            broken,
        )
    }

    /// Counter of PWM calls still to fail; shared with the pin.
    pub fn faults(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.faults)
    }

    fn check(&self) -> Result<(), PinError> {
        let pending = self
            .faults
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if pending || self.broken.load(Ordering::SeqCst) {
            Err(PinError::PwmFailed)
        } else {
            Ok(())
        }
    }
}

impl HardwarePin for FlakyPin {
    fn read(&mut self) -> Result<Level, PinError> {
        self.inner.read()
    }

    fn write_digital(&mut self, level: Level) -> Result<(), PinError> {
        self.inner.write_digital(level)
    }

    fn set_pwm(&mut self, frequency_hz: f32, duty: f32) -> Result<(), PinError> {
        self.check()?;
        self.inner.set_pwm(frequency_hz, duty)
    }

    fn change_duty_cycle(&mut self, duty: f32) -> Result<(), PinError> {
        self.check()?;
        self.inner.change_duty_cycle(duty)
    }

    fn change_frequency(&mut self, frequency_hz: f32) -> Result<(), PinError> {
        self.check()?;
        self.inner.change_frequency(frequency_hz)
    }

    fn stop_pwm(&mut self) -> Result<(), PinError> {
        self.check()?;
        self.inner.stop_pwm()
    }

    fn subscribe_edge(&mut self, callback: EdgeCallback, debounce_ms: u32) -> Result<(), PinError> {
        self.inner.subscribe_edge(callback, debounce_ms)
    }

    fn unsubscribe_edge(&mut self) -> Result<(), PinError> {
        self.inner.unsubscribe_edge()
    }
}
