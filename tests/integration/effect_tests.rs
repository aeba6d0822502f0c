//! Output effects driven end to end through the board.

use std::sync::atomic::Ordering;
use std::time::Duration;

use explorerhat::adapters::sim::PinCall;
use explorerhat::config::OutputTiming;
use explorerhat::pins;
use explorerhat::{BoardConfig, EffectState, Error, Level, PinError, PulseRequest, TimedOutput};

use crate::mock_hw::{FlakyPin, Rig, wait_until};

#[test]
fn pulse_ramps_duty_up_and_down() {
    let mut rig = Rig::basic();
    let probe = rig.probe(pins::LED3_GPIO);
    let red = rig.board.light.get_mut("red").unwrap();
    red.pulse(PulseRequest::full(0.1, 0.05, 0.1, 0.05)).unwrap();

    std::thread::sleep(Duration::from_millis(350));
    red.stop();

    let duties: Vec<f32> = probe
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            PinCall::ChangeDutyCycle(d) => Some(d),
            _ => None,
        })
        .collect();
    assert!(duties.len() >= 10, "expected ~17 ticks, got {}", duties.len());
    assert!(duties.iter().all(|d| (0.0..=100.0).contains(d)));
    assert!(duties.iter().any(|d| *d > 0.0 && *d < 100.0), "no intermediate duty in {duties:?}");
    assert!(duties.contains(&100.0));
    assert_eq!(duties.last(), Some(&0.0));
}

#[test]
fn only_one_worker_owns_the_line() {
    let mut rig = Rig::basic();
    let probe = rig.probe(pins::OUT1_GPIO);
    let out = rig.board.output.get_mut("one").unwrap();

    out.pulse(PulseRequest::new().transition_on(0.1)).unwrap();
    out.fade(0.0, 100.0, 1.0).unwrap();
    out.pulse(PulseRequest::new().transition_on(0.1)).unwrap();
    out.stop();

    // Nothing writes the line once the last effect is stopped.
    let settled = probe.total_calls();
    std::thread::sleep(Duration::from_millis(60));
    assert_eq!(probe.total_calls(), settled);
}

#[test]
fn write_wins_over_running_pulse() {
    let mut rig = Rig::basic();
    let probe = rig.probe(pins::LED1_GPIO);
    let blue = rig.board.light.get_mut("blue").unwrap();
    blue.pulse(PulseRequest::new()).unwrap();
    std::thread::sleep(Duration::from_millis(30));

    assert_eq!(blue.on().unwrap(), Level::High);
    assert_eq!(blue.state(), EffectState::Writing(Level::High));
    assert_eq!(probe.level(), Level::High);
    assert!(!probe.pwm().running);

    std::thread::sleep(Duration::from_millis(40));
    assert_eq!(probe.calls().last(), Some(&PinCall::Write(Level::High)));
}

#[test]
fn settle_delay_only_after_pwm_effect() {
    let config = BoardConfig {
        write_settle_ms: 60,
        ..BoardConfig::default()
    };
    let mut rig = Rig::build(false, config);
    let probe = rig.probe(pins::OUT2_GPIO);
    let out = rig.board.output.get_mut("two").unwrap();

    let gap = |probe: &explorerhat::adapters::sim::SimPinProbe| {
        let calls = probe.timed_calls();
        let stop = calls.iter().rev().find(|(_, c)| *c == PinCall::StopPwm).unwrap().0;
        let write = calls.iter().rev().find(|(_, c)| matches!(c, PinCall::Write(_))).unwrap().0;
        write.duration_since(stop)
    };

    out.on().unwrap();
    out.off().unwrap();
    assert!(gap(&probe) < Duration::from_millis(60));

    out.blink(0.2, None).unwrap();
    out.off().unwrap();
    assert!(gap(&probe) < Duration::from_millis(60), "LOW never waits");

    out.blink(0.2, None).unwrap();
    out.on().unwrap();
    assert!(gap(&probe) >= Duration::from_millis(60));
}

#[test]
fn fade_settles_on_target() {
    let config = BoardConfig {
        fade_step_ms: 5,
        ..BoardConfig::default()
    };
    let mut rig = Rig::build(false, config);
    let probe = rig.probe(pins::LED4_GPIO);
    rig.board.light.get_mut("green").unwrap().fade(100.0, 0.0, 0.05).unwrap();

    assert!(wait_until(1000, || probe.calls().last() == Some(&PinCall::ChangeDutyCycle(0.0))));
    let duties: Vec<f32> = probe
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            PinCall::ChangeDutyCycle(d) => Some(d),
            _ => None,
        })
        .collect();
    assert!(duties.windows(2).all(|w| w[1] <= w[0]), "fade must not rise: {duties:?}");
}

#[test]
fn pwm_failure_surfaces_to_caller() {
    let (pin, probe, broken) = FlakyPin::new(6);
    let mut out = TimedOutput::new("one", pin, OutputTiming::default());
    broken.store(true, Ordering::SeqCst);

    assert_eq!(out.blink(1.0, None), Err(Error::Pin(PinError::PwmFailed)));
    assert_eq!(out.on(), Err(Error::Pin(PinError::PwmFailed)));
    assert!(probe.calls().is_empty());

    broken.store(false, Ordering::SeqCst);
    assert_eq!(out.on(), Ok(Level::High));
}

#[test]
fn pulse_worker_ends_quietly_on_hardware_error() {
    let (pin, probe, broken) = FlakyPin::new(6);
    let mut out = TimedOutput::new("one", pin, OutputTiming::default());
    out.pulse(PulseRequest::new().transition_on(0.1)).unwrap();
    std::thread::sleep(Duration::from_millis(30));

    broken.store(true, Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(60));
    let frozen = probe.total_calls();
    std::thread::sleep(Duration::from_millis(40));
    assert_eq!(probe.total_calls(), frozen);

    // The caller can still take the line back.
    broken.store(false, Ordering::SeqCst);
    out.off().unwrap();
}

#[test]
fn pulse_worker_zeroes_duty_after_a_failed_tick() {
    let (pin, probe, _) = FlakyPin::new(6);
    let faults = pin.faults();
    let mut out = TimedOutput::new("one", pin, OutputTiming::default());
    // A running blink owns the PWM, so the pulse only changes duty.
    out.blink(0.5, None).unwrap();
    probe.clear_calls();

    // The first duty change of the pulse loop is rejected.
    faults.store(1, Ordering::SeqCst);
    out.pulse(PulseRequest::new().transition_on(0.2)).unwrap();
    std::thread::sleep(Duration::from_millis(60));

    assert_eq!(probe.calls(), vec![PinCall::ChangeDutyCycle(0.0)]);
    assert_eq!(probe.pwm().duty, 0.0);
}
