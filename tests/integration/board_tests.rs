//! Board bring-up, collections and ordered shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use explorerhat::drivers::motor::MotorState;
use explorerhat::pins;
use explorerhat::{BoardConfig, EffectState, Level, PulseRequest, Step, TouchEvent};

use crate::mock_hw::{Rig, wait_until};

#[test]
fn board_exposes_named_components() {
    let rig = Rig::basic();
    let names: Vec<&str> = rig.board.light.names().collect();
    assert_eq!(names, ["blue", "yellow", "red", "green", "amber"]);
    assert!(rig.board.output.get("four").is_some());
    assert!(rig.board.input.get("two").is_some());
    assert_eq!(rig.board.touch.get("five").map(|t| t.channel()), Some(0));
}

#[test]
fn touch_events_reach_board_pads() {
    let rig = Rig::basic();
    let presses = Arc::new(AtomicUsize::new(0));
    let p = Arc::clone(&presses);
    rig.board.touch.get("one").unwrap().pressed(move |alias, event| {
        assert_eq!((alias, event), (1, TouchEvent::Press));
        p.fetch_add(1, Ordering::SeqCst);
    });

    rig.chip.emit(4, TouchEvent::Press);
    assert!(rig.board.touch.get("one").unwrap().is_pressed());
    assert!(!rig.board.touch.get("two").unwrap().is_pressed());
    rig.chip.emit(4, TouchEvent::Release);
    assert!(!rig.board.touch.get("one").unwrap().is_pressed());
    assert_eq!(presses.load(Ordering::SeqCst), 1);
}

#[test]
fn multitouch_is_forwarded() {
    let rig = Rig::basic();
    rig.board.enable_multitouch(true).unwrap();
    assert!(rig.chip.multitouch_enabled());
}

#[test]
fn analog_watcher_through_board() {
    let config = BoardConfig {
        analog_poll_ms: 2,
        ..BoardConfig::default()
    };
    let mut rig = Rig::build(true, config);
    let adc = Arc::clone(rig.adc.as_ref().unwrap());
    let seen = Arc::new(AtomicUsize::new(0));
    let s = Arc::clone(&seen);
    rig.board
        .analog
        .get_mut("one")
        .unwrap()
        .changed(move |alias, _| {
            assert_eq!(alias, 1);
            s.fetch_add(1, Ordering::SeqCst);
        }, None)
        .unwrap();

    std::thread::sleep(Duration::from_millis(15));
    adc.set(3, 4.0);
    assert!(wait_until(1000, || seen.load(Ordering::SeqCst) >= 1));
}

#[test]
fn shutdown_stops_everything_in_order() {
    let mut rig = Rig::pro();
    let ticks = Arc::new(AtomicUsize::new(0));
    let t = Arc::clone(&ticks);

    rig.board.light.get_mut("red").unwrap().pulse(PulseRequest::new().transition_on(0.2)).unwrap();
    rig.board.output.get_mut("one").unwrap().blink(0.1, None).unwrap();
    rig.board.light.get_mut("green").unwrap().fade(0.0, 80.0, 0.01).unwrap();
    rig.board.output.get_mut("two").unwrap().on().unwrap();
    rig.board.input.get("one").unwrap().on_high(|_| {}, 20).unwrap();
    rig.board
        .tasks
        .register("ticker", move |token| {
            t.fetch_add(1, Ordering::SeqCst);
            token.sleep(Duration::from_millis(2));
            Ok(Step::Continue)
        })
        .unwrap();
    rig.board.motor.get_mut("one").unwrap().speed(50).unwrap();

    let run_loop = rig.board.run_loop();
    let parked = {
        let rl = run_loop.clone();
        std::thread::spawn(move || rl.pause())
    };
    assert!(wait_until(1000, || run_loop.is_running()));

    rig.board.shutdown();

    assert_eq!(rig.board.light.get("red").unwrap().state(), EffectState::Idle);
    assert_eq!(rig.board.output.get("one").unwrap().state(), EffectState::Idle);
    for gpio in [pins::OUT1_GPIO, pins::OUT2_GPIO, pins::LED3_GPIO, pins::LED4_GPIO] {
        let probe = rig.probe(gpio);
        assert!(!probe.pwm().running, "GPIO {gpio} left with PWM running");
        assert_eq!(probe.level(), Level::Low, "GPIO {gpio} left high");
    }
    assert!(!rig.probe(pins::IN1_GPIO).is_subscribed());
    assert_eq!(rig.board.tasks.active_count(), 0);
    assert_eq!(rig.board.motor.get("one").unwrap().state(), MotorState::Stopped);
    assert!(!rig.probe(pins::M1_FORWARD_GPIO).pwm().running);
    parked.join().unwrap();

    let frozen = ticks.load(Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(ticks.load(Ordering::SeqCst), frozen);

    // Second call is a no-op.
    rig.board.shutdown();
}

#[test]
fn shutdown_runs_past_failures() {
    let mut rig = Rig::pro();
    rig.board.input.get("two").unwrap().on_changed(|_| {}, 20).unwrap();
    rig.board.tasks.register("idle", |token| {
        token.sleep(Duration::from_millis(5));
        Ok(Step::Continue)
    })
    .unwrap();
    rig.board.motor.get_mut("two").unwrap().speed(-40).unwrap();

    rig.board.output.get_mut("two").unwrap().blink(0.2, None).unwrap();
    rig.board.output.get_mut("three").unwrap().blink(0.2, None).unwrap();

    // Unsubscribing input two and releasing output two will now fail.
    rig.probe(pins::IN2_GPIO).fail_writes(true);
    rig.probe(pins::OUT2_GPIO).fail_writes(true);
    rig.board.shutdown();

    assert!(!rig.probe(pins::OUT3_GPIO).pwm().running);
    assert_eq!(rig.board.tasks.active_count(), 0);
    assert_eq!(rig.board.motor.get("two").unwrap().state(), MotorState::Stopped);
}

#[test]
fn drop_shuts_the_board_down() {
    let rig = Rig::basic();
    let probe = rig.probe(pins::LED1_GPIO);
    let mut board = rig.board;
    board.light.get_mut("blue").unwrap().pulse(PulseRequest::new().transition_on(0.1)).unwrap();
    drop(board);

    let settled = probe.total_calls();
    std::thread::sleep(Duration::from_millis(40));
    assert_eq!(probe.total_calls(), settled);
    assert!(!probe.pwm().running);
    assert_eq!(probe.level(), Level::Low);
}
