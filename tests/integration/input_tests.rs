//! Debounced input dispatch through board inputs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use explorerhat::adapters::sim::PinCall;
use explorerhat::pins;
use explorerhat::Level;

use crate::mock_hw::Rig;

#[test]
fn press_and_release_reach_their_slots() {
    let rig = Rig::basic();
    let probe = rig.probe(pins::IN1_GPIO);
    let log = Arc::new(Mutex::new(Vec::new()));
    let input = rig.board.input.get("one").unwrap();

    let (h, l, c) = (Arc::clone(&log), Arc::clone(&log), Arc::clone(&log));
    input.on_high(move |lvl| h.lock().unwrap().push(("high", lvl)), 0).unwrap();
    input.on_low(move |lvl| l.lock().unwrap().push(("low", lvl)), 0).unwrap();
    input.on_changed(move |lvl| c.lock().unwrap().push(("changed", lvl)), 0).unwrap();

    probe.set_input(Level::High);
    probe.set_input(Level::Low);

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            ("high", Level::High),
            ("changed", Level::High),
            ("low", Level::Low),
            ("changed", Level::Low),
        ]
    );
}

#[test]
fn edges_inside_debounce_window_are_dropped() {
    let rig = Rig::basic();
    let probe = rig.probe(pins::IN3_GPIO);
    let hits = Arc::new(AtomicUsize::new(0));
    let h = Arc::clone(&hits);
    rig.board
        .input
        .get("three")
        .unwrap()
        .on_changed(move |_| { h.fetch_add(1, Ordering::SeqCst); }, 50)
        .unwrap();

    probe.set_input(Level::High);
    probe.set_input(Level::Low);
    probe.raw_edge();
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    std::thread::sleep(Duration::from_millis(70));
    probe.set_input(Level::High);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[test]
fn first_debounce_interval_wins() {
    let rig = Rig::basic();
    let probe = rig.probe(pins::IN4_GPIO);
    let input = rig.board.input.get("four").unwrap();
    input.on_high(|_| {}, 5).unwrap();
    input.on_low(|_| {}, 500).unwrap();
    assert_eq!(
        probe.count(|c| matches!(c, PinCall::Subscribe { .. })),
        1
    );
    assert!(probe.calls().contains(&PinCall::Subscribe { debounce_ms: 5 }));
}

#[test]
fn callbacks_may_reenter_the_input() {
    let rig = Rig::basic();
    let probe = rig.probe(pins::IN2_GPIO);
    let input = rig.board.input.get("two").unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let h = Arc::clone(&hits);
    input.on_changed(move |_| { h.fetch_add(1, Ordering::SeqCst); }, 0).unwrap();

    // Register again from a different thread while edges arrive.
    std::thread::scope(|s| {
        s.spawn(|| {
            for _ in 0..20 {
                input.on_high(|_| {}, 0).unwrap();
            }
        });
        for i in 0..20 {
            probe.set_input(Level::from(i % 2 == 0));
        }
    });
    assert_eq!(hits.load(Ordering::SeqCst), 20);
}

#[test]
fn has_changed_reports_level_moves() {
    let rig = Rig::basic();
    let probe = rig.probe(pins::IN1_GPIO);
    let input = rig.board.input.get("one").unwrap();
    assert!(!input.has_changed().unwrap());
    probe.set_input(Level::High);
    assert!(input.has_changed().unwrap());
    assert!(input.is_high().unwrap());
    assert!(!input.has_changed().unwrap());
}
