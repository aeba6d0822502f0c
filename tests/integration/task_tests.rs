//! User tasks, timeouts and the run loop.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use explorerhat::adapters::sim::{PinCall, SimPin};
use explorerhat::config::OutputTiming;
use explorerhat::{Error, RunLoop, Step, TaskError, TaskRegistry, TimedOutput};

use crate::mock_hw::{Rig, wait_until};

#[test]
fn user_task_drives_an_output() {
    let (pin, probe) = SimPin::new(12);
    let out = Arc::new(Mutex::new(TimedOutput::new("two", pin, OutputTiming::default())));
    let mut tasks = TaskRegistry::new(64);

    let o = Arc::clone(&out);
    tasks
        .register("flasher", move |token| {
            o.lock().unwrap().toggle()?;
            token.sleep(Duration::from_millis(5));
            Ok(Step::Continue)
        })
        .unwrap();

    assert!(wait_until(1000, || probe.count(|c| matches!(c, PinCall::Write(_))) >= 4));
    tasks.stop("flasher").unwrap();
    let frozen = probe.total_calls();
    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(probe.total_calls(), frozen);
}

#[test]
fn failing_task_is_logged_not_propagated() {
    let mut tasks = TaskRegistry::new(64);
    let runs = Arc::new(AtomicUsize::new(0));
    let r = Arc::clone(&runs);
    tasks
        .register("broken", move |_| {
            r.fetch_add(1, Ordering::SeqCst);
            Err(anyhow::anyhow!("sensor missing"))
        })
        .unwrap();

    assert!(wait_until(1000, || tasks.active_count() == 0));
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    // Still registered until stopped by name.
    assert!(tasks.contains("broken"));
    tasks.stop("broken").unwrap();
}

#[test]
fn run_once_task_finishes_by_itself() {
    let mut tasks = TaskRegistry::new(64);
    tasks.register("once", |_| Ok(Step::Done)).unwrap();
    assert!(wait_until(1000, || tasks.active_count() == 0));
}

#[test]
fn unknown_name_is_reported() {
    let mut tasks = TaskRegistry::new(64);
    assert_eq!(tasks.stop("ghost"), Err(Error::Task(TaskError::NotFound)));
}

#[test]
fn timeout_stops_run_loop() {
    let mut rig = Rig::basic();
    let run_loop = rig.board.run_loop();
    let rl = run_loop.clone();
    rig.board.tasks.schedule_timeout(move || rl.stop(), Duration::from_millis(30)).unwrap();

    let mut spins = 0u64;
    run_loop.run(|| {
        spins += 1;
        std::thread::sleep(Duration::from_millis(1));
    });
    assert!(spins > 0);
    assert!(!run_loop.is_running());
}

#[test]
fn run_loop_handles_are_shared() {
    let a = RunLoop::new();
    let b = a.clone();
    let worker = std::thread::spawn(move || {
        let mut n = 0;
        b.run(|| {
            n += 1;
            std::thread::sleep(Duration::from_millis(1));
        });
        n
    });
    assert!(wait_until(1000, || a.is_running()));
    a.stop();
    assert!(worker.join().unwrap() > 0);
}
