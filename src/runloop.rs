//! Main-thread run loop for scripts built on the board.
//!
//! `run(callback)` spins the callback until `stop()`; `pause()` parks the
//! caller until `stop()`. Both can be ended from any thread, including
//! from inside an input or touch callback, through a clone of the handle.

use std::sync::{Arc, Condvar, Mutex, PoisonError};

use log::debug;

use crate::drivers::worker::lock;

#[derive(Clone, Default)]
pub struct RunLoop {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl RunLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoke `callback` repeatedly until [`stop`](Self::stop) is called.
    pub fn run<F: FnMut()>(&self, mut callback: F) {
        self.set_running(true);
        debug!("run loop started");
        while self.is_running() {
            callback();
        }
        debug!("run loop finished");
    }

    /// Block until [`stop`](Self::stop) is called from another thread.
    pub fn pause(&self) {
        self.set_running(true);
        let (running, wake) = &*self.inner;
        let guard = lock(running);
        let _guard = wake
            .wait_while(guard, |running| *running)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// End `run()` after its current iteration and release `pause()`.
    pub fn stop(&self) {
        self.set_running(false);
        self.inner.1.notify_all();
    }

    pub fn is_running(&self) -> bool {
        *lock(&self.inner.0)
    }

    fn set_running(&self, value: bool) {
        *lock(&self.inner.0) = value;
    }
}
