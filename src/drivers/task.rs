//! Cancellable background work on a dedicated thread.
//!
//! A [`BackgroundTask`] owns a body closure and runs it on its own named
//! worker thread, over and over, until either
//!
//! - [`BackgroundTask::stop`] cancels it, or
//! - the body returns [`Step::Done`] ("run once" / self-terminating), or
//! - the body returns an error, which is logged and ends the task.
//!
//! ## Lifecycle
//!
//! ```text
//!   new() ──▶ Stopped ──start()──▶ Running ──stop()──▶ Stopped
//!                ▲                    │
//!                └── Done / Err ──────┘   (thread exits, body handed back)
//! ```
//!
//! `stop()` blocks until the current iteration has returned and the thread
//! has been joined, so a `start()` issued right after can never overlap the
//! old thread. The body is handed back by the thread on exit, which is what
//! makes a stopped task restartable.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use log::{trace, warn};

use super::worker::{DEFAULT_STACK_KB, lock, spawn_worker};
use crate::error::TaskError;

/// What a task body wants to happen after the current invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Invoke the body again.
    Continue,
    /// Finish the task; the thread exits.
    Done,
}

/// Boxed task body.
pub type TaskBody = Box<dyn FnMut(&CancelToken) -> anyhow::Result<Step> + Send + 'static>;

// ───────────────────────────────────────────────────────────────
// Cancellation
// ───────────────────────────────────────────────────────────────

/// Cooperative cancellation flag with an interruptible sleep.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Default)]
struct CancelInner {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation and wake any sleeper.
    pub fn cancel(&self) {
        *lock(&self.inner.cancelled) = true;
        self.inner.wake.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *lock(&self.inner.cancelled)
    }

    /// Sleep for `duration` unless cancelled first.
    ///
    /// Returns `true` if the full duration elapsed, `false` if the sleep was
    /// cut short by cancellation.
    pub fn sleep(&self, duration: Duration) -> bool {
        let guard = lock(&self.inner.cancelled);
        let (guard, _) = self
            .inner
            .wake
            .wait_timeout_while(guard, duration, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        !*guard
    }
}

// ───────────────────────────────────────────────────────────────
// Background task
// ───────────────────────────────────────────────────────────────

pub struct BackgroundTask {
    name: String,
    stack_kb: usize,
    /// Present while no thread owns it.
    body: Option<TaskBody>,
    token: CancelToken,
    handle: Option<JoinHandle<TaskBody>>,
}

impl BackgroundTask {
    /// Create a stopped task that invokes `body` repeatedly once started.
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: FnMut(&CancelToken) -> anyhow::Result<Step> + Send + 'static,
    {
        Self {
            name: name.into(),
            stack_kb: DEFAULT_STACK_KB,
            body: Some(Box::new(body)),
            token: CancelToken::new(),
            handle: None,
        }
    }

    /// Create a stopped task whose body runs exactly once.
    pub fn once<F>(name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(&CancelToken) -> anyhow::Result<()> + Send + 'static,
    {
        let mut f = Some(f);
        Self::new(name, move |token| {
            if let Some(f) = f.take() {
                f(token)?;
            }
            Ok(Step::Done)
        })
    }

    pub fn with_stack_kb(mut self, stack_kb: usize) -> Self {
        self.stack_kb = stack_kb;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Spawn the worker thread and return immediately.
    pub fn start(&mut self) -> Result<(), TaskError> {
        if self.is_running() {
            return Err(TaskError::AlreadyRunning);
        }
        self.reap();

        let mut body = self.body.take().ok_or(TaskError::BodyLost)?;
        let token = CancelToken::new();
        self.token = token.clone();

        let name = self.name.clone();
        let handle = spawn_worker(&self.name, self.stack_kb, move || {
            run_body(&name, &mut body, &token);
            body
        })?;

        trace!("task '{}' started", self.name);
        self.handle = Some(handle);
        Ok(())
    }

    /// Cancel and join. No-op on a stopped task.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.token.cancel();

        if handle.thread().id() == std::thread::current().id() {
            // Called from inside our own body: joining would deadlock. The
            // cancel flag ends the loop once the body returns.
            warn!("task '{}' stopped from its own thread; not joined", self.name);
            return;
        }

        match handle.join() {
            Ok(body) => {
                self.body = Some(body);
                trace!("task '{}' stopped", self.name);
            }
            Err(_) => warn!("task '{}' panicked; it cannot be restarted", self.name),
        }
    }

    /// `true` while the worker thread is alive.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Join a thread that already exited on its own and recover the body.
    fn reap(&mut self) {
        if self.handle.as_ref().is_some_and(JoinHandle::is_finished) {
            self.stop();
        }
    }
}

impl Drop for BackgroundTask {
    fn drop(&mut self) {
        self.stop();
    }
}

impl core::fmt::Debug for BackgroundTask {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BackgroundTask")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

fn run_body(name: &str, body: &mut TaskBody, token: &CancelToken) {
    while !token.is_cancelled() {
        match body(token) {
            Ok(Step::Continue) => {}
            Ok(Step::Done) => {
                trace!("task '{}' finished", name);
                break;
            }
            Err(e) => {
                warn!("task '{}' terminated by error: {:#}", name, e);
                break;
            }
        }
    }
}
