//! Named user tasks and one-shot timeouts.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        TaskRegistry                          │
//! │                                                              │
//! │   register("blinker", body) ──▶ ┌──────────────┐  worker      │
//! │   stop("blinker")           ──▶ │ named tasks  │──threads     │
//! │                                 └──────────────┘              │
//! │   schedule_timeout(f, delay) ─▶ ┌──────────────┐  sleep, f(), │
//! │                                 │ timeouts     │──finish      │
//! │                                 └──────────────┘              │
//! │   stop_all()  ──▶ cancels and joins everything above         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Registering a name that is already taken stops the task that held it
//! before the new one starts, so a name always maps to at most one live
//! worker.

use std::collections::HashMap;
use std::time::Duration;

use log::{info, warn};

use crate::drivers::task::{BackgroundTask, CancelToken, Step};
use crate::drivers::worker::DEFAULT_STACK_KB;
use crate::error::{Result, TaskError};

// ═══════════════════════════════════════════════════════════════
//  Registry
// ═══════════════════════════════════════════════════════════════

pub struct TaskRegistry {
    tasks: HashMap<String, BackgroundTask>,
    timeouts: Vec<BackgroundTask>,
    stack_kb: usize,
    next_timeout: u32,
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_STACK_KB)
    }
}

impl TaskRegistry {
    pub fn new(stack_kb: usize) -> Self {
        Self {
            tasks: HashMap::new(),
            timeouts: Vec::new(),
            stack_kb,
            next_timeout: 0,
        }
    }

    /// Start `body` on its own worker under `name`. The body is invoked
    /// repeatedly until stopped or until it returns [`Step::Done`].
    pub fn register<F>(&mut self, name: &str, body: F) -> Result<()>
    where
        F: FnMut(&CancelToken) -> anyhow::Result<Step> + Send + 'static,
    {
        if let Some(mut previous) = self.tasks.remove(name) {
            warn!("Tasks: '{}' already registered, stopping previous", name);
            previous.stop();
        }

        let mut task = BackgroundTask::new(name, body).with_stack_kb(self.stack_kb);
        task.start()?;
        self.tasks.insert(name.to_owned(), task);
        info!("Tasks: started '{}'", name);
        Ok(())
    }

    /// Stop and forget the task registered under `name`.
    pub fn stop(&mut self, name: &str) -> Result<()> {
        let mut task = self.tasks.remove(name).ok_or(TaskError::NotFound)?;
        task.stop();
        info!("Tasks: stopped '{}'", name);
        Ok(())
    }

    /// Stop every registered task and pending timeout.
    pub fn stop_all(&mut self) {
        for (name, mut task) in self.tasks.drain() {
            info!("Tasks: stopping user task '{}'", name);
            task.stop();
        }
        let pending = self.timeouts.iter().filter(|t| t.is_running()).count();
        if pending > 0 {
            info!("Tasks: cancelling {} pending timeout(s)", pending);
        }
        for mut timeout in self.timeouts.drain(..) {
            timeout.stop();
        }
    }

    /// Call `f` once after `delay`, on a worker thread. Cancelled by
    /// [`stop_all`](Self::stop_all) if still waiting.
    pub fn schedule_timeout<F>(&mut self, f: F, delay: Duration) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.timeouts.retain(BackgroundTask::is_running);

        self.next_timeout = self.next_timeout.wrapping_add(1);
        let mut task = BackgroundTask::once(format!("timeout-{}", self.next_timeout), move |token| {
            if token.sleep(delay) {
                f();
            }
            Ok(())
        })
        .with_stack_kb(self.stack_kb);
        task.start()?;
        self.timeouts.push(task);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Registered tasks whose worker is still alive.
    pub fn active_count(&self) -> usize {
        self.tasks.values().filter(|t| t.is_running()).count()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }
}

impl Drop for TaskRegistry {
    fn drop(&mut self) {
        self.stop_all();
    }
}
