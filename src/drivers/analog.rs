//! Analog input channel (Pro board ADC) with a change watcher.
//!
//! `changed()` starts, once, a background watcher that polls the channel
//! and reports readings that moved more than `sensitivity` volts since
//! the previous poll. Re-registering swaps the handler and sensitivity
//! without restarting the watcher.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, warn};

use super::task::{BackgroundTask, Step};
use super::worker::lock;
use crate::app::ports::AnalogSource;
use crate::error::Result;

/// Callback invoked with `(alias, volts)`.
pub type AnalogHandler = Arc<dyn Fn(u8, f32) + Send + Sync>;

struct Watch {
    handler: Option<AnalogHandler>,
    sensitivity: f32,
}

pub struct AnalogInput {
    channel: u8,
    alias: u8,
    source: Arc<dyn AnalogSource>,
    poll: Duration,
    stack_kb: usize,
    watch: Arc<Mutex<Watch>>,
    watcher: Option<BackgroundTask>,
}

impl AnalogInput {
    pub fn new(
        channel: u8,
        alias: u8,
        source: Arc<dyn AnalogSource>,
        poll_ms: u64,
        sensitivity: f32,
    ) -> Self {
        Self {
            channel,
            alias,
            source,
            poll: Duration::from_millis(poll_ms),
            stack_kb: super::worker::DEFAULT_STACK_KB,
            watch: Arc::new(Mutex::new(Watch {
                handler: None,
                sensitivity,
            })),
            watcher: None,
        }
    }

    #[must_use]
    pub fn with_stack_kb(mut self, stack_kb: usize) -> Self {
        self.stack_kb = stack_kb;
        self
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Current reading in volts.
    pub fn read(&self) -> Result<f32> {
        Ok(self.source.read(self.channel)?)
    }

    pub fn sensitivity(&self) -> f32 {
        lock(&self.watch).sensitivity
    }

    pub fn set_sensitivity(&self, sensitivity: f32) {
        lock(&self.watch).sensitivity = sensitivity;
    }

    /// Call `handler(alias, volts)` whenever the reading moves by more than
    /// the sensitivity. `sensitivity` replaces the current one if given.
    pub fn changed<F>(&mut self, handler: F, sensitivity: Option<f32>) -> Result<()>
    where
        F: Fn(u8, f32) + Send + Sync + 'static,
    {
        {
            let mut watch = lock(&self.watch);
            watch.handler = Some(Arc::new(handler));
            if let Some(s) = sensitivity {
                watch.sensitivity = s;
            }
        }
        if self.watcher.is_none() {
            self.start_watcher()?;
        }
        Ok(())
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.as_ref().is_some_and(BackgroundTask::is_running)
    }

    /// Stop the watcher. Idempotent.
    pub fn stop(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            watcher.stop();
        }
    }

    fn start_watcher(&mut self) -> Result<()> {
        let (source, channel, alias, poll) =
            (Arc::clone(&self.source), self.channel, self.alias, self.poll);
        let watch = Arc::clone(&self.watch);
        let mut last: Option<f32> = None;

        let mut task = BackgroundTask::new(format!("analog-{alias}"), move |token| {
            match source.read(channel) {
                Ok(value) => {
                    let (handler, sensitivity) = {
                        let w = lock(&watch);
                        (w.handler.clone(), w.sensitivity)
                    };
                    if let (Some(prev), Some(handler)) = (last, handler) {
                        if (value - prev).abs() > sensitivity {
                            handler(alias, value);
                        }
                    }
                    last = Some(value);
                }
                Err(e) => warn!("analog {}: read failed: {}", alias, e),
            }
            token.sleep(poll);
            Ok(Step::Continue)
        })
        .with_stack_kb(self.stack_kb);
        task.start()?;

        debug!("analog {}: watcher started ({:?} poll)", alias, poll);
        self.watcher = Some(task);
        Ok(())
    }
}

impl Drop for AnalogInput {
    fn drop(&mut self) {
        self.stop();
    }
}
