//! Debounced digital input with high / low / changed callbacks.
//!
//! ## Subscription lifecycle
//!
//! ```text
//!   Idle ──on_high / on_low / on_changed──▶ Subscribed
//!    ▲                                          │
//!    └───────────── clear_events() ─────────────┘
//! ```
//!
//! The three callback slots share one edge subscription on the line. It
//! is installed by the first registration; later registrations only fill
//! their slot, so the debounce interval passed first stays in force until
//! `clear_events()`.
//!
//! ## Dispatch
//!
//! Runs on whichever thread the backend delivers edges on:
//!
//! 1. read the line level
//! 2. drop the edge if it lands within `min_interval_ms` of the last
//!    accepted one (backends are asked to debounce too; this guards
//!    against ones that don't)
//! 3. HIGH → high callback, LOW → low callback
//! 4. changed callback, whatever the level
//!
//! Callbacks run without any driver lock held, so they may call back into
//! this input.

use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use log::{debug, trace, warn};

use super::worker::lock;
use crate::app::events::Level;
use crate::app::ports::HardwarePin;
use crate::error::Result;

/// Debounce used by [`DebouncedInput::pressed`] and friends unless the
/// board configures another.
pub const DEFAULT_DEBOUNCE_MS: u32 = 20;

/// Callback invoked with the level read at dispatch time.
pub type LevelHandler = Arc<dyn Fn(Level) + Send + Sync>;

#[derive(Default, Clone)]
struct Handlers {
    high: Option<LevelHandler>,
    low: Option<LevelHandler>,
    changed: Option<LevelHandler>,
}

/// Mutated only by the dispatch routine (and reset by `clear_events`).
#[derive(Debug, Clone, Copy, Default)]
struct DebounceState {
    last_level: Option<Level>,
    last_event: Option<Instant>,
    min_interval_ms: u32,
}

struct Inner<P> {
    name: String,
    pin: Mutex<P>,
    handlers: Mutex<Handlers>,
    debounce: Mutex<DebounceState>,
    subscribed: Mutex<bool>,
    /// Level seen by the last `has_changed()` call.
    polled: Mutex<Level>,
}

/// One input line with debounced edge callbacks.
pub struct DebouncedInput<P: HardwarePin + 'static> {
    inner: Arc<Inner<P>>,
    default_debounce_ms: u32,
}

impl<P: HardwarePin + 'static> DebouncedInput<P> {
    pub fn new(name: impl Into<String>, mut pin: P) -> Result<Self> {
        let initial = pin.read()?;
        Ok(Self {
            inner: Arc::new(Inner {
                name: name.into(),
                pin: Mutex::new(pin),
                handlers: Mutex::new(Handlers::default()),
                debounce: Mutex::new(DebounceState::default()),
                subscribed: Mutex::new(false),
                polled: Mutex::new(initial),
            }),
            default_debounce_ms: DEFAULT_DEBOUNCE_MS,
        })
    }

    #[must_use]
    pub fn with_debounce_ms(mut self, debounce_ms: u32) -> Self {
        self.default_debounce_ms = debounce_ms;
        self
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Call `callback` whenever the line settles HIGH.
    pub fn on_high<F>(&self, callback: F, debounce_ms: u32) -> Result<()>
    where
        F: Fn(Level) + Send + Sync + 'static,
    {
        lock(&self.inner.handlers).high = Some(Arc::new(callback));
        self.ensure_subscribed(debounce_ms)
    }

    /// Call `callback` whenever the line settles LOW.
    pub fn on_low<F>(&self, callback: F, debounce_ms: u32) -> Result<()>
    where
        F: Fn(Level) + Send + Sync + 'static,
    {
        lock(&self.inner.handlers).low = Some(Arc::new(callback));
        self.ensure_subscribed(debounce_ms)
    }

    /// Call `callback` on every accepted edge.
    pub fn on_changed<F>(&self, callback: F, debounce_ms: u32) -> Result<()>
    where
        F: Fn(Level) + Send + Sync + 'static,
    {
        lock(&self.inner.handlers).changed = Some(Arc::new(callback));
        self.ensure_subscribed(debounce_ms)
    }

    /// [`on_high`](Self::on_high) with the default debounce.
    pub fn pressed<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(Level) + Send + Sync + 'static,
    {
        self.on_high(callback, self.default_debounce_ms)
    }

    /// [`on_low`](Self::on_low) with the default debounce.
    pub fn released<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(Level) + Send + Sync + 'static,
    {
        self.on_low(callback, self.default_debounce_ms)
    }

    /// [`on_changed`](Self::on_changed) with the default debounce.
    pub fn changed<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(Level) + Send + Sync + 'static,
    {
        self.on_changed(callback, self.default_debounce_ms)
    }

    /// Drop every callback and remove the edge subscription.
    pub fn clear_events(&self) -> Result<()> {
        *lock(&self.inner.handlers) = Handlers::default();
        let mut subscribed = lock(&self.inner.subscribed);
        if *subscribed {
            lock(&self.inner.pin).unsubscribe_edge()?;
            *subscribed = false;
            *lock(&self.inner.debounce) = DebounceState::default();
            debug!("{}: edge subscription removed", self.inner.name);
        }
        Ok(())
    }

    pub fn is_subscribed(&self) -> bool {
        *lock(&self.inner.subscribed)
    }

    /// Install the shared edge subscription unless one is already active.
    fn ensure_subscribed(&self, debounce_ms: u32) -> Result<()> {
        let mut subscribed = lock(&self.inner.subscribed);
        if *subscribed {
            let active = lock(&self.inner.debounce).min_interval_ms;
            if active != debounce_ms {
                trace!(
                    "{}: keeping debounce {} ms (requested {} ms)",
                    self.inner.name, active, debounce_ms
                );
            }
            return Ok(());
        }

        // The backend holds the callback; a strong reference would keep
        // this input alive through its own pin.
        let weak: Weak<Inner<P>> = Arc::downgrade(&self.inner);
        let callback = Arc::new(move || {
            if let Some(inner) = weak.upgrade() {
                dispatch(&inner);
            }
        });

        lock(&self.inner.debounce).min_interval_ms = debounce_ms;
        lock(&self.inner.pin).subscribe_edge(callback, debounce_ms)?;
        *subscribed = true;
        debug!("{}: edge subscription installed ({} ms debounce)", self.inner.name, debounce_ms);
        Ok(())
    }

    // ── Reads ─────────────────────────────────────────────────

    pub fn read(&self) -> Result<Level> {
        Ok(lock(&self.inner.pin).read()?)
    }

    pub fn is_high(&self) -> Result<bool> {
        Ok(self.read()?.is_high())
    }

    pub fn is_low(&self) -> Result<bool> {
        Ok(self.read()?.is_low())
    }

    /// `true` if the level differs from the one seen by the previous call
    /// (or by construction, for the first call).
    pub fn has_changed(&self) -> Result<bool> {
        let level = self.read()?;
        let mut polled = lock(&self.inner.polled);
        let changed = *polled != level;
        *polled = level;
        Ok(changed)
    }
}

impl<P: HardwarePin + 'static> Drop for DebouncedInput<P> {
    fn drop(&mut self) {
        if let Err(e) = self.clear_events() {
            warn!("{}: clearing events on drop failed: {}", self.inner.name, e);
        }
    }
}

fn dispatch<P: HardwarePin>(inner: &Inner<P>) {
    let level = match lock(&inner.pin).read() {
        Ok(level) => level,
        Err(e) => {
            warn!("{}: edge dropped, read failed: {}", inner.name, e);
            return;
        }
    };

    {
        let mut state = lock(&inner.debounce);
        let now = Instant::now();
        let window = Duration::from_millis(u64::from(state.min_interval_ms));
        if state.last_event.is_some_and(|last| now.duration_since(last) < window) {
            trace!("{}: bouncing edge dropped", inner.name);
            return;
        }
        trace!("{}: edge {:?} -> {:?}", inner.name, state.last_level, level);
        state.last_event = Some(now);
        state.last_level = Some(level);
    }

    let handlers = lock(&inner.handlers).clone();
    let by_level = if level.is_high() { handlers.high } else { handlers.low };
    if let Some(cb) = by_level {
        cb(level);
    }
    if let Some(cb) = handlers.changed {
        cb(level);
    }
}
