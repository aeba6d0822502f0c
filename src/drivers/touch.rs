//! One pad of the capacitive touch grid.
//!
//! Each [`TouchChannel`] registers for every [`TouchEvent`] on its chip
//! channel and keeps `pressed` / `held` flags up to date:
//!
//! | Event            | pressed | held  |
//! |------------------|---------|-------|
//! | Press            | true    | kept  |
//! | Held             | kept    | true  |
//! | Release / None   | false   | false |
//!
//! After the flags are updated the user callback for that event, if any,
//! is invoked with `(alias, event)` on the chip's delivering thread.
//!
//! The chip has no way to unregister handlers. What it keeps holds only a
//! `Weak` reference to the channel state, so dropping a [`TouchChannel`]
//! frees its flags and user callbacks and leaves an inert closure behind.

use std::sync::{Arc, Mutex, Weak};

use log::trace;

use super::worker::lock;
use crate::app::events::TouchEvent;
use crate::app::ports::{TouchHandler, TouchSensor};
use crate::error::Result;

#[derive(Default)]
struct TouchChannelState {
    pressed: bool,
    held: bool,
    handlers: [Option<TouchHandler>; 4],
}

pub struct TouchChannel {
    channel: u8,
    alias: u8,
    state: Arc<Mutex<TouchChannelState>>,
}

impl TouchChannel {
    /// Bind to `channel` on `chip`. Callbacks report `alias` (the number
    /// printed next to the pad).
    pub fn new(chip: &dyn TouchSensor, channel: u8, alias: u8) -> Result<Self> {
        let state = Arc::new(Mutex::new(TouchChannelState::default()));
        for event in TouchEvent::ALL {
            let weak: Weak<Mutex<TouchChannelState>> = Arc::downgrade(&state);
            chip.on_event(
                channel,
                event,
                Arc::new(move |ch, ev| {
                    if ch != channel {
                        return;
                    }
                    if let Some(state) = weak.upgrade() {
                        handle(&state, alias, ev);
                    }
                }),
            )?;
        }
        Ok(Self {
            channel,
            alias,
            state,
        })
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn alias(&self) -> u8 {
        self.alias
    }

    pub fn is_pressed(&self) -> bool {
        lock(&self.state).pressed
    }

    pub fn is_held(&self) -> bool {
        lock(&self.state).held
    }

    pub fn pressed<F>(&self, handler: F)
    where
        F: Fn(u8, TouchEvent) + Send + Sync + 'static,
    {
        self.set_handler(TouchEvent::Press, Arc::new(handler));
    }

    pub fn released<F>(&self, handler: F)
    where
        F: Fn(u8, TouchEvent) + Send + Sync + 'static,
    {
        self.set_handler(TouchEvent::Release, Arc::new(handler));
    }

    pub fn held<F>(&self, handler: F)
    where
        F: Fn(u8, TouchEvent) + Send + Sync + 'static,
    {
        self.set_handler(TouchEvent::Held, Arc::new(handler));
    }

    fn set_handler(&self, event: TouchEvent, handler: TouchHandler) {
        lock(&self.state).handlers[event.index()] = Some(handler);
    }
}

fn handle(state: &Mutex<TouchChannelState>, alias: u8, event: TouchEvent) {
    let handler = {
        let mut s = lock(state);
        match event {
            TouchEvent::Press => s.pressed = true,
            TouchEvent::Held => s.held = true,
            TouchEvent::Release | TouchEvent::None => {
                s.pressed = false;
                s.held = false;
            }
        }
        s.handlers[event.index()].clone()
    };
    trace!("touch {}: {}", alias, event);
    if let Some(handler) = handler {
        handler(alias, event);
    }
}
