//! Explorer HAT library.
//!
//! Timed output effects (blink, pulse, fade), background user tasks and
//! debounced input / touch dispatch for the Explorer HAT and Explorer HAT
//! Pro. Hardware access goes through the port traits in [`app::ports`];
//! [`adapters::sim`] runs everything in memory.
//!
//! ```no_run
//! use std::sync::Arc;
//! use explorerhat::adapters::sim::{SimBoardIo, SimTouchChip};
//! use explorerhat::{Board, BoardConfig, PulseRequest};
//!
//! # fn main() -> explorerhat::Result<()> {
//! let mut io = SimBoardIo::new();
//! let mut board = Board::new(&mut io, Arc::new(SimTouchChip::new(107)), None, BoardConfig::default())?;
//! if let Some(red) = board.light.get_mut("red") {
//!     red.pulse(PulseRequest::new().transition_on(1.0))?;
//! }
//! board.shutdown();
//! # Ok(())
//! # }
//! ```

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod board;
pub mod collection;
pub mod config;
pub mod drivers;
pub mod pins;
pub mod runloop;
pub mod scheduler;

mod error;

pub use app::events::{Level, TouchEvent};
pub use board::Board;
pub use config::BoardConfig;
pub use drivers::output::{EffectState, TimedOutput};
pub use drivers::pulse::{PulseProfile, PulseRequest};
pub use drivers::task::{BackgroundTask, CancelToken, Step};
pub use error::{Error, MotorError, PinError, Result, TaskError};
pub use runloop::RunLoop;
pub use scheduler::TaskRegistry;
