//! Line drivers, effect engines, and the worker-thread plumbing under them.

use std::sync::{Arc, Mutex};

pub mod analog;
pub mod input;
pub mod motor;
pub mod output;
pub mod pulse;
pub mod task;
pub mod touch;
pub mod worker;

/// A hardware line shared between its driver and the driver's effect task.
pub type SharedPin<P> = Arc<Mutex<P>>;
