//! Named worker-thread spawning and shared-state helpers.
//!
//! Every effect, watcher and user task runs on its own OS thread. Threads
//! are always named (visible in `top -H`, panic messages and debuggers) and
//! get an explicit stack size instead of the 2 MiB std default, since a
//! board may run a dozen of them at once.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use log::debug;

use crate::error::TaskError;

/// Stack size used when the caller does not pass one.
pub const DEFAULT_STACK_KB: usize = 256;

/// Spawn a named thread with an explicit stack size.
pub fn spawn_worker<T, F>(name: &str, stack_kb: usize, f: F) -> Result<JoinHandle<T>, TaskError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    debug!("Spawning worker '{}' (stack={}KB)", name, stack_kb);

    std::thread::Builder::new()
        .name(name.into())
        .stack_size(stack_kb * 1024)
        .spawn(f)
        .map_err(|e| {
            log::error!("worker '{}' spawn failed: {}", name, e);
            TaskError::SpawnFailed
        })
}

/// Lock a mutex, recovering the data if a callback panicked while holding it.
///
/// A panicking user callback must not leave a pin permanently unusable.
pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
