//! Unified error types for the Explorer HAT library.
//!
//! A single `Error` enum that every component converts into, keeping
//! error handling at the board level uniform. All variants are `Copy` so
//! they can be passed out of worker threads and logged without allocation.
//!
//! User-supplied task bodies are the exception: they return
//! `anyhow::Result` so arbitrary application errors can be carried to the
//! log with their context chain.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the library funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The hardware line collaborator reported a failure.
    Pin(PinError),
    /// A background task could not be started, stopped, or found.
    Task(TaskError),
    /// A motor command was rejected.
    Motor(MotorError),
    /// Configuration is invalid, or a board table is full.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pin(e) => write!(f, "pin: {e}"),
            Self::Task(e) => write!(f, "task: {e}"),
            Self::Motor(e) => write!(f, "motor: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Pin errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinError {
    /// Digital read failed.
    ReadFailed,
    /// Digital write failed.
    WriteFailed,
    /// PWM start, stop, duty or frequency change failed.
    PwmFailed,
    /// Edge-detect subscription could not be installed or removed.
    EdgeDetectFailed,
    /// The backend has no support for this operation.
    Unsupported,
    /// The GPIO line has already been handed to another component.
    AlreadyClaimed(u8),
    /// ADC read failed.
    AdcReadFailed,
}

impl fmt::Display for PinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFailed => write!(f, "GPIO read failed"),
            Self::WriteFailed => write!(f, "GPIO write failed"),
            Self::PwmFailed => write!(f, "PWM update failed"),
            Self::EdgeDetectFailed => write!(f, "edge detect setup failed"),
            Self::Unsupported => write!(f, "operation not supported by backend"),
            Self::AlreadyClaimed(gpio) => write!(f, "GPIO {gpio} already claimed"),
            Self::AdcReadFailed => write!(f, "ADC read failed"),
        }
    }
}

impl std::error::Error for PinError {}

impl From<PinError> for Error {
    fn from(e: PinError) -> Self {
        Self::Pin(e)
    }
}

// ---------------------------------------------------------------------------
// Task errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskError {
    /// `start()` called while the task's thread is still running.
    AlreadyRunning,
    /// The OS refused to create a worker thread.
    SpawnFailed,
    /// No task is registered under the requested name.
    NotFound,
    /// The task body panicked and cannot be restarted.
    BodyLost,
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRunning => write!(f, "task already running"),
            Self::SpawnFailed => write!(f, "worker thread spawn failed"),
            Self::NotFound => write!(f, "no such task"),
            Self::BodyLost => write!(f, "task body lost after panic"),
        }
    }
}

impl std::error::Error for TaskError {}

impl From<TaskError> for Error {
    fn from(e: TaskError) -> Self {
        Self::Task(e)
    }
}

// ---------------------------------------------------------------------------
// Motor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorError {
    /// Requested speed lies outside the accepted range.
    SpeedOutOfRange(i16),
}

impl fmt::Display for MotorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpeedOutOfRange(speed) => write!(f, "speed {speed} out of range"),
        }
    }
}

impl std::error::Error for MotorError {}

impl From<MotorError> for Error {
    fn from(e: MotorError) -> Self {
        Self::Motor(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Library-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
