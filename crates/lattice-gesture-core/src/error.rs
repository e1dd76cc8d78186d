//! Error types for the core crate.

use thiserror::Error;

/// Errors raised by the timer queue and the timer driver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The timer ID is invalid, has already fired, or was cancelled.
    #[error("invalid or expired timer ID")]
    InvalidTimerId,

    /// The timer driver thread has stopped and can no longer accept deadlines.
    #[error("timer driver disconnected")]
    DriverDisconnected,

    /// The timer driver thread could not be spawned.
    #[error("failed to spawn timer driver thread: {0}")]
    DriverSpawn(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
