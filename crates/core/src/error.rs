// Central Error Type for the Queue

use std::time::Duration;
use thiserror::Error;

/// Queue-level error type
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("Bind error: {0}")]
    Bind(#[source] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Driver error: {0}")]
    Driver(String),

    /// Message text is relied upon by callers matching on it
    #[error("max attempts reached for {queue}:{id}")]
    MaxAttemptsExceeded { queue: String, id: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Timed out after {0:?} waiting for pollers to stop")]
    StopTimeout(Duration),

    #[error("Handler panicked: {0}")]
    HandlerPanicked(String),
}

/// Result type alias using QueueError
pub type Result<T> = std::result::Result<T, QueueError>;
