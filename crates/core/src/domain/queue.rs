// Queue Domain Model

use crate::error::{QueueError, Result};
use std::time::Duration;

/// Tick interval of a poll loop (100ms)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Queue identifier
pub type QueueId = String;

/// Queue configuration
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub name: QueueId,
    /// Number of independent poll loops draining this queue
    pub workers: usize,
    pub poll_interval: Duration,
}

impl QueueConfig {
    pub fn new(name: impl Into<String>, workers: usize) -> Self {
        Self {
            name: name.into(),
            workers,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(QueueError::Validation(
                "queue name cannot be empty".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(QueueError::Validation(format!(
                "queue {} needs at least one worker",
                self.name
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(QueueError::Validation(format!(
                "queue {} poll interval must be positive",
                self.name
            )));
        }
        Ok(())
    }
}
