// Engine constants (no magic values)
use std::time::Duration;

pub use crate::domain::queue::DEFAULT_POLL_INTERVAL;

/// How long `stop` callers usually wait for pollers to exit (5s)
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll loops per queue when no hint is given
pub const DEFAULT_WORKERS: usize = 1;

/// Requeue ceiling used by producers that do not pick one
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
