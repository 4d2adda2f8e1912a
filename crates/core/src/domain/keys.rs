// Storage key naming
//
// These strings are shared with every other tool reading the same backend.
// Changing them orphans existing data.

/// Prefix of every key written by the queue
pub const KEY_PREFIX: &str = "simple-queue:data";

/// Set of pending messages for a queue
pub fn active_key(queue: &str) -> String {
    format!("{}:active:{}", KEY_PREFIX, queue)
}

/// Base key of the processed/failed counters for a queue
pub fn stats_key(queue: &str) -> String {
    format!("{}:{}", KEY_PREFIX, queue)
}

pub fn processed_key(stats_key: &str) -> String {
    format!("{}:processed", stats_key)
}

pub fn failed_key(stats_key: &str) -> String {
    format!("{}:failed", stats_key)
}

/// Global set of registered queue names
pub fn registry_key() -> String {
    format!("{}:queue-list", KEY_PREFIX)
}
