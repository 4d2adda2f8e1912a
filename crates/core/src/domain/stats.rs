// Stats Domain Model

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stats of all registered queues, keyed by queue name
pub type Stats = BTreeMap<String, Stat>;

/// Counters for a single queue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    pub processed: i64,
    pub failed: usize,
    pub failed_ids: Vec<String>,
}

impl Stat {
    /// Build a stat from raw backend values.
    ///
    /// A missing or unparseable processed counter reads as 0.
    pub fn from_raw(processed: Option<&str>, failed_ids: Vec<String>) -> Self {
        let processed = processed
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .unwrap_or(0);

        Self {
            processed,
            failed: failed_ids.len(),
            failed_ids,
        }
    }
}
