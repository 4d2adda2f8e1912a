// Stats Aggregator - read-only rollup over the driver

use crate::domain::{Stat, Stats};
use crate::error::Result;
use crate::port::Driver;
use serde::Serialize;
use std::sync::Arc;

/// Totals across every registered queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSummary {
    pub queues: usize,
    pub processed: i64,
    pub failed: usize,
}

impl StatsSummary {
    pub fn from_stats(stats: &Stats) -> Self {
        stats.values().fold(
            Self {
                queues: stats.len(),
                ..Self::default()
            },
            |acc, stat| Self {
                processed: acc.processed + stat.processed,
                failed: acc.failed + stat.failed,
                ..acc
            },
        )
    }
}

/// Stats service
///
/// Always reads current durable state; nothing is cached. The snapshot is
/// not atomic across queues.
pub struct StatsService {
    driver: Arc<dyn Driver>,
}

impl StatsService {
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self { driver }
    }

    /// Stats of every registered queue
    pub async fn collect(&self) -> Result<Stats> {
        self.driver.get_stats().await
    }

    /// Stats of one queue, `None` if it was never registered
    pub async fn queue(&self, name: &str) -> Result<Option<Stat>> {
        Ok(self.collect().await?.remove(name))
    }

    pub async fn summary(&self) -> Result<StatsSummary> {
        Ok(StatsSummary::from_stats(&self.collect().await?))
    }
}
