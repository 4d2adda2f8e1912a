// Application Layer - Queue engine and read models

pub mod queue;
pub mod stats;

// Re-exports
pub use queue::{PollOutcome, Queue, QueueServices, QueueState, StoppedSignal};
pub use stats::{StatsService, StatsSummary};
