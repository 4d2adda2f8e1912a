// Domain Layer - Pure data and naming rules

pub mod keys;
pub mod message;
pub mod queue;
pub mod stats;

// Re-exports
pub use message::{Content, Message, MessageId};
pub use queue::{QueueConfig, QueueId};
pub use stats::{Stat, Stats};
