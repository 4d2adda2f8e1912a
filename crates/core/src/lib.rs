// SimpleQ Core - Queue Engine, Domain Model & Ports
// NO storage dependencies: drivers live in infra crates

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use application::{PollOutcome, Queue, QueueServices, QueueState, StatsService};
pub use domain::{Message, QueueConfig, Stat, Stats};
pub use error::{QueueError, Result};
pub use port::{Driver, Logger, Task, TaskError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
