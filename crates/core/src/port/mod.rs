// Port Layer - Interfaces for external dependencies

pub mod driver;
pub mod id_provider; // For deterministic testing
pub mod logger;
pub mod task;

// Re-exports
pub use driver::Driver;
pub use id_provider::{IdProvider, UuidProvider};
pub use logger::{Logger, TracingLogger};
pub use task::{Task, TaskError};
