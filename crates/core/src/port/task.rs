// Task Port (user-supplied business logic)

use crate::domain::Message;
use async_trait::async_trait;

/// Error returned by task logic
pub type TaskError = Box<dyn std::error::Error + Send + Sync>;

/// Task logic executed for every polled message
///
/// The engine never retries on its own. A task that wants another attempt
/// keeps a `Queue` handle and calls `Queue::requeue` from `run`.
#[async_trait]
pub trait Task: Send + Sync {
    /// Process one message
    async fn run(&self, message: &Message) -> Result<(), TaskError>;

    /// Notification hook invoked after `run` failed, before the failure is recorded
    async fn fail(&self, error: &TaskError);
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock task behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Always succeed
        Success,
        /// Always fail with message
        Fail(String),
        /// Panic with message (for panic isolation testing)
        Panic(String),
    }

    /// Mock task recording what it saw
    pub struct MockTask {
        behavior: Arc<Mutex<MockBehavior>>,
        seen: Arc<Mutex<Vec<Message>>>,
        failures: Arc<Mutex<Vec<String>>>,
    }

    impl MockTask {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior: Arc::new(Mutex::new(behavior)),
                seen: Arc::new(Mutex::new(Vec::new())),
                failures: Arc::new(Mutex::new(Vec::new())),
            }
        }
        pub fn new_success() -> Self {
            Self::new(MockBehavior::Success)
        }
        pub fn new_fail(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Fail(message.into()))
        }
        pub fn new_panic_inducing(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Panic(message.into()))
        }
        pub fn set_behavior(&self, behavior: MockBehavior) {
            *self.behavior.lock().unwrap() = behavior;
        }
        /// Number of `run` invocations
        pub fn run_count(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
        pub fn seen(&self) -> Vec<Message> {
            self.seen.lock().unwrap().clone()
        }
        /// Errors passed to `fail`
        pub fn failures(&self) -> Vec<String> {
            self.failures.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Task for MockTask {
        async fn run(&self, message: &Message) -> Result<(), TaskError> {
            self.seen.lock().unwrap().push(message.clone());

            let behavior = self.behavior.lock().unwrap().clone();

            match behavior {
                MockBehavior::Success => Ok(()),
                MockBehavior::Fail(msg) => Err(msg.into()),
                MockBehavior::Panic(msg) => {
                    panic!("{}", msg);
                }
            }
        }

        async fn fail(&self, error: &TaskError) {
            self.failures.lock().unwrap().push(error.to_string());
        }
    }
}
