// Logger Port (leveled diagnostic sink)

use tracing::{error, info, warn};

/// Leveled log sink used by the queue engine.
///
/// Return values are never inspected; a sink that drops everything is valid.
pub trait Logger: Send + Sync {
    fn error(&self, err: &dyn std::error::Error);
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
}

/// Forwards to `tracing` (production)
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn error(&self, err: &dyn std::error::Error) {
        error!(target: "simpleq", error = %err);
    }

    fn info(&self, message: &str) {
        info!(target: "simpleq", "{}", message);
    }

    fn warn(&self, message: &str) {
        warn!(target: "simpleq", "{}", message);
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Level {
        Error,
        Warn,
        Info,
    }

    /// Captures every line for later assertions
    #[derive(Default)]
    pub struct RecordingLogger {
        lines: Mutex<Vec<(Level, String)>>,
    }

    impl RecordingLogger {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn lines(&self, level: Level) -> Vec<String> {
            self.lines
                .lock()
                .unwrap()
                .iter()
                .filter(|(l, _)| *l == level)
                .map(|(_, line)| line.clone())
                .collect()
        }

        pub fn count(&self, level: Level) -> usize {
            self.lines(level).len()
        }

        fn push(&self, level: Level, line: String) {
            self.lines.lock().unwrap().push((level, line));
        }
    }

    impl Logger for RecordingLogger {
        fn error(&self, err: &dyn std::error::Error) {
            self.push(Level::Error, err.to_string());
        }

        fn info(&self, message: &str) {
            self.push(Level::Info, message.to_string());
        }

        fn warn(&self, message: &str) {
            self.push(Level::Warn, message.to_string());
        }
    }
}
