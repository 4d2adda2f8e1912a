// Echo task used by `simpleq work`

use async_trait::async_trait;
use serde_json::Value;
use simpleq_core::{Message, Queue, Task, TaskError};
use tracing::{info, warn};

/// Logs every payload.
///
/// A JSON object payload with `"fail": true` is requeued until its attempt
/// ceiling is reached, after which the message is recorded as failed.
pub struct EchoTask {
    queue: Queue,
}

impl EchoTask {
    pub fn new(queue: Queue) -> Self {
        Self { queue }
    }
}

fn wants_retry(message: &Message) -> bool {
    message
        .content()
        .bind_json::<Value>()
        .ok()
        .and_then(|value| value.get("fail").and_then(Value::as_bool))
        .unwrap_or(false)
}

#[async_trait]
impl Task for EchoTask {
    async fn run(&self, message: &Message) -> Result<(), TaskError> {
        info!(
            target: "simpleq",
            id = message.id(),
            attempts = message.attempts(),
            content = %String::from_utf8_lossy(message.content().as_bytes()),
            "Echo"
        );

        if wants_retry(message) {
            let mut retry = message.clone();
            self.queue.requeue(&mut retry).await?;
            info!(
                target: "simpleq",
                id = message.id(),
                attempts = retry.attempts(),
                "Requeued"
            );
        }

        Ok(())
    }

    async fn fail(&self, error: &TaskError) {
        warn!(target: "simpleq", error = %error, "Echo task failed");
    }
}
