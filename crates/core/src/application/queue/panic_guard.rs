// Panic isolation for task execution
use crate::domain::Message;
use crate::error::QueueError;
use crate::port::{Task, TaskError};
use std::any::Any;
use std::sync::Arc;
use tracing::error;

/// Run `task` on its own tokio task so a panic inside user logic is turned
/// into a regular task error instead of killing the poll loop.
pub async fn run_guarded(task: Arc<dyn Task>, message: Message) -> Result<(), TaskError> {
    let handle = tokio::spawn(async move { task.run(&message).await });

    match handle.await {
        Ok(result) => result,
        Err(join_err) if join_err.is_panic() => {
            let panic_msg = panic_message(join_err.into_panic());
            error!(panic_msg = %panic_msg, "Task panicked");
            Err(Box::new(QueueError::HandlerPanicked(panic_msg)))
        }
        Err(join_err) => Err(Box::new(QueueError::HandlerPanicked(join_err.to_string()))),
    }
}

/// Run the `fail` hook on its own tokio task. A panicking hook is logged and
/// reported as `Err` with the panic message.
pub async fn fail_guarded(task: Arc<dyn Task>, err: TaskError) -> Result<(), String> {
    let handle = tokio::spawn(async move { task.fail(&err).await });

    match handle.await {
        Ok(()) => Ok(()),
        Err(join_err) if join_err.is_panic() => {
            let panic_msg = panic_message(join_err.into_panic());
            error!(panic_msg = %panic_msg, "Fail hook panicked");
            Err(panic_msg)
        }
        Err(join_err) => Err(join_err.to_string()),
    }
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
