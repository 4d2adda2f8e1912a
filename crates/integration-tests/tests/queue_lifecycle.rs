//! Poll loop lifecycle against SQLite
//!
//! Start, drain with several workers, requeue from task logic, stop.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use simpleq_core::port::task::mocks::MockTask;
use simpleq_core::port::{Driver, Task, TaskError};
use simpleq_core::{Message, Queue, QueueConfig, QueueError, QueueServices, QueueState};
use simpleq_infra_sqlite::{create_pool, run_migrations, SqliteDriver};

const TICK: Duration = Duration::from_millis(5);
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

async fn memory_driver() -> Arc<SqliteDriver> {
    let pool = create_pool(":memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();
    Arc::new(SqliteDriver::new(pool))
}

async fn register(name: &str, workers: usize, driver: Arc<SqliteDriver>) -> Queue {
    let config = QueueConfig::new(name, workers).with_poll_interval(TICK);
    Queue::register(config, QueueServices::with_driver(driver))
        .await
        .unwrap()
}

async fn wait_for_processed(driver: &SqliteDriver, queue: &str, expected: i64) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let stats = driver.get_stats().await.unwrap();
        let stat = &stats[queue];
        if stat.processed + stat.failed as i64 >= expected {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {} outcomes on {}",
            expected,
            queue
        );
        tokio::time::sleep(TICK).await;
    }
}

/// Records every id it sees
#[derive(Default)]
struct CollectingTask {
    ids: Mutex<Vec<String>>,
}

#[async_trait]
impl Task for CollectingTask {
    async fn run(&self, message: &Message) -> Result<(), TaskError> {
        self.ids.lock().unwrap().push(message.id().to_string());
        Ok(())
    }

    async fn fail(&self, _error: &TaskError) {}
}

/// Requeues every message until the ceiling is hit
struct RetryingTask {
    queue: Queue,
    attempts_seen: Mutex<Vec<u32>>,
}

#[async_trait]
impl Task for RetryingTask {
    async fn run(&self, message: &Message) -> Result<(), TaskError> {
        self.attempts_seen.lock().unwrap().push(message.attempts());
        let mut retry = message.clone();
        self.queue.requeue(&mut retry).await?;
        Ok(())
    }

    async fn fail(&self, _error: &TaskError) {}
}

#[tokio::test]
async fn test_workers_drain_each_message_once() {
    let driver = memory_driver().await;
    let queue = register("drain", 4, driver.clone()).await;

    let mut pushed = HashSet::new();
    for i in 0..25 {
        let mut message = Message::new(format!("job-{}", i));
        pushed.insert(queue.push(&mut message).await.unwrap());
    }

    let task = Arc::new(CollectingTask::default());
    queue.start_polling(task.clone()).unwrap();
    assert_eq!(queue.state(), QueueState::Polling);

    wait_for_processed(&driver, "drain", 25).await;
    queue.stop(STOP_TIMEOUT).await.unwrap();

    let ids = task.ids.lock().unwrap().clone();
    assert_eq!(ids.len(), 25);
    let unique: HashSet<String> = ids.into_iter().collect();
    assert_eq!(unique, pushed);
    assert_eq!(driver.get_stats().await.unwrap()["drain"].processed, 25);
}

#[tokio::test]
async fn test_requeue_until_ceiling_then_failed() {
    let driver = memory_driver().await;
    let queue = register("retry", 1, driver.clone()).await;

    let mut message = Message::with_max_attempts("flaky", 2);
    let id = queue.push(&mut message).await.unwrap();

    let task = Arc::new(RetryingTask {
        queue: queue.clone(),
        attempts_seen: Mutex::new(Vec::new()),
    });
    queue.start_polling(task.clone()).unwrap();

    // Two successful requeues, then the third run hits the ceiling
    wait_for_processed(&driver, "retry", 3).await;
    queue.stop(STOP_TIMEOUT).await.unwrap();

    assert_eq!(*task.attempts_seen.lock().unwrap(), vec![0, 1, 2]);

    let stat = &driver.get_stats().await.unwrap()["retry"];
    assert_eq!(stat.processed, 2);
    assert_eq!(stat.failed_ids, vec![id]);
    assert_eq!(driver.read(queue.active_key()).await.unwrap(), None);
}

#[tokio::test]
async fn test_stop_handshake() {
    let driver = memory_driver().await;
    let queue = register("handshake", 2, driver.clone()).await;
    let task: Arc<dyn Task> = Arc::new(MockTask::new_success());

    assert!(matches!(
        queue.stop(STOP_TIMEOUT).await,
        Err(QueueError::InvalidState(_))
    ));

    queue.start_polling(task.clone()).unwrap();
    assert!(matches!(
        queue.start_polling(task),
        Err(QueueError::InvalidState(_))
    ));

    let stopped = queue.stopped();
    assert!(!stopped.is_stopped());

    queue.stop(STOP_TIMEOUT).await.unwrap();
    assert!(stopped.is_stopped());
    assert_eq!(queue.state(), QueueState::Stopped);

    // Nothing is consumed once stopped
    let mut late = Message::new("late");
    queue.push(&mut late).await.unwrap();
    tokio::time::sleep(TICK * 10).await;
    assert!(driver.read(queue.active_key()).await.unwrap().is_some());
}

#[tokio::test]
async fn test_failing_task_is_recorded() {
    let driver = memory_driver().await;
    let queue = register("failing", 1, driver.clone()).await;

    let mut message = Message::new("bad");
    let id = queue.push(&mut message).await.unwrap();

    let task = Arc::new(MockTask::new_fail("cannot handle"));
    queue.start_polling(task.clone()).unwrap();

    wait_for_processed(&driver, "failing", 1).await;
    queue.stop(STOP_TIMEOUT).await.unwrap();

    assert_eq!(task.failures(), vec!["cannot handle".to_string()]);
    let stat = &driver.get_stats().await.unwrap()["failing"];
    assert_eq!(stat.processed, 0);
    assert_eq!(stat.failed_ids, vec![id]);
}
