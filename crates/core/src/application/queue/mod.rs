// Queue Engine - push, poll loop, requeue, stop

pub mod constants;
mod panic_guard;
mod shutdown;

pub use panic_guard::{fail_guarded, run_guarded};
pub use shutdown::{
    shutdown_channel, stopped_channel, ShutdownSender, ShutdownToken, StoppedNotifier,
    StoppedSignal,
};

use crate::domain::{keys, Message, MessageId, QueueConfig};
use crate::error::{QueueError, Result};
use crate::port::{Driver, IdProvider, Logger, Task, TracingLogger, UuidProvider};
use futures::future::join_all;
use futures::FutureExt;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Services a queue depends on, injected at registration
#[derive(Clone)]
pub struct QueueServices {
    pub driver: Arc<dyn Driver>,
    pub logger: Arc<dyn Logger>,
    pub id_provider: Arc<dyn IdProvider>,
}

impl QueueServices {
    /// UUID identities, given driver and logger
    pub fn new(driver: Arc<dyn Driver>, logger: Arc<dyn Logger>) -> Self {
        Self {
            driver,
            logger,
            id_provider: Arc::new(UuidProvider),
        }
    }

    /// Tracing logger and UUID identities
    pub fn with_driver(driver: Arc<dyn Driver>) -> Self {
        Self::new(driver, Arc::new(TracingLogger))
    }

    pub fn with_id_provider(mut self, id_provider: Arc<dyn IdProvider>) -> Self {
        self.id_provider = id_provider;
        self
    }
}

/// Lifecycle of a queue instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    /// Registered, not polling yet
    Idle,
    Polling,
    /// Stop requested, in-flight cycles are finishing
    Stopping,
    Stopped,
}

impl fmt::Display for QueueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueState::Idle => write!(f, "IDLE"),
            QueueState::Polling => write!(f, "POLLING"),
            QueueState::Stopping => write!(f, "STOPPING"),
            QueueState::Stopped => write!(f, "STOPPED"),
        }
    }
}

/// Result of a single poll-cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Nothing pending
    Empty,
    /// The driver failed to pop; retried on the next tick
    ReadFailed,
    /// Popped bytes could not be decoded and were discarded
    Dropped,
    Processed(MessageId),
    Failed(MessageId),
}

enum Control {
    Idle(StoppedNotifier),
    Polling(ShutdownSender),
    Stopping,
    Stopped,
}

impl Control {
    fn state(&self) -> QueueState {
        match self {
            Control::Idle(_) => QueueState::Idle,
            Control::Polling(_) => QueueState::Polling,
            Control::Stopping => QueueState::Stopping,
            Control::Stopped => QueueState::Stopped,
        }
    }
}

struct QueueInner {
    config: QueueConfig,
    active_key: String,
    stats_key: String,
    services: QueueServices,
    control: Mutex<Control>,
    stopped: StoppedSignal,
    poisoned: AtomicU64,
}

/// Queue handle
///
/// Cheap to clone; clones share the same poll loops and counters, so task
/// logic can keep one around to call [`Queue::requeue`].
///
/// Dropping every handle does not stop running poll loops. Call
/// [`Queue::stop`].
#[derive(Clone)]
pub struct Queue {
    inner: Arc<QueueInner>,
}

impl Queue {
    /// Register the queue with the driver and return an idle handle
    pub async fn register(config: QueueConfig, services: QueueServices) -> Result<Self> {
        config.validate()?;
        services.driver.register(&config.name).await?;

        services
            .logger
            .info(&format!("Initialized queue {}", config.name));

        let (notifier, stopped) = stopped_channel();

        Ok(Self {
            inner: Arc::new(QueueInner {
                active_key: keys::active_key(&config.name),
                stats_key: keys::stats_key(&config.name),
                config,
                services,
                control: Mutex::new(Control::Idle(notifier)),
                stopped,
                poisoned: AtomicU64::new(0),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    pub fn workers(&self) -> usize {
        self.inner.config.workers
    }

    pub fn active_key(&self) -> &str {
        &self.inner.active_key
    }

    pub fn stats_key(&self) -> &str {
        &self.inner.stats_key
    }

    pub fn state(&self) -> QueueState {
        self.inner.lock_control().state()
    }

    /// Number of popped messages discarded because they could not be decoded
    pub fn poisoned_count(&self) -> u64 {
        self.inner.poisoned.load(Ordering::SeqCst)
    }

    /// Confirmation that fires once every poll loop has exited
    pub fn stopped(&self) -> StoppedSignal {
        self.inner.stopped.clone()
    }

    /// Assign a fresh identity to `message` and add it to the active set
    pub async fn push(&self, message: &mut Message) -> Result<MessageId> {
        message.assign_id(self.inner.services.id_provider.generate_id());
        self.inner.write(message).await?;
        Ok(message.id().to_string())
    }

    /// Record another attempt and push the message back, keeping its identity.
    ///
    /// Fails with `MaxAttemptsExceeded`, without writing, once attempts go
    /// past the message's ceiling.
    pub async fn requeue(&self, message: &mut Message) -> Result<()> {
        message.new_attempt();

        if message.is_exhausted() {
            return Err(QueueError::MaxAttemptsExceeded {
                queue: self.name().to_string(),
                id: message.id().to_string(),
            });
        }

        self.inner.write(message).await
    }

    /// Spawn the poll loops. Allowed once per queue instance.
    pub fn start_polling(&self, task: Arc<dyn Task>) -> Result<()> {
        let (shutdown_tx, shutdown_rx) = shutdown_channel();

        let notifier = {
            let mut control = self.inner.lock_control();
            match std::mem::replace(&mut *control, Control::Polling(shutdown_tx)) {
                Control::Idle(notifier) => notifier,
                previous => {
                    let state = previous.state();
                    *control = previous;
                    return Err(QueueError::InvalidState(format!(
                        "cannot start polling queue {} while {}",
                        self.name(),
                        state
                    )));
                }
            }
        };

        let handles: Vec<_> = (0..self.workers())
            .map(|worker| {
                let inner = Arc::clone(&self.inner);
                let task = Arc::clone(&task);
                let shutdown = shutdown_rx.clone();
                tokio::spawn(async move { inner.poll_loop(worker, task, shutdown).await })
            })
            .collect();

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            for result in join_all(handles).await {
                if let Err(e) = result {
                    inner.services.logger.error(&e);
                }
            }
            *inner.lock_control() = Control::Stopped;
            notifier.notify();
            inner
                .services
                .logger
                .info(&format!("Stopped polling queue {}", inner.config.name));
        });

        self.inner.services.logger.info(&format!(
            "Started polling queue {} with {} worker(s)",
            self.name(),
            self.workers()
        ));

        Ok(())
    }

    /// Ask the poll loops to exit and wait up to `timeout` for confirmation.
    ///
    /// Only valid while polling; any other state is rejected immediately.
    /// On timeout the loops still exit once their current cycle completes;
    /// [`Queue::stopped`] can be awaited for that.
    pub async fn stop(&self, timeout: Duration) -> Result<()> {
        {
            let mut control = self.inner.lock_control();
            match std::mem::replace(&mut *control, Control::Stopping) {
                Control::Polling(shutdown) => shutdown.shutdown(),
                previous => {
                    let state = previous.state();
                    *control = previous;
                    return Err(QueueError::InvalidState(format!(
                        "cannot stop queue {} while {}",
                        self.name(),
                        state
                    )));
                }
            }
        }

        let mut stopped = self.stopped();
        tokio::time::timeout(timeout, stopped.wait())
            .await
            .map_err(|_| QueueError::StopTimeout(timeout))
    }

    /// Run one poll-cycle: pop, decode, execute, record the outcome
    pub async fn poll_once(&self, task: &Arc<dyn Task>) -> PollOutcome {
        self.inner.poll_once(task).await
    }
}

impl QueueInner {
    fn lock_control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn write(&self, message: &Message) -> Result<()> {
        let data = message.to_bytes()?;
        self.services.driver.write(&self.active_key, &data).await
    }

    async fn poll_loop(&self, worker: usize, task: Arc<dyn Task>, mut shutdown: ShutdownToken) {
        let period = self.config.poll_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if shutdown.is_shutdown() {
                break;
            }
            // Only the wait is raced against shutdown; a started cycle always completes
            tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                _ = ticker.tick() => {
                    // A panicking logger must not end the loop
                    let cycle = AssertUnwindSafe(self.poll_once(&task)).catch_unwind();
                    if let Err(payload) = cycle.await {
                        tracing::error!(
                            queue = %self.config.name,
                            worker,
                            panic_msg = %panic_guard::panic_message(payload),
                            "Poll cycle panicked"
                        );
                    }
                }
            }
        }

        tracing::debug!(queue = %self.config.name, worker, "Poll loop exited");
    }

    async fn poll_once(&self, task: &Arc<dyn Task>) -> PollOutcome {
        let logger = &self.services.logger;
        let driver = &self.services.driver;
        let name = &self.config.name;

        let data = match driver.read(&self.active_key).await {
            Ok(Some(data)) => data,
            Ok(None) => return PollOutcome::Empty,
            Err(e) => {
                logger.warn(&format!("Failed to read from queue {}: {}", name, e));
                return PollOutcome::ReadFailed;
            }
        };

        let message = match Message::from_bytes(&data) {
            Ok(message) => message,
            Err(e) => {
                self.poisoned.fetch_add(1, Ordering::SeqCst);
                logger.warn(&format!(
                    "Dropping undecodable message from queue {}: {}",
                    name, e
                ));
                return PollOutcome::Dropped;
            }
        };

        let id = message.id().to_string();
        logger.info(&format!("Processing message {} from queue {}", id, name));

        match run_guarded(Arc::clone(task), message).await {
            Ok(()) => {
                if let Err(e) = driver.set_processed(&self.stats_key).await {
                    logger.error(&e);
                }
                logger.info(&format!("Processed message {} from queue {}", id, name));
                PollOutcome::Processed(id)
            }
            Err(err) => {
                let reason = err.to_string();
                let hook = fail_guarded(Arc::clone(task), err).await;
                let recorded = driver.set_failed(&self.stats_key, &id).await;

                if let Err(panic_msg) = hook {
                    logger.warn(&format!(
                        "Fail hook panicked for message {} from queue {}: {}",
                        id, name, panic_msg
                    ));
                }
                if let Err(e) = recorded {
                    logger.error(&e);
                }
                logger.warn(&format!(
                    "Failed message {} from queue {}: {}",
                    id, name, reason
                ));
                PollOutcome::Failed(id)
            }
        }
    }
}
