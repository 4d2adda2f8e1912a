// Poller Shutdown Token & Stopped Signal

use tokio::sync::watch;

/// Stop request observed by poll loops
#[derive(Clone)]
pub struct ShutdownToken {
    rx: watch::Receiver<bool>,
}

impl ShutdownToken {
    /// Check if shutdown was requested
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait for shutdown signal
    pub async fn wait(&mut self) {
        let _ = self.rx.changed().await;
    }
}

/// Shutdown sender
pub struct ShutdownSender {
    tx: watch::Sender<bool>,
}

impl ShutdownSender {
    /// Signal shutdown to all poll loops
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }
}

/// Create a shutdown channel
pub fn shutdown_channel() -> (ShutdownSender, ShutdownToken) {
    let (tx, rx) = watch::channel(false);
    (ShutdownSender { tx }, ShutdownToken { rx })
}

/// Confirmation that every poll loop of a queue has exited
#[derive(Clone)]
pub struct StoppedSignal {
    rx: watch::Receiver<bool>,
}

impl StoppedSignal {
    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the confirmation fired
    pub async fn wait(&mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                break;
            }
        }
    }
}

/// Sending half of [`StoppedSignal`]; consumed on use so it fires once
pub struct StoppedNotifier {
    tx: watch::Sender<bool>,
}

impl StoppedNotifier {
    pub fn notify(self) {
        self.tx.send_replace(true);
    }
}

/// Create a stopped-confirmation channel
pub fn stopped_channel() -> (StoppedNotifier, StoppedSignal) {
    let (tx, rx) = watch::channel(false);
    (StoppedNotifier { tx }, StoppedSignal { rx })
}
