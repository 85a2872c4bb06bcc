use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

/// Events that can end a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalEvent {
    Exited { code: Option<i32> },
    TimedOut,
    ProcessError(String),
}

/// Resolve-once completion point. Exit watcher, timer and error paths all hold a
/// clone; the first `resolve` wins and every later one is ignored.
#[derive(Debug, Clone)]
pub struct TerminalLatch {
    tx: Arc<Mutex<Option<oneshot::Sender<TerminalEvent>>>>,
}

impl TerminalLatch {
    pub fn new() -> (Self, oneshot::Receiver<TerminalEvent>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Arc::new(Mutex::new(Some(tx))) }, rx)
    }

    /// Returns true if this call decided the outcome.
    pub fn resolve(&self, event: TerminalEvent) -> bool {
        let sender = self.tx.lock().take();
        match sender {
            Some(tx) => {
                debug!(event = ?event, "session terminal event");
                // receiver gone means the request itself was dropped; still the first event
                let _ = tx.send(event);
                true
            }
            None => {
                debug!(event = ?event, "late terminal event ignored");
                false
            }
        }
    }

    pub fn is_resolved(&self) -> bool { self.tx.lock().is_none() }
}
