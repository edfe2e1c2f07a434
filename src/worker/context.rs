//! What a hosted task sees from inside the worker thread

use super::WorkerId;
use super::error::{LifecycleError, Result};
use super::shared::WorkerShared;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Reply channel embedded in request messages
pub type Reply<R> = oneshot::Sender<R>;

/// Everything handed to [`super::HostedTask::run`].
///
/// Fields are public so a task can split them across its own loop.
pub struct TaskContext<M> {
    pub worker: WorkerId,
    pub ready: ReadyNotifier,
    pub stop: StopToken,
    pub mailbox: mpsc::UnboundedReceiver<M>,
}

impl<M> TaskContext<M> {
    pub(crate) fn new(shared: Arc<WorkerShared>, mailbox: mpsc::UnboundedReceiver<M>) -> Self {
        Self {
            worker: shared.id,
            ready: ReadyNotifier {
                shared: Arc::clone(&shared),
            },
            stop: StopToken { shared },
            mailbox,
        }
    }
}

/// Reports the hosted loop live, releasing the launcher blocked in `start()`
#[derive(Debug, Clone)]
pub struct ReadyNotifier {
    shared: Arc<WorkerShared>,
}

impl ReadyNotifier {
    /// Returns `true` on the first call only; repeated calls are harmless.
    pub fn signal_ready(&self) -> bool {
        self.shared.mark_ready()
    }

    pub fn is_ready(&self) -> bool {
        self.shared.rendezvous.await_ready(Some(Duration::ZERO))
    }
}

/// Observes the launcher's stop request
#[derive(Debug, Clone)]
pub struct StopToken {
    shared: Arc<WorkerShared>,
}

impl StopToken {
    pub fn is_requested(&self) -> bool {
        self.shared.stop.is_fired()
    }

    /// Block until stop is requested; `true` if it was.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        self.shared.stop.wait(timeout).is_some()
    }

    /// Resolve once stop is requested. Cancel-safe.
    pub async fn requested(&self) {
        self.shared.stop.wait_async().await
    }
}

/// Cloneable sending side of a worker's mailbox
#[derive(Debug)]
pub struct Outbox<M> {
    worker: WorkerId,
    tx: mpsc::UnboundedSender<M>,
}

impl<M> Outbox<M> {
    pub(crate) fn new(worker: WorkerId, tx: mpsc::UnboundedSender<M>) -> Self {
        Self { worker, tx }
    }

    pub fn worker(&self) -> WorkerId {
        self.worker
    }

    pub fn post(&self, message: M) -> Result<()> {
        self.tx.send(message).map_err(|_| LifecycleError::MailboxClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<M> Clone for Outbox<M> {
    fn clone(&self) -> Self {
        Self {
            worker: self.worker,
            tx: self.tx.clone(),
        }
    }
}
