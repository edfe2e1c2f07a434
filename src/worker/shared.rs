use super::WorkerId;
use super::state::{StateCell, WorkerState};
use super::task::TaskOutcome;
use crate::observability::LifecycleMetrics;
use crate::rendezvous::{Rendezvous, Signal};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// State visible to both the launcher and the worker thread.
///
/// Everything here is either immutable or synchronised through the state cell
/// and the signals; the hosted task's own state never lives here.
#[derive(Debug)]
pub(crate) struct WorkerShared {
    pub(crate) id: WorkerId,
    pub(crate) name: String,
    pub(crate) state: StateCell,
    pub(crate) rendezvous: Rendezvous<TaskOutcome>,
    pub(crate) stop: Signal<()>,
    pub(crate) metrics: Arc<LifecycleMetrics>,
}

impl WorkerShared {
    pub(crate) fn new(id: WorkerId, name: String, metrics: Arc<LifecycleMetrics>) -> Self {
        Self {
            id,
            name,
            state: StateCell::new(),
            rendezvous: Rendezvous::new(),
            stop: Signal::new(),
            metrics,
        }
    }

    /// Called by the hosted task once its loop accepts work.
    pub(crate) fn mark_ready(&self) -> bool {
        // State first: a launcher released by the signal must observe Running.
        if let Err(state) = self.state.transition(WorkerState::Starting, WorkerState::Running) {
            debug!(worker_id = %self.id, %state, "Ready signalled outside Starting");
        }

        let fired = self.rendezvous.signal_ready();
        if fired {
            self.metrics.worker_ready();
            info!(worker_id = %self.id, worker = %self.name, "Worker ready");
        }
        fired
    }

    /// Wrap up after the hosted task returned or panicked.
    pub(crate) fn finish(&self, outcome: TaskOutcome) {
        let previous = self.state.begin_stopping();

        match &outcome {
            TaskOutcome::Completed => {}
            TaskOutcome::Failed(reason) => {
                self.metrics.task_failed();
                warn!(worker_id = %self.id, %reason, "Hosted task failed");
            }
            TaskOutcome::Panicked(reason) => {
                self.metrics.task_panicked();
                error!(worker_id = %self.id, %reason, "Hosted task panicked");
            }
        }

        if let Err(state) = self.state.transition(WorkerState::Stopping, WorkerState::Terminated) {
            error!(worker_id = %self.id, %state, "Worker finished from unexpected state");
        }
        self.metrics.worker_terminated();
        info!(worker_id = %self.id, worker = %self.name, %outcome, "Worker terminated");

        self.rendezvous.signal_done(outcome.clone());

        // Release a launcher still blocked in start(); the outcome is already
        // recorded for its error.
        if self.rendezvous.abort_ready() {
            warn!(
                worker_id = %self.id,
                %previous,
                %outcome,
                "Worker exited before signalling ready"
            );
        }
    }
}
