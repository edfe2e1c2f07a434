use super::state::WorkerState;
use super::task::TaskOutcome;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("worker already started (state: {state})")]
    AlreadyStarted { state: WorkerState },

    #[error("worker is not running (state: {state})")]
    NotRunning { state: WorkerState },

    #[error("failed to spawn worker thread: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("worker exited before signalling ready: {outcome}")]
    ExitedBeforeReady { outcome: TaskOutcome },

    #[error("worker did not become ready within {timeout:?}")]
    StartTimedOut { timeout: Duration },

    #[error("worker mailbox is closed")]
    MailboxClosed,

    #[error("worker dropped the request without replying")]
    NoReply,

    #[error("worker has not terminated (state: {state})")]
    NotTerminated { state: WorkerState },
}

pub type Result<T> = std::result::Result<T, LifecycleError>;
