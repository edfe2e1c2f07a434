//! Hosted task boundary

use super::context::TaskContext;
use serde::Serialize;
use std::any::Any;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Setup failed: {0}")]
    Setup(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type TaskResult = std::result::Result<(), TaskError>;

/// Long-running unit of work executed on a worker thread.
///
/// Implementations must call [`TaskContext::ready`]'s `signal_ready` once they
/// can actually accept work, and return once the stop token fires.
pub trait HostedTask<M>: Send + 'static {
    fn run(self: Box<Self>, ctx: TaskContext<M>) -> TaskResult;
}

impl<M, F> HostedTask<M> for F
where
    F: FnOnce(TaskContext<M>) -> TaskResult + Send + 'static,
{
    fn run(self: Box<Self>, ctx: TaskContext<M>) -> TaskResult {
        (*self)(ctx)
    }
}

/// How a hosted task ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "lowercase")]
pub enum TaskOutcome {
    Completed,
    Failed(String),
    Panicked(String),
}

impl TaskOutcome {
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        TaskOutcome::Panicked(message)
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, TaskOutcome::Completed)
    }
}

impl From<TaskResult> for TaskOutcome {
    fn from(result: TaskResult) -> Self {
        match result {
            Ok(()) => TaskOutcome::Completed,
            Err(e) => TaskOutcome::Failed(e.to_string()),
        }
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskOutcome::Completed => f.write_str("completed"),
            TaskOutcome::Failed(reason) => write!(f, "failed: {reason}"),
            TaskOutcome::Panicked(reason) => write!(f, "panicked: {reason}"),
        }
    }
}
