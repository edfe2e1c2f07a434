//! Worker thread lifecycle
//!
//! A [`WorkerHandle`] owns one OS thread hosting a long-running [`HostedTask`].
//! The launcher blocks in [`WorkerHandle::start`] until the task reports its loop
//! live, talks to it only through its mailbox, and later confirms termination
//! with [`WorkerHandle::wait_end`] and [`WorkerHandle::is_running`].
//!
//! ```no_run
//! use lifeline::worker::{TaskContext, WorkerHandle};
//! use std::time::Duration;
//!
//! let handle = WorkerHandle::new(|ctx: TaskContext<()>| {
//!     ctx.ready.signal_ready();
//!     ctx.stop.wait(None);
//!     Ok(())
//! });
//! handle.start()?;
//! handle.request_stop()?;
//! assert!(handle.wait_end(Some(Duration::from_secs(2))));
//! # Ok::<(), lifeline::worker::LifecycleError>(())
//! ```

mod context;
mod error;
mod handle;
mod shared;
mod state;
mod task;

pub use context::{Outbox, ReadyNotifier, Reply, StopToken, TaskContext};
pub use error::{LifecycleError, Result};
pub use handle::WorkerHandle;
pub use state::WorkerState;
pub use task::{HostedTask, TaskError, TaskOutcome, TaskResult};

use crate::observability::LifecycleMetrics;
use bon::Builder;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Unique identity of one worker handle, used in logs and thread names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct WorkerId(Uuid);

impl WorkerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, enough to tell workers apart in a thread name.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for WorkerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-handle spawn options
#[derive(Debug, Clone, Default, Builder)]
pub struct WorkerOptions {
    /// OS thread name; defaults to `worker-<short id>`.
    #[builder(into)]
    pub name: Option<String>,
    pub stack_size: Option<usize>,
    /// Counters to share across handles; each handle gets its own otherwise.
    pub metrics: Option<Arc<LifecycleMetrics>>,
}
