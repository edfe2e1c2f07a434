use serde::Serialize;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lifecycle of one worker thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Created,
    Starting,
    Running,
    Stopping,
    Terminated,
}

impl WorkerState {
    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(self, next: WorkerState) -> bool {
        use WorkerState::*;
        matches!(
            (self, next),
            (Created, Starting)
                | (Starting, Created) // spawn failed, retryable
                | (Starting, Running)
                | (Starting, Stopping) // task exited before ready
                | (Running, Stopping)
                | (Stopping, Terminated)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == WorkerState::Terminated
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkerState::Created => "created",
            WorkerState::Starting => "starting",
            WorkerState::Running => "running",
            WorkerState::Stopping => "stopping",
            WorkerState::Terminated => "terminated",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutex-guarded state with checked transitions
#[derive(Debug)]
pub(crate) struct StateCell {
    state: Mutex<WorkerState>,
}

impl StateCell {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(WorkerState::Created),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WorkerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn get(&self) -> WorkerState {
        *self.lock()
    }

    /// Move from `from` to `to` atomically.
    ///
    /// On mismatch the current state is returned untouched.
    pub(crate) fn transition(&self, from: WorkerState, to: WorkerState) -> Result<(), WorkerState> {
        debug_assert!(from.can_transition_to(to), "illegal transition {from} -> {to}");
        let mut state = self.lock();
        if *state != from {
            return Err(*state);
        }
        *state = to;
        Ok(())
    }

    /// Move to `Stopping` from whichever live state the worker is in.
    ///
    /// Returns the state observed before the call.
    pub(crate) fn begin_stopping(&self) -> WorkerState {
        let mut state = self.lock();
        let previous = *state;
        if matches!(previous, WorkerState::Starting | WorkerState::Running) {
            *state = WorkerState::Stopping;
        }
        previous
    }
}
