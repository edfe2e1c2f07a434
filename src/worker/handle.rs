use super::context::{Outbox, Reply, TaskContext};
use super::error::{LifecycleError, Result};
use super::shared::WorkerShared;
use super::state::WorkerState;
use super::task::{HostedTask, TaskOutcome};
use super::{WorkerId, WorkerOptions};
use crate::observability::LifecycleMetrics;
use crate::rendezvous::Readiness;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, info_span, warn};

/// Task and mailbox waiting to be moved onto the worker thread
struct Launch<M> {
    task: Box<dyn HostedTask<M>>,
    mailbox: mpsc::UnboundedReceiver<M>,
}

type LaunchSlot<M> = Arc<Mutex<Option<Launch<M>>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Launcher-side handle for one worker thread.
///
/// A handle runs its task at most once. After `Terminated` it can only be
/// inspected or joined; create a new handle for a new run.
pub struct WorkerHandle<M: Send + 'static> {
    shared: Arc<WorkerShared>,
    // Shared with the spawn closure so a failed spawn leaves the task in place.
    launch: LaunchSlot<M>,
    outbox: Outbox<M>,
    thread: Mutex<Option<JoinHandle<()>>>,
    stack_size: Option<usize>,
}

impl<M: Send + 'static> WorkerHandle<M> {
    pub fn new(task: impl HostedTask<M>) -> Self {
        Self::with_options(task, WorkerOptions::default())
    }

    pub fn with_options(task: impl HostedTask<M>, options: WorkerOptions) -> Self {
        let id = WorkerId::new();
        let name = options.name.unwrap_or_else(|| format!("worker-{}", id.short()));
        let metrics = options.metrics.unwrap_or_else(|| Arc::new(LifecycleMetrics::new()));
        let (tx, rx) = mpsc::unbounded_channel();

        debug!(worker_id = %id, worker = %name, "Worker handle created");

        Self {
            shared: Arc::new(WorkerShared::new(id, name, metrics)),
            launch: Arc::new(Mutex::new(Some(Launch {
                task: Box::new(task),
                mailbox: rx,
            }))),
            outbox: Outbox::new(id, tx),
            thread: Mutex::new(None),
            stack_size: options.stack_size,
        }
    }

    pub fn id(&self) -> WorkerId {
        self.shared.id
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn state(&self) -> WorkerState {
        self.shared.state.get()
    }

    pub fn metrics(&self) -> &Arc<LifecycleMetrics> {
        &self.shared.metrics
    }

    /// Spawn the worker and block until its hosted loop signals ready.
    ///
    /// Only valid from `Created`. There is no timeout: use [`Self::start_within`]
    /// when a setup failure must not hang the caller.
    pub fn start(&self) -> Result<()> {
        self.spawn()?;
        self.await_start(None)
    }

    /// Like [`Self::start`], but gives up after `timeout`.
    ///
    /// On [`LifecycleError::StartTimedOut`] the worker keeps starting in the
    /// background; [`Self::wait_ready`] can be used to keep waiting.
    pub fn start_within(&self, timeout: Duration) -> Result<()> {
        self.spawn()?;
        self.await_start(Some(timeout))
    }

    /// `true` once the hosted loop has signalled ready.
    pub fn wait_ready(&self, timeout: Option<Duration>) -> bool {
        self.shared.rendezvous.await_ready(timeout)
    }

    fn spawn(&self) -> Result<()> {
        if let Err(state) = self.shared.state.transition(WorkerState::Created, WorkerState::Starting) {
            self.shared.metrics.start_rejected();
            warn!(worker_id = %self.shared.id, %state, "Start rejected");
            return Err(LifecycleError::AlreadyStarted { state });
        }

        let mut builder = thread::Builder::new().name(self.shared.name.clone());
        if let Some(size) = self.stack_size {
            builder = builder.stack_size(size);
        }

        let shared = Arc::clone(&self.shared);
        let launch = Arc::clone(&self.launch);

        // Hold the slot while spawning so is_running() never sees a gap.
        let mut thread = lock(&self.thread);
        match builder.spawn(move || worker_main(shared, launch)) {
            Ok(join) => {
                *thread = Some(join);
                self.shared.metrics.worker_started();
                info!(worker_id = %self.shared.id, worker = %self.shared.name, "Worker spawned");
                Ok(())
            }
            Err(e) => {
                if let Err(state) = self.shared.state.transition(WorkerState::Starting, WorkerState::Created) {
                    error!(worker_id = %self.shared.id, %state, "State changed during failed spawn");
                }
                error!(worker_id = %self.shared.id, error = %e, "Failed to spawn worker thread");
                Err(LifecycleError::SpawnFailed(e))
            }
        }
    }

    fn await_start(&self, timeout: Option<Duration>) -> Result<()> {
        match self.shared.rendezvous.await_readiness(timeout) {
            Some(Readiness::Ready) => Ok(()),
            Some(Readiness::Aborted) => Err(LifecycleError::ExitedBeforeReady {
                outcome: self
                    .outcome()
                    .unwrap_or_else(|| TaskOutcome::Failed("outcome not recorded".to_string())),
            }),
            None => {
                let timeout = timeout.unwrap_or_default();
                warn!(worker_id = %self.shared.id, ?timeout, "Worker did not become ready in time");
                Err(LifecycleError::StartTimedOut { timeout })
            }
        }
    }

    /// Ask the hosted task to leave its loop. Does not block.
    pub fn request_stop(&self) -> Result<()> {
        if let Err(state) = self.shared.state.transition(WorkerState::Running, WorkerState::Stopping) {
            return Err(LifecycleError::NotRunning { state });
        }

        self.shared.stop.fire(());
        self.shared.metrics.stop_requested();
        info!(worker_id = %self.shared.id, "Stop requested");
        Ok(())
    }

    /// Wait for the worker to signal termination.
    ///
    /// Returns `false` if it has not terminated within `timeout`; the worker
    /// may still be alive. `Some(Duration::ZERO)` polls, `None` waits forever.
    /// A handle that was never started returns `false` immediately.
    pub fn wait_end(&self, timeout: Option<Duration>) -> bool {
        if self.state() == WorkerState::Created {
            return false;
        }

        let terminated = self.shared.rendezvous.await_done(timeout);
        if !terminated && timeout.is_some_and(|t| !t.is_zero()) {
            self.shared.metrics.wait_end_timed_out();
            warn!(
                worker_id = %self.shared.id,
                state = %self.state(),
                ?timeout,
                "Worker did not terminate in time"
            );
        }
        terminated
    }

    /// Await termination from async code without blocking the runtime.
    ///
    /// Returns the task outcome. Combine with `tokio::time::timeout` for a
    /// bound. A handle that was never started yields `None` immediately.
    pub async fn wait_end_async(&self) -> Option<TaskOutcome> {
        if self.state() == WorkerState::Created {
            return None;
        }
        Some(self.shared.rendezvous.await_done_async().await)
    }

    /// Whether the OS thread is still alive.
    ///
    /// This can stay `true` briefly after [`Self::wait_end`] succeeds, while the
    /// thread unwinds past the done signal.
    pub fn is_running(&self) -> bool {
        lock(&self.thread)
            .as_ref()
            .is_some_and(|thread| !thread.is_finished())
    }

    /// Poll [`Self::is_running`] up to `attempts` times, sleeping `interval`
    /// between polls. `true` once the thread is gone.
    pub fn confirm_exit(&self, attempts: u32, interval: Duration) -> bool {
        for _ in 0..attempts {
            if !self.is_running() {
                return true;
            }
            thread::sleep(interval);
        }
        let exited = !self.is_running();
        if !exited {
            warn!(worker_id = %self.shared.id, attempts, "Worker thread still alive after polling");
        }
        exited
    }

    /// Request stop if running, then wait for termination.
    pub fn shutdown(&self, timeout: Option<Duration>) -> bool {
        if let Err(e) = self.request_stop() {
            debug!(worker_id = %self.shared.id, error = %e, "Stop not requested");
        }
        self.wait_end(timeout)
    }

    /// How the hosted task ended, once it has.
    pub fn outcome(&self) -> Option<TaskOutcome> {
        self.shared.rendezvous.done_payload()
    }

    /// Fire-and-forget message to the hosted task.
    pub fn post(&self, message: M) -> Result<()> {
        let state = self.state();
        if state != WorkerState::Running {
            return Err(LifecycleError::NotRunning { state });
        }
        self.outbox.post(message)
    }

    /// Send a message carrying a reply channel and block for the answer.
    ///
    /// Must not be called from inside an async runtime; use
    /// [`Self::request_async`] there.
    pub fn request<R>(&self, make: impl FnOnce(Reply<R>) -> M) -> Result<R> {
        let (tx, rx) = oneshot::channel();
        self.post(make(tx))?;
        rx.blocking_recv().map_err(|_| LifecycleError::NoReply)
    }

    pub async fn request_async<R>(&self, make: impl FnOnce(Reply<R>) -> M) -> Result<R> {
        let (tx, rx) = oneshot::channel();
        self.post(make(tx))?;
        rx.await.map_err(|_| LifecycleError::NoReply)
    }

    /// Sender usable from other threads or hosted tasks.
    pub fn outbox(&self) -> Outbox<M> {
        self.outbox.clone()
    }

    /// Reclaim the OS thread after termination.
    pub fn join(self) -> Result<TaskOutcome> {
        let state = self.state();
        if state != WorkerState::Terminated {
            return Err(LifecycleError::NotTerminated { state });
        }

        // Terminated is set just before the done signal fires.
        self.shared.rendezvous.await_done(None);

        if let Some(thread) = lock(&self.thread).take() {
            if thread.join().is_err() {
                error!(worker_id = %self.shared.id, "Worker thread panicked outside the hosted task");
            }
        }

        self.outcome().ok_or(LifecycleError::NotTerminated { state })
    }
}

impl<M: Send + 'static> Drop for WorkerHandle<M> {
    fn drop(&mut self) {
        let state = self.state();
        if matches!(state, WorkerState::Starting | WorkerState::Running) {
            self.shared.stop.fire(());
            warn!(
                worker_id = %self.shared.id,
                %state,
                "Worker handle dropped while alive, detaching thread"
            );
        }
    }
}

impl<M: Send + 'static> std::fmt::Debug for WorkerHandle<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("id", &self.shared.id)
            .field("name", &self.shared.name)
            .field("state", &self.state())
            .finish()
    }
}

fn worker_main<M: Send + 'static>(shared: Arc<WorkerShared>, launch: LaunchSlot<M>) {
    let span = info_span!("worker", worker_id = %shared.id, worker = %shared.name);
    let _entered = span.enter();

    let taken = lock(&launch).take();
    drop(launch);

    let outcome = match taken {
        Some(Launch { task, mailbox }) => {
            let ctx = TaskContext::new(Arc::clone(&shared), mailbox);
            match panic::catch_unwind(AssertUnwindSafe(move || task.run(ctx))) {
                Ok(result) => TaskOutcome::from(result),
                Err(payload) => TaskOutcome::from_panic(payload),
            }
        }
        None => TaskOutcome::Failed("hosted task already consumed".to_string()),
    };

    shared.finish(outcome);
}
