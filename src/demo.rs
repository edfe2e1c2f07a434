//! Demo launcher: event loops driven by a scripted console
//!
//! Exercises the whole lifecycle from the launcher's side: bounded or
//! unbounded start, messaging, bounded shutdown confirmation and exit polling.

use crate::config::{Config, LifecycleConfig, ValidationError};
use crate::hosted::{Console, EventLoop, LoopCommand, LoopSnapshot};
use crate::observability::{LifecycleMetrics, MetricsSnapshot};
use crate::worker::{HostedTask, LifecycleError, TaskOutcome, WorkerHandle, WorkerState};
use serde::Serialize;
use std::io::Cursor;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum DemoError {
    #[error("Failed to start {worker}: {source}")]
    Start {
        worker: String,
        #[source]
        source: LifecycleError,
    },

    #[error("Invalid options for {worker}: {source}")]
    Options {
        worker: String,
        #[source]
        source: ValidationError,
    },
}

/// What happened to one worker over the demo run
#[derive(Debug, Clone, Serialize)]
pub struct WorkerReport {
    pub name: String,
    pub state: WorkerState,
    /// `wait_end` observed termination within the configured bound.
    pub terminated: bool,
    /// The OS thread was confirmed gone.
    pub exited: bool,
    pub outcome: Option<TaskOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<LoopSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DemoReport {
    pub console: WorkerReport,
    pub viewers: Vec<WorkerReport>,
    pub metrics: MetricsSnapshot,
}

impl DemoReport {
    /// Every worker terminated and its thread exited.
    pub fn is_clean(&self) -> bool {
        std::iter::once(&self.console)
            .chain(&self.viewers)
            .all(|w| w.terminated && w.exited)
    }
}

fn launch<M: Send + 'static>(
    lifecycle: &LifecycleConfig,
    task: impl HostedTask<M>,
    name: String,
    metrics: &Arc<LifecycleMetrics>,
) -> Result<WorkerHandle<M>, DemoError> {
    let options = lifecycle
        .worker_options(name.clone(), Arc::clone(metrics))
        .map_err(|source| DemoError::Options {
            worker: name.clone(),
            source,
        })?;
    let handle = WorkerHandle::with_options(task, options);

    let started = match lifecycle.start_timeout {
        Some(timeout) => handle.start_within(timeout.as_duration()),
        None => handle.start(),
    };

    started.map_err(|source| DemoError::Start { worker: name, source })?;
    Ok(handle)
}

fn finish<M: Send + 'static>(
    lifecycle: &LifecycleConfig,
    handle: &WorkerHandle<M>,
    snapshot: Option<LoopSnapshot>,
) -> WorkerReport {
    let terminated = handle.shutdown(Some(lifecycle.wait_end_timeout.as_duration()));
    let exited = terminated
        && handle.confirm_exit(
            lifecycle.exit_poll_attempts,
            lifecycle.exit_poll_interval.as_duration(),
        );

    if !terminated {
        // Nothing more to do but leave the thread behind.
        warn!(worker = handle.name(), state = %handle.state(), "Abandoning unresponsive worker");
    }

    WorkerReport {
        name: handle.name().to_string(),
        state: handle.state(),
        terminated,
        exited,
        outcome: handle.outcome(),
        snapshot,
    }
}

/// Run the demo described by `config.demo`.
pub fn run(config: &Config) -> Result<DemoReport, DemoError> {
    let lifecycle = &config.lifecycle;
    let metrics = Arc::new(LifecycleMetrics::new());

    let mut viewers = Vec::with_capacity(config.demo.viewers);
    for index in 0..config.demo.viewers {
        let task = EventLoop::new(config.demo.tick.as_duration());
        viewers.push(launch(lifecycle, task, format!("viewer-{index}"), &metrics)?);
    }
    info!(viewers = viewers.len(), "Viewers running");

    let script = config.demo.script.join("\n");
    let outboxes = viewers.iter().map(WorkerHandle::outbox).collect();
    let console = launch(
        lifecycle,
        Console::new(Cursor::new(script), outboxes),
        "console".to_string(),
        &metrics,
    )?;

    // The console ends by itself once the script is consumed; stopping it
    // earlier would cut the script short.
    if !console.wait_end(Some(lifecycle.wait_end_timeout.as_duration())) {
        warn!("Console still running after script, stopping it");
    }
    let console_report = finish(lifecycle, &console, None);

    let viewer_reports = viewers
        .iter()
        .map(|viewer| {
            let snapshot = match viewer.request(LoopCommand::Snapshot) {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    warn!(worker = viewer.name(), error = %e, "No snapshot");
                    None
                }
            };
            finish(lifecycle, viewer, snapshot)
        })
        .collect();

    Ok(DemoReport {
        console: console_report,
        viewers: viewer_reports,
        metrics: metrics.snapshot(),
    })
}
