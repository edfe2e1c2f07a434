//! Lifecycle counters and tracing setup

use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

/// Install the global `fmt` subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`. Returns `false` if a
/// subscriber was already installed (e.g. by another test).
pub fn init_tracing(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init()
        .is_ok()
}

/// Counters shared by every worker handle created with the same metrics
#[derive(Debug, Default)]
pub struct LifecycleMetrics {
    workers_started: AtomicU64,
    starts_rejected: AtomicU64,
    workers_ready: AtomicU64,
    stop_requests: AtomicU64,
    workers_terminated: AtomicU64,
    wait_end_timeouts: AtomicU64,
    tasks_failed: AtomicU64,
    tasks_panicked: AtomicU64,
}

macro_rules! counter {
    ($method:ident, $field:ident) => {
        pub fn $method(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(counter = stringify!($field), "Metric incremented");
        }
    };
}

impl LifecycleMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    counter!(worker_started, workers_started);
    counter!(start_rejected, starts_rejected);
    counter!(worker_ready, workers_ready);
    counter!(stop_requested, stop_requests);
    counter!(worker_terminated, workers_terminated);
    counter!(wait_end_timed_out, wait_end_timeouts);
    counter!(task_failed, tasks_failed);
    counter!(task_panicked, tasks_panicked);

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            workers_started: self.workers_started.load(Ordering::Relaxed),
            starts_rejected: self.starts_rejected.load(Ordering::Relaxed),
            workers_ready: self.workers_ready.load(Ordering::Relaxed),
            stop_requests: self.stop_requests.load(Ordering::Relaxed),
            workers_terminated: self.workers_terminated.load(Ordering::Relaxed),
            wait_end_timeouts: self.wait_end_timeouts.load(Ordering::Relaxed),
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
            tasks_panicked: self.tasks_panicked.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub workers_started: u64,
    pub starts_rejected: u64,
    pub workers_ready: u64,
    pub stop_requests: u64,
    pub workers_terminated: u64,
    pub wait_end_timeouts: u64,
    pub tasks_failed: u64,
    pub tasks_panicked: u64,
}
