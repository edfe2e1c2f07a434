//! Ready/done rendezvous between a launcher and its worker thread
//!
//! A worker reaches two milestones the launcher waits on: "ready" (its loop is
//! live and accepting work) and "done" (it has unwound). Each milestone is a
//! [`Signal`]: fired once, observed by any number of waiters, never missed.

mod signal;

pub use signal::Signal;

use std::time::Duration;
use tracing::debug;

/// What the ready signal carried when it fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The hosted loop reported itself live.
    Ready,
    /// The worker exited without ever becoming ready.
    Aborted,
}

/// Pair of one-shot signals shared by a launcher and one worker.
///
/// `D` is the payload recorded on termination.
#[derive(Debug)]
pub struct Rendezvous<D> {
    ready: Signal<Readiness>,
    done: Signal<D>,
}

impl<D: Clone> Rendezvous<D> {
    pub fn new() -> Self {
        Self {
            ready: Signal::new(),
            done: Signal::new(),
        }
    }

    /// Mark the worker live. Returns `true` on the first call only.
    pub fn signal_ready(&self) -> bool {
        let fired = self.ready.fire(Readiness::Ready);
        if fired {
            debug!("Ready signal fired");
        }
        fired
    }

    /// Release ready-waiters because the worker will never become ready.
    ///
    /// No-op if the worker already signalled ready.
    pub fn abort_ready(&self) -> bool {
        self.ready.fire(Readiness::Aborted)
    }

    /// `true` once the worker signalled ready (an aborted start does not count).
    pub fn await_ready(&self, timeout: Option<Duration>) -> bool {
        self.ready.wait(timeout) == Some(Readiness::Ready)
    }

    /// Block until the ready signal fires either way, returning what it carried.
    pub fn await_readiness(&self, timeout: Option<Duration>) -> Option<Readiness> {
        self.ready.wait(timeout)
    }

    pub fn readiness(&self) -> Option<Readiness> {
        self.ready.peek()
    }

    /// Record termination. Returns `true` on the first call only.
    pub fn signal_done(&self, payload: D) -> bool {
        let fired = self.done.fire(payload);
        if fired {
            debug!("Done signal fired");
        }
        fired
    }

    pub fn await_done(&self, timeout: Option<Duration>) -> bool {
        self.done.wait(timeout).is_some()
    }

    pub async fn await_done_async(&self) -> D {
        self.done.wait_async().await
    }

    pub fn done_payload(&self) -> Option<D> {
        self.done.peek()
    }
}

impl<D: Clone> Default for Rendezvous<D> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_ready_before_wait_is_not_missed() {
        let rendezvous: Rendezvous<()> = Rendezvous::new();
        assert!(rendezvous.signal_ready());

        let started = Instant::now();
        assert!(rendezvous.await_ready(None));
        assert!(started.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn test_abort_does_not_count_as_ready() {
        let rendezvous: Rendezvous<()> = Rendezvous::new();
        assert!(rendezvous.abort_ready());
        assert!(!rendezvous.await_ready(Some(Duration::ZERO)));
        assert_eq!(rendezvous.readiness(), Some(Readiness::Aborted));
    }

    #[test]
    fn test_abort_after_ready_is_ignored() {
        let rendezvous: Rendezvous<()> = Rendezvous::new();
        rendezvous.signal_ready();
        assert!(!rendezvous.abort_ready());
        assert_eq!(rendezvous.readiness(), Some(Readiness::Ready));
    }

    #[test]
    fn test_done_fires_once() {
        let rendezvous = Rendezvous::new();
        assert!(rendezvous.signal_done("first"));
        assert!(!rendezvous.signal_done("second"));
        assert_eq!(rendezvous.done_payload(), Some("first"));
    }

    #[test]
    fn test_await_done_zero_timeout_before_done() {
        let rendezvous: Rendezvous<()> = Rendezvous::new();
        for _ in 0..100 {
            assert!(!rendezvous.await_done(Some(Duration::ZERO)));
        }
    }

    #[tokio::test]
    async fn test_await_done_async_sees_payload_from_thread() {
        let rendezvous = Arc::new(Rendezvous::<u32>::new());
        let worker = Arc::clone(&rendezvous);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            worker.signal_done(7);
        });

        assert_eq!(rendezvous.await_done_async().await, 7);
        // Already fired: resolves immediately.
        assert_eq!(rendezvous.await_done_async().await, 7);
        handle.join().unwrap();
    }

    #[test]
    fn test_cross_thread_handshake() {
        let rendezvous = Arc::new(Rendezvous::<u32>::new());
        let worker = Arc::clone(&rendezvous);

        let handle = thread::spawn(move || {
            worker.signal_ready();
            thread::sleep(Duration::from_millis(10));
            worker.signal_done(42);
        });

        assert!(rendezvous.await_ready(Some(Duration::from_secs(5))));
        assert!(rendezvous.await_done(Some(Duration::from_secs(5))));
        assert_eq!(rendezvous.done_payload(), Some(42));
        handle.join().unwrap();
    }
}
