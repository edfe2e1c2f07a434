//! One-shot broadcast latch

use std::pin::pin;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;

/// A single-use, multi-waiter notification carrying a value.
///
/// The first [`Signal::fire`] stores the value and wakes every blocked and async
/// waiter; later calls are ignored. Waiters check the slot under the same mutex
/// the condition variable sleeps on, so a value fired before `wait` begins is
/// observed immediately instead of being missed.
#[derive(Debug)]
pub struct Signal<T> {
    slot: Mutex<Option<T>>,
    cond: Condvar,
    notify: Notify,
}

impl<T: Clone> Signal<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            cond: Condvar::new(),
            notify: Notify::new(),
        }
    }

    // No code path panics while holding the slot lock, so a poisoned mutex
    // still holds a consistent value.
    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fire the signal. Returns `true` only for the call that actually fired it.
    pub fn fire(&self, value: T) -> bool {
        {
            let mut slot = self.lock();
            if slot.is_some() {
                return false;
            }
            *slot = Some(value);
        }
        self.cond.notify_all();
        self.notify.notify_waiters();
        true
    }

    pub fn is_fired(&self) -> bool {
        self.lock().is_some()
    }

    /// Current value without blocking.
    pub fn peek(&self) -> Option<T> {
        self.lock().clone()
    }

    /// Block until fired or until `timeout` elapses.
    ///
    /// `None` waits forever; `Some(Duration::ZERO)` is a non-blocking poll.
    pub fn wait(&self, timeout: Option<Duration>) -> Option<T> {
        let slot = self.lock();
        let slot = match timeout {
            None => self
                .cond
                .wait_while(slot, |slot| slot.is_none())
                .unwrap_or_else(PoisonError::into_inner),
            Some(timeout) => {
                self.cond
                    .wait_timeout_while(slot, timeout, |slot| slot.is_none())
                    .unwrap_or_else(PoisonError::into_inner)
                    .0
            }
        };
        slot.clone()
    }

    /// Wait for the signal from async code without blocking the runtime thread.
    pub async fn wait_async(&self) -> T {
        loop {
            // Register interest before checking the slot: a fire between the
            // check and the await still wakes this future.
            let mut notified = pin!(self.notify.notified());
            notified.as_mut().enable();

            if let Some(value) = self.peek() {
                return value;
            }
            notified.await;
        }
    }
}

impl<T: Clone> Default for Signal<T> {
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
    fn test_fire_is_idempotent() {
        let signal = Signal::new();
        assert!(signal.fire(1));
        assert!(!signal.fire(2));
        assert_eq!(signal.peek(), Some(1));
    }

    #[test]
    fn test_wait_after_fire_returns_immediately() {
        let signal = Signal::new();
        signal.fire("ready");

        let started = Instant::now();
        assert_eq!(signal.wait(None), Some("ready"));
        assert!(started.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn test_zero_timeout_polls() {
        let signal: Signal<()> = Signal::new();
        assert_eq!(signal.wait(Some(Duration::ZERO)), None);
        signal.fire(());
        assert_eq!(signal.wait(Some(Duration::ZERO)), Some(()));
    }

    #[test]
    fn test_wait_times_out() {
        let signal: Signal<()> = Signal::new();
        let started = Instant::now();
        assert_eq!(signal.wait(Some(Duration::from_millis(30))), None);
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_wakes_all_waiters() {
        let signal = Arc::new(Signal::new());

        let waiters: Vec<_> = (0..8)
            .map(|_| {
                let signal = Arc::clone(&signal);
                thread::spawn(move || signal.wait(Some(Duration::from_secs(5))))
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        signal.fire(7u32);

        for waiter in waiters {
            assert_eq!(waiter.join().unwrap(), Some(7));
        }
    }

    #[tokio::test]
    async fn test_wait_async_sees_earlier_fire() {
        let signal = Signal::new();
        signal.fire(3u8);
        assert_eq!(signal.wait_async().await, 3);
    }

    #[tokio::test]
    async fn test_wait_async_woken_from_thread() {
        let signal = Arc::new(Signal::new());
        let firer = Arc::clone(&signal);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            firer.fire("done")
        });

        let value = tokio::time::timeout(Duration::from_secs(5), signal.wait_async())
            .await
            .unwrap();
        assert_eq!(value, "done");
        assert!(handle.join().unwrap());
    }
}
