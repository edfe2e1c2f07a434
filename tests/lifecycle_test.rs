//! Launcher-side lifecycle tests against the public API

use lifeline::hosted::{Action, EventLoop, LoopCommand};
use lifeline::observability::LifecycleMetrics;
use lifeline::worker::{
    LifecycleError, TaskContext, TaskOutcome, TaskResult, WorkerHandle, WorkerOptions, WorkerState,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::{Duration, Instant};

const GENEROUS: Option<Duration> = Some(Duration::from_secs(10));

fn idle_until_stopped(ctx: TaskContext<()>) -> TaskResult {
    ctx.ready.signal_ready();
    ctx.stop.wait(None);
    Ok(())
}

#[test]
fn start_returns_only_after_ready_signal() {
    let signalled_at: Arc<Mutex<Option<Instant>>> = Arc::new(Mutex::new(None));
    let recorder = Arc::clone(&signalled_at);

    let handle = WorkerHandle::new(move |ctx: TaskContext<()>| {
        // Slow setup before the loop is live.
        thread::sleep(Duration::from_millis(30));
        *recorder.lock().unwrap() = Some(Instant::now());
        ctx.ready.signal_ready();
        ctx.stop.wait(None);
        Ok(())
    });

    handle.start().unwrap();
    let returned_at = Instant::now();

    let signalled_at = signalled_at.lock().unwrap().expect("ready timestamp recorded");
    assert!(signalled_at <= returned_at);
    assert_eq!(handle.state(), WorkerState::Running);

    assert!(handle.shutdown(GENEROUS));
}

#[test]
fn second_start_is_rejected_without_new_thread() {
    let entries = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&entries);

    let handle = WorkerHandle::new(move |ctx: TaskContext<()>| {
        counter.fetch_add(1, Ordering::SeqCst);
        idle_until_stopped(ctx)
    });

    handle.start().unwrap();
    assert!(matches!(
        handle.start(),
        Err(LifecycleError::AlreadyStarted {
            state: WorkerState::Running
        })
    ));

    assert!(handle.shutdown(GENEROUS));
    assert!(matches!(handle.start(), Err(LifecycleError::AlreadyStarted { .. })));
    assert_eq!(entries.load(Ordering::SeqCst), 1);
    assert_eq!(handle.metrics().snapshot().workers_started, 1);
    assert_eq!(handle.metrics().snapshot().starts_rejected, 2);
}

#[test]
fn concurrent_starts_spawn_exactly_one_worker() {
    let entries = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&entries);

    let handle = Arc::new(WorkerHandle::new(move |ctx: TaskContext<()>| {
        counter.fetch_add(1, Ordering::SeqCst);
        idle_until_stopped(ctx)
    }));

    let barrier = Arc::new(Barrier::new(2));
    let launchers: Vec<_> = (0..2)
        .map(|_| {
            let handle = Arc::clone(&handle);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                handle.start()
            })
        })
        .collect();

    let results: Vec<_> = launchers.into_iter().map(|l| l.join().unwrap()).collect();
    let ok = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(LifecycleError::AlreadyStarted { .. })))
        .count();

    assert_eq!(ok, 1);
    assert_eq!(rejected, 1);

    assert!(handle.shutdown(GENEROUS));
    assert_eq!(entries.load(Ordering::SeqCst), 1);
}

#[test]
fn zero_timeout_wait_end_before_stop_is_false() {
    let handle = WorkerHandle::new(idle_until_stopped);
    handle.start().unwrap();

    for _ in 0..1000 {
        assert!(!handle.wait_end(Some(Duration::ZERO)));
    }
    assert_eq!(handle.state(), WorkerState::Running);
    // Polls are not timeouts.
    assert_eq!(handle.metrics().snapshot().wait_end_timeouts, 0);

    assert!(handle.shutdown(GENEROUS));
}

#[test]
fn thread_exits_after_confirmed_termination() {
    let handle = WorkerHandle::new(idle_until_stopped);
    handle.start().unwrap();

    handle.request_stop().unwrap();
    assert!(handle.wait_end(GENEROUS));
    assert!(handle.confirm_exit(200, Duration::from_millis(5)));
    assert!(!handle.is_running());

    // Later waits see the same single termination.
    assert!(handle.wait_end(Some(Duration::ZERO)));
    assert_eq!(handle.metrics().snapshot().workers_terminated, 1);
    assert!(matches!(
        handle.request_stop(),
        Err(LifecycleError::NotRunning {
            state: WorkerState::Terminated
        })
    ));
    assert_eq!(handle.join().unwrap(), TaskOutcome::Completed);
}

#[test]
fn early_ready_signal_is_not_missed() {
    let handle = WorkerHandle::new(|ctx: TaskContext<()>| {
        ctx.ready.signal_ready();
        thread::sleep(Duration::from_millis(50));
        Ok(())
    });

    let started = Instant::now();
    handle.start().unwrap();
    assert!(started.elapsed() < Duration::from_millis(50));

    assert!(handle.wait_end(GENEROUS));
    assert_eq!(handle.outcome(), Some(TaskOutcome::Completed));
}

#[test]
fn wait_end_times_out_while_worker_ignores_stop() {
    let release = Arc::new(Barrier::new(2));
    let worker_release = Arc::clone(&release);

    let handle = WorkerHandle::new(move |ctx: TaskContext<()>| {
        ctx.ready.signal_ready();
        worker_release.wait();
        Ok(())
    });
    handle.start().unwrap();
    handle.request_stop().unwrap();

    assert!(!handle.wait_end(Some(Duration::from_millis(20))));
    assert_eq!(handle.state(), WorkerState::Stopping);
    assert_eq!(handle.metrics().snapshot().wait_end_timeouts, 1);

    release.wait();
    assert!(handle.wait_end(GENEROUS));
}

#[test]
fn many_waiters_observe_termination() {
    let handle = Arc::new(WorkerHandle::new(idle_until_stopped));
    handle.start().unwrap();

    let waiters: Vec<_> = (0..8)
        .map(|_| {
            let handle = Arc::clone(&handle);
            thread::spawn(move || handle.wait_end(GENEROUS))
        })
        .collect();

    handle.request_stop().unwrap();
    for waiter in waiters {
        assert!(waiter.join().unwrap());
    }
}

#[test]
fn hundred_workers_start_and_stop_concurrently() {
    const WORKERS: usize = 100;
    let metrics = Arc::new(LifecycleMetrics::new());
    let barrier = Arc::new(Barrier::new(WORKERS));

    let launchers: Vec<_> = (0..WORKERS)
        .map(|i| {
            let metrics = Arc::clone(&metrics);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let options = WorkerOptions::builder()
                    .name(format!("stress-{i}"))
                    .metrics(metrics)
                    .build();
                let handle = WorkerHandle::with_options(idle_until_stopped, options);

                barrier.wait();
                handle.start().unwrap();
                handle.request_stop().unwrap();
                assert!(handle.wait_end(GENEROUS));
                assert!(handle.confirm_exit(1000, Duration::from_millis(5)));
                handle.join().unwrap()
            })
        })
        .collect();

    for launcher in launchers {
        assert_eq!(launcher.join().unwrap(), TaskOutcome::Completed);
    }

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.workers_started, WORKERS as u64);
    assert_eq!(snapshot.workers_ready, WORKERS as u64);
    assert_eq!(snapshot.workers_terminated, WORKERS as u64);
    assert_eq!(snapshot.stop_requests, WORKERS as u64);
}

#[test]
fn hosted_loop_state_is_reached_only_through_messages() {
    let handle = WorkerHandle::new(EventLoop::new(Duration::from_millis(5)));
    handle.start().unwrap();

    for name in ["box", "sphere", "cone", "cylinder"] {
        handle.post(LoopCommand::Apply(Action::Show(name.to_string()))).unwrap();
    }
    let snapshot = handle.request(LoopCommand::Snapshot).unwrap();
    assert_eq!(snapshot.items.len(), 4);

    assert!(handle.shutdown(GENEROUS));
    assert!(matches!(
        handle.post(LoopCommand::Apply(Action::Refresh)),
        Err(LifecycleError::NotRunning { .. })
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn async_launcher_can_request_and_await() {
    let handle = WorkerHandle::new(EventLoop::default());
    handle.start().unwrap();

    handle.post(LoopCommand::Apply(Action::Show("torus".into()))).unwrap();
    let snapshot = handle.request_async(LoopCommand::Snapshot).await.unwrap();
    assert_eq!(snapshot.items, vec!["torus".to_string()]);

    handle.request_stop().unwrap();
    let outcome = tokio::time::timeout(Duration::from_secs(10), handle.wait_end_async())
        .await
        .unwrap();
    assert_eq!(outcome, Some(TaskOutcome::Completed));
}
