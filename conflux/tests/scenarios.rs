use conflux::task::ExecutorTask;
use conflux::{Executor, Scheduler, this_coro};

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, PartialEq)]
struct RuntimeError(&'static str);

fn fail_with(err: RuntimeError) -> u32 {
    panic::panic_any(err)
}

fn descend(depth: usize) -> ExecutorTask<Vec<Executor>> {
    ExecutorTask::new(async move {
        let here = this_coro::executor().await;

        let mut seen = if depth == 0 {
            Vec::new()
        } else {
            descend(depth - 1).await
        };

        seen.push(here);
        seen
    })
}

#[test]
fn test_spawned_value_is_observed_by_sync_wait() -> anyhow::Result<()> {
    let scheduler = Scheduler::with_autostart(true, 1)?;
    let executor = Executor::new(&scheduler);

    let task = executor.spawn_sync(async { 42 });

    assert_eq!(task.wait(), 42);
    Ok(())
}

#[test]
fn test_ambient_executor_reaches_every_depth() -> anyhow::Result<()> {
    let scheduler = Scheduler::with_autostart(true, 2)?;
    let executor = Executor::new(&scheduler);

    let seen = executor.block_on(descend(9));

    assert_eq!(seen.len(), 10);
    assert!(seen.iter().all(|e| *e == executor));
    Ok(())
}

#[test]
fn test_panic_payload_reaches_sync_waiter_unchanged() -> anyhow::Result<()> {
    let scheduler = Scheduler::with_autostart(true, 2)?;
    let executor = Executor::new(&scheduler);

    let task = executor.spawn_sync(async { fail_with(RuntimeError("boom")) });

    let payload = panic::catch_unwind(AssertUnwindSafe(|| task.wait()))
        .expect_err("the task panic should be rethrown by wait()");

    assert_eq!(payload.downcast_ref::<RuntimeError>(), Some(&RuntimeError("boom")));
    assert!(payload.downcast_ref::<std::io::Error>().is_none());
    assert!(payload.downcast_ref::<String>().is_none());
    Ok(())
}

#[test]
fn test_hundred_tasks_increment_counter_exactly_once() -> anyhow::Result<()> {
    let scheduler = Scheduler::with_autostart(true, 4)?;
    let executor = Executor::new(&scheduler);
    let counter = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..100)
        .map(|_| {
            let counter = counter.clone();
            executor.spawn(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        })
        .collect();

    executor.block_on(async move {
        for handle in handles {
            handle.await;
        }
    });

    assert_eq!(counter.load(Ordering::SeqCst), 100);
    Ok(())
}
