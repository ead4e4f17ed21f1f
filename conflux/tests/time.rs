use conflux::{Error, Executor, Scheduler, this_coro, time};

use std::future::Future;
use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

#[conflux::test]
async fn test_sleep_waits_at_least_duration() -> anyhow::Result<()> {
    let start = Instant::now();
    time::sleep(Duration::from_millis(50)).await?;

    assert!(start.elapsed() >= Duration::from_millis(50));
    Ok(())
}

#[conflux::test]
async fn test_zero_sleep_is_immediate() -> anyhow::Result<()> {
    let start = Instant::now();
    time::sleep(Duration::ZERO).await?;

    assert!(start.elapsed() < Duration::from_millis(50));
    Ok(())
}

#[test]
fn test_sleep_outside_executor_has_no_context() {
    let mut sleep = pin!(time::sleep(Duration::from_secs(1)));
    let mut cx = Context::from_waker(Waker::noop());

    assert!(matches!(
        sleep.as_mut().poll(&mut cx),
        Poll::Ready(Err(Error::NoContext))
    ));
}

#[test]
fn test_elapsed_deadline_is_ready_anywhere() {
    let mut sleep = pin!(time::sleep_until(Instant::now()));
    let mut cx = Context::from_waker(Waker::noop());

    assert!(matches!(sleep.as_mut().poll(&mut cx), Poll::Ready(Ok(()))));
}

#[test]
fn test_executor_wait_until() -> anyhow::Result<()> {
    let scheduler = Scheduler::with_autostart(true, 2)?;
    let executor = Executor::new(&scheduler);
    let deadline = Instant::now() + Duration::from_millis(30);

    let wait = executor.wait_until(deadline);
    assert_eq!(wait.deadline(), deadline);

    executor.block_on(wait)?;
    assert!(Instant::now() >= deadline);
    Ok(())
}

#[test]
fn test_executor_sleep_from_plain_thread_future() -> anyhow::Result<()> {
    let scheduler = Scheduler::with_autostart(true, 1)?;
    let executor = Executor::new(&scheduler);

    // Bound to a scheduler up front, so no ambient executor is needed.
    let sleep = executor.sleep(Duration::from_millis(10));
    let start = Instant::now();

    executor.block_on(async move { sleep.await })?;
    assert!(start.elapsed() >= Duration::from_millis(10));
    Ok(())
}

#[test]
fn test_concurrent_sleeps_finish_in_deadline_order() -> anyhow::Result<()> {
    let scheduler = Scheduler::with_autostart(true, 2)?;
    let executor = Executor::new(&scheduler);
    let order = Arc::new(Mutex::new(Vec::new()));

    let tasks: Vec<_> = [60u64, 20, 40]
        .into_iter()
        .map(|ms| {
            let order = order.clone();
            executor.spawn_sync(async move {
                time::sleep(Duration::from_millis(ms)).await?;
                order.lock().unwrap().push(ms);
                conflux::Result::<_>::Ok(())
            })
        })
        .collect();

    for task in tasks {
        task.wait()?;
    }

    assert_eq!(*order.lock().unwrap(), vec![20, 40, 60]);
    Ok(())
}

#[test]
fn test_sleep_on_dropped_scheduler_is_stopped() -> anyhow::Result<()> {
    let scheduler = Scheduler::with_autostart(true, 1)?;
    let executor = Executor::new(&scheduler);
    drop(scheduler);

    let mut sleep = pin!(executor.sleep(Duration::from_secs(1)));
    let mut cx = Context::from_waker(Waker::noop());

    assert!(matches!(
        sleep.as_mut().poll(&mut cx),
        Poll::Ready(Err(Error::Stopped))
    ));
    Ok(())
}

#[test]
fn test_timer_fires_while_queue_stays_busy() -> anyhow::Result<()> {
    const GIVE_UP: u64 = 5_000_000;

    let scheduler = Scheduler::with_autostart(true, 1)?;
    let executor = Executor::new(&scheduler);
    let fired = Arc::new(AtomicBool::new(false));

    let sleeper = {
        let fired = fired.clone();
        executor.spawn_sync(async move {
            time::sleep(Duration::from_millis(10)).await?;
            fired.store(true, Ordering::SeqCst);
            conflux::Result::<_>::Ok(())
        })
    };

    // Keeps the single worker's queue non-empty until the timer fires.
    let spins = executor.block_on(async move {
        let mut spins = 0u64;
        while !fired.load(Ordering::SeqCst) && spins < GIVE_UP {
            this_coro::yield_now().await;
            spins += 1;
        }
        spins
    });

    sleeper.wait()?;
    assert!(spins < GIVE_UP, "timer starved for {spins} yields");
    Ok(())
}

#[test]
fn test_later_sleep_after_dropped_sleep() -> anyhow::Result<()> {
    let scheduler = Scheduler::with_autostart(true, 1)?;
    let executor = Executor::new(&scheduler);

    let abandoned = executor.block_on(async {
        let pending = {
            let mut long = Box::pin(time::sleep(Duration::from_secs(3600)));
            let mut cx = Context::from_waker(Waker::noop());
            long.as_mut().poll(&mut cx).is_pending()
        };

        time::sleep(Duration::from_millis(5)).await?;
        conflux::Result::<_>::Ok(pending)
    })?;

    assert!(abandoned);
    Ok(())
}
