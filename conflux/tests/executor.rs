use conflux::task::{CaptureTask, ExecutorTask, TaskHandle};
use conflux::{Error, Executor, Scheduler, foreign, this_coro};

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};
use std::thread;
use std::time::Duration;

fn worker_name() -> String {
    thread::current().name().unwrap_or_default().to_owned()
}

/// A future completed by a plain thread that belongs to no scheduler.
struct OffThread {
    state: Arc<Mutex<(bool, Option<Waker>)>>,
    spawned: bool,
}

impl OffThread {
    fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new((false, None))),
            spawned: false,
        }
    }
}

impl Future for OffThread {
    type Output = &'static str;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        {
            let mut state = this.state.lock().unwrap();
            if state.0 {
                return Poll::Ready("done");
            }
            state.1 = Some(cx.waker().clone());
        }

        if !this.spawned {
            this.spawned = true;

            let remote = this.state.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));

                let waker = {
                    let mut state = remote.lock().unwrap();
                    state.0 = true;
                    state.1.take()
                };

                if let Some(waker) = waker {
                    waker.wake();
                }
            });
        }

        Poll::Pending
    }
}

#[test]
fn test_executors_compare_by_scheduler() -> anyhow::Result<()> {
    let a = Scheduler::new(1)?;
    let b = Scheduler::new(1)?;

    assert_eq!(Executor::new(&a), Executor::new(&a));
    assert_eq!(Executor::new(&a), Executor::from_handle(a.handle()));
    assert_ne!(Executor::new(&a), Executor::new(&b));
    Ok(())
}

#[test]
fn test_schedule_is_ready_on_own_worker() -> anyhow::Result<()> {
    let scheduler = Scheduler::with_autostart(true, 1)?;
    let executor = Executor::new(&scheduler);

    let ready = executor.block_on(async {
        let mut hop = this_coro::schedule();
        let mut cx = Context::from_waker(Waker::noop());
        Pin::new(&mut hop).poll(&mut cx).is_ready()
    });

    assert!(ready);
    Ok(())
}

#[test]
fn test_schedule_hops_onto_another_scheduler() -> anyhow::Result<()> {
    let a = Scheduler::builder()
        .worker_threads(1)
        .thread_name("hop-a")
        .build()?;
    let b = Scheduler::builder()
        .worker_threads(1)
        .thread_name("hop-b")
        .build()?;

    let on_a = Executor::new(&a);
    let on_b = Executor::new(&b);

    let (before, after, owned) = on_a.block_on(async move {
        let before = worker_name();
        on_b.schedule().await;
        let after = worker_name();

        (before, after, on_b.handle().owns_thread())
    });

    assert!(before.starts_with("hop-a-"), "started on {before}");
    assert!(after.starts_with("hop-b-"), "resumed on {after}");
    assert!(owned);
    Ok(())
}

#[test]
fn test_unbound_executor_task_inherits_ambient_executor() -> anyhow::Result<()> {
    let scheduler = Scheduler::with_autostart(true, 1)?;
    let executor = Executor::new(&scheduler);

    let seen = executor.block_on(ExecutorTask::new(async { this_coro::executor().await }));

    assert_eq!(seen, executor);
    Ok(())
}

#[test]
fn test_steal_rebinds_executor_task() -> anyhow::Result<()> {
    let a = Scheduler::with_autostart(true, 1)?;
    let b = Scheduler::with_autostart(true, 1)?;
    let on_a = Executor::new(&a);
    let on_b = Executor::new(&b);

    let task = on_b.steal(ExecutorTask::new(async { this_coro::executor().await }));
    assert_eq!(task.executor(), Some(&on_b));

    // Runs on `a`, but the body sees the executor it was stolen into.
    let seen = on_a.block_on(task);
    assert_eq!(seen, on_b);
    Ok(())
}

#[test]
fn test_steal_leaves_scheduled_task_unchanged() -> anyhow::Result<()> {
    let a = Scheduler::with_autostart(true, 1)?;
    let b = Scheduler::with_autostart(true, 1)?;
    let on_a = Executor::new(&a);
    let on_b = Executor::new(&b);

    let task = on_b.steal(on_a.spawn(async { 3 }));

    assert_eq!(task.executor(), &on_a);
    assert_eq!(on_b.block_on(task), 3);
    Ok(())
}

#[test]
fn test_stolen_foreign_future_resumes_on_worker() -> anyhow::Result<()> {
    let scheduler = Scheduler::builder()
        .worker_threads(2)
        .thread_name("adopt")
        .build()?;
    let executor = Executor::new(&scheduler);
    let inner = executor.clone();

    let (value, name) = executor.block_on(async move {
        let value = inner.steal(foreign(OffThread::new())).await;
        (value, worker_name())
    });

    assert_eq!(value, "done");
    assert!(name.starts_with("adopt-"), "resumed on {name}");
    Ok(())
}

#[test]
fn test_adopt_uses_ambient_executor() -> anyhow::Result<()> {
    let scheduler = Scheduler::with_autostart(true, 1)?;
    let executor = Executor::new(&scheduler);

    let (value, owned) = executor.block_on(async {
        let adopted = this_coro::adopt(OffThread::new());
        assert!(adopted.executor().is_some());

        let value = adopted.await;
        (value, this_coro::scheduler().await.owns_thread())
    });

    assert_eq!(value, "done");
    assert!(owned);
    Ok(())
}

#[test]
fn test_this_coro_spawn_and_yield() -> anyhow::Result<()> {
    let scheduler = Scheduler::with_autostart(true, 1)?;
    let executor = Executor::new(&scheduler);
    let flag = Arc::new(AtomicBool::new(false));
    let remote = flag.clone();

    let observed = executor.block_on(async move {
        let child = this_coro::spawn(async move {
            remote.store(true, Ordering::SeqCst);
            5
        });

        // With a single worker the child runs before we are polled again.
        this_coro::yield_now().await;
        let observed = flag.load(Ordering::SeqCst);

        (observed, child.await)
    });

    assert_eq!(observed, (true, 5));
    Ok(())
}

#[test]
fn test_capture_task_runs_inline_and_catches() -> anyhow::Result<()> {
    let scheduler = Scheduler::with_autostart(true, 1)?;
    let executor = Executor::new(&scheduler);

    let (value, caught) = executor.block_on(async {
        let value = CaptureTask::new(async { 6 * 7 }).await;
        let caught = CaptureTask::<u32>::new(async { panic!("inner") })
            .catching()
            .await;

        (value, caught.map_err(|e| e.to_string()))
    });

    assert_eq!(value, 42);
    assert_eq!(caught, Err("task panicked: inner".to_owned()));
    Ok(())
}

#[test]
fn test_capture_task_extract_relinquishes_frame() {
    let task = CaptureTask::new(async { 1 });
    assert!(!task.is_done());

    let frame = task.extract();
    assert!(frame.is_some());
}

#[test]
fn test_try_executor_outside_any_task() {
    assert!(matches!(
        this_coro::try_executor().into_inner(),
        Some(Err(Error::NoContext))
    ));
}

#[test]
#[should_panic(expected = "must be called from a task running on an executor")]
fn test_executor_query_outside_any_task_panics() {
    let _ = this_coro::executor();
}

#[test]
fn test_scheduled_task_reports_finish() -> anyhow::Result<()> {
    let scheduler = Scheduler::with_autostart(true, 1)?;
    let executor = Executor::new(&scheduler);

    let task = executor.spawn(async { "x" });
    let sync = executor.spawn_sync(async {});
    sync.wait();

    // Both were queued on the single worker in order.
    assert!(task.is_finished());
    assert_eq!(executor.block_on(task), "x");
    Ok(())
}

#[test]
fn test_executor_task_reports_done() -> anyhow::Result<()> {
    let scheduler = Scheduler::with_autostart(true, 1)?;
    let executor = Executor::new(&scheduler);

    let (before, value, after) = executor.block_on(async {
        let mut task = ExecutorTask::new(async { 1 });
        let before = task.is_done();
        let value = (&mut task).await;

        (before, value, task.is_done())
    });

    assert_eq!((before, value, after), (false, 1, true));
    Ok(())
}
