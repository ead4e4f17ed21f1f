use crate::awaiter::{Adopted, Schedule, WaitHandle, WaitUntil};
use crate::reactor::NativeHandle;
use crate::scheduler::{Handle, Scheduler};
use crate::task::promise::{Harness, Joint};
use crate::task::raw::RawTask;
use crate::task::{ExecutorTask, ScheduledTask, SyncTask};

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Binds the ambient task context to one scheduler.
///
/// An executor is a cheap, cloneable façade over a scheduler handle. Tasks
/// spawned through it run on that scheduler with the executor installed as
/// their ambient context, so code inside them can reach it through
/// [`this_coro`](crate::this_coro) without passing it around.
///
/// Two executors compare equal when they are bound to the same scheduler.
///
/// # Examples
///
/// ```rust,ignore
/// let scheduler = Scheduler::with_autostart(true, 2)?;
/// let executor = Executor::new(&scheduler);
///
/// let task = executor.spawn(async { 6 * 7 });
/// assert_eq!(executor.block_on(task), 42);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Executor {
    handle: Handle,
}

impl Executor {
    /// Creates an executor bound to `scheduler`.
    pub fn new(scheduler: &Scheduler) -> Self {
        Self {
            handle: scheduler.handle(),
        }
    }

    /// Creates an executor bound to the scheduler behind `handle`.
    pub fn from_handle(handle: Handle) -> Self {
        Self { handle }
    }

    /// The scheduler this executor is bound to.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Returns an awaiter that moves the awaiting task onto this
    /// executor's scheduler.
    pub fn schedule(&self) -> Schedule {
        Schedule::new(self.handle.clone())
    }

    /// Posts `future` onto the scheduler and returns a handle to its
    /// outcome. The body starts running without being awaited.
    pub fn spawn<F>(&self, future: F) -> ScheduledTask<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let joint = Arc::new(Joint::new());
        self.launch(future, joint.clone());

        ScheduledTask::new(joint, self.clone())
    }

    /// Like [`spawn`](Self::spawn), but the handle can also be waited on
    /// from a plain thread.
    pub fn spawn_sync<F>(&self, future: F) -> SyncTask<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let joint = Arc::new(Joint::with_fence());
        self.launch(future, joint.clone());

        SyncTask::new(joint)
    }

    /// Runs `future` on the scheduler and blocks the calling thread until
    /// it completes.
    ///
    /// A panic raised by the future is rethrown here. Must not be called
    /// from one of the scheduler's own workers.
    pub fn block_on<F>(&self, future: F) -> F::Output
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.spawn_sync(future).wait()
    }

    /// Transfers an awaitable under this executor's control.
    ///
    /// - an [`ExecutorTask`] is rebound to this executor,
    /// - a [`ScheduledTask`] already carries its executor and is returned
    ///   unchanged,
    /// - a [`Foreign`] future is wrapped in an [`Adopted`] that hops back
    ///   onto this scheduler before resuming.
    pub fn steal<A: Steal>(&self, awaitable: A) -> A::Output {
        awaitable.steal_into(self)
    }

    /// Enqueues a plain closure on the scheduler.
    pub fn post<F>(&self, work: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.handle.post(work);
    }

    /// Returns an awaiter that resumes at or after `deadline`.
    pub fn wait_until(&self, deadline: Instant) -> WaitUntil {
        WaitUntil::new(deadline, Some(self.handle.clone()))
    }

    /// Returns an awaiter that resumes once `duration` has elapsed.
    pub fn sleep(&self, duration: Duration) -> WaitUntil {
        WaitUntil::after(duration, Some(self.handle.clone()))
    }

    /// Returns an awaiter that resumes once `native` becomes ready.
    pub fn wait_handle(&self, native: NativeHandle) -> WaitHandle {
        WaitHandle::new(native, Some(self.handle.clone()))
    }

    fn launch<F>(&self, future: F, joint: Arc<Joint<F::Output>>)
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let frame = Harness::new(future, joint);
        let task = RawTask::new(frame, self.handle.clone(), Some(self.clone()));

        self.handle.push_task(task);
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Executor").field(&self.handle).finish()
    }
}

/// Awaitables that [`Executor::steal`] knows how to take over.
pub trait Steal {
    /// What the awaitable becomes once bound to the executor.
    type Output;

    fn steal_into(self, executor: &Executor) -> Self::Output;
}

impl<T> Steal for ExecutorTask<T> {
    type Output = ExecutorTask<T>;

    fn steal_into(self, executor: &Executor) -> ExecutorTask<T> {
        self.with_executor(executor.clone())
    }
}

impl<T> Steal for ScheduledTask<T> {
    type Output = ScheduledTask<T>;

    fn steal_into(self, _executor: &Executor) -> ScheduledTask<T> {
        self
    }
}

/// Marks a future as foreign to this runtime, see [`foreign`].
#[derive(Debug)]
pub struct Foreign<F>(F);

/// Marks `future` as foreign so [`Executor::steal`] wraps it in an
/// [`Adopted`].
pub fn foreign<F: Future>(future: F) -> Foreign<F> {
    Foreign(future)
}

impl<F: Future> Steal for Foreign<F> {
    type Output = Adopted<F>;

    fn steal_into(self, executor: &Executor) -> Adopted<F> {
        Adopted::new(self.0, Some(executor.clone()))
    }
}
