use crate::executor::Executor;
use crate::task::raw::RawTask;

use std::cell::{Cell, RefCell};
use std::sync::Arc;

thread_local! {
    /// Ambient executor of the task currently being polled.
    ///
    /// Installed around every poll of a task spawned through an executor
    /// and re-installed by each [`ExecutorTask`](crate::task::ExecutorTask)
    /// around its own polls. This is the payload answered by
    /// [`this_coro`](crate::this_coro) queries.
    static CURRENT_EXECUTOR: RefCell<Option<Executor>> = const { RefCell::new(None) };

    /// Scheduler-owned task whose frame is being polled on this thread.
    ///
    /// Schedule hops use it to re-home the task before suspending.
    static CURRENT_TASK: RefCell<Option<Arc<RawTask>>> = const { RefCell::new(None) };

    /// Identifier of the scheduler whose run loop this thread is inside.
    static CURRENT_SCHEDULER: Cell<Option<usize>> = const { Cell::new(None) };
}

/// Restores the previous executor when dropped, including on unwind.
struct ExecutorReset(Option<Executor>);

impl Drop for ExecutorReset {
    fn drop(&mut self) {
        let prev = self.0.take();
        CURRENT_EXECUTOR.with(|cell| *cell.borrow_mut() = prev);
    }
}

struct TaskReset(Option<Arc<RawTask>>);

impl Drop for TaskReset {
    fn drop(&mut self) {
        let prev = self.0.take();
        CURRENT_TASK.with(|cell| *cell.borrow_mut() = prev);
    }
}

/// Marks the current thread as a worker of a scheduler until dropped.
pub(crate) struct SchedulerGuard(Option<usize>);

impl Drop for SchedulerGuard {
    fn drop(&mut self) {
        CURRENT_SCHEDULER.with(|cell| cell.set(self.0));
    }
}

/// Returns a clone of the ambient executor, if any.
pub(crate) fn current_executor() -> Option<Executor> {
    CURRENT_EXECUTOR.with(|cell| cell.borrow().clone())
}

/// Returns the scheduler-owned task being polled on this thread, if any.
pub(crate) fn current_task() -> Option<Arc<RawTask>> {
    CURRENT_TASK.with(|cell| cell.borrow().clone())
}

/// Returns the id of the scheduler whose run loop owns this thread.
pub(crate) fn current_scheduler() -> Option<usize> {
    CURRENT_SCHEDULER.with(Cell::get)
}

/// Runs `f` with `executor` installed as the ambient executor.
///
/// The previous executor is restored afterwards, even if `f` unwinds.
pub(crate) fn enter_executor<R>(executor: Executor, f: impl FnOnce() -> R) -> R {
    let prev = CURRENT_EXECUTOR.with(|cell| cell.replace(Some(executor)));
    let _reset = ExecutorReset(prev);

    f()
}

/// Runs `f` while `task` is recorded as the task being polled.
pub(crate) fn enter_task<R>(task: Arc<RawTask>, f: impl FnOnce() -> R) -> R {
    let prev = CURRENT_TASK.with(|cell| cell.replace(Some(task)));
    let _reset = TaskReset(prev);

    f()
}

/// Records the current thread as a worker of scheduler `id`.
pub(crate) fn enter_scheduler(id: usize) -> SchedulerGuard {
    SchedulerGuard(CURRENT_SCHEDULER.with(|cell| cell.replace(Some(id))))
}
