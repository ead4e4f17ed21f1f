//! Ambient queries about the task currently running.
//!
//! Tasks spawned through an [`Executor`] carry it as an ambient payload:
//! it is installed around every poll of the task, and every
//! [`ExecutorTask`](crate::task::ExecutorTask) awaited inside re-installs it
//! around its own polls. The functions here read that payload, so deeply
//! nested code reaches the executor without it being threaded through
//! every signature.
//!
//! # Examples
//!
//! ```rust,ignore
//! executor.block_on(async {
//!     let executor = conflux::this_coro::executor().await;
//!     let child = conflux::this_coro::spawn(async { 1 });
//!     child.await + 1
//! });
//! ```

use crate::awaiter::{Adopted, Ready, Schedule, YieldNow};
use crate::context;
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::scheduler::Handle;
use crate::task::ScheduledTask;

use std::future::Future;

fn expect_executor(what: &str) -> Executor {
    match context::current_executor() {
        Some(executor) => executor,
        None => panic!("`this_coro::{what}` must be called from a task running on an executor"),
    }
}

/// Resolves immediately to the ambient executor.
///
/// # Panics
///
/// Panics outside of any executor context; see [`try_executor`].
pub fn executor() -> Ready<Executor> {
    Ready::new(expect_executor("executor"))
}

/// Resolves immediately to the ambient executor, or
/// [`Error::NoContext`] outside of any executor context.
pub fn try_executor() -> Ready<Result<Executor>> {
    Ready::new(context::current_executor().ok_or(Error::NoContext))
}

/// Resolves immediately to the ambient executor's scheduler.
///
/// # Panics
///
/// Panics outside of any executor context.
pub fn scheduler() -> Ready<Handle> {
    Ready::new(expect_executor("scheduler").handle().clone())
}

/// Hops onto a worker of the ambient executor's scheduler.
///
/// # Panics
///
/// Panics outside of any executor context.
pub fn schedule() -> Schedule {
    expect_executor("schedule").schedule()
}

/// Spawns `future` through the ambient executor.
///
/// # Panics
///
/// Panics outside of any executor context.
pub fn spawn<F>(future: F) -> ScheduledTask<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    expect_executor("spawn").spawn(future)
}

/// Wraps a foreign future so the caller resumes on the ambient executor's
/// scheduler once it completes.
///
/// Outside of any executor context the future is returned unwrapped in
/// behavior: it completes wherever it is polled.
pub fn adopt<F: Future>(future: F) -> Adopted<F> {
    Adopted::new(future, context::current_executor())
}

/// Yields back to the scheduler once.
pub fn yield_now() -> YieldNow {
    YieldNow::new()
}
