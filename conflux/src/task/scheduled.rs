use super::handle::{TaskHandle, poll_rethrow};
use super::promise::{Joint, Outcome};
use crate::executor::Executor;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Handle to a task running on a scheduler, returned by
/// [`Executor::spawn`](crate::Executor::spawn).
///
/// The frame itself belongs to the scheduler; the handle only observes its
/// outcome. Awaiting it from any task yields the result no matter which
/// worker ran the body. Dropping the handle detaches the task, which keeps
/// running to completion.
#[must_use = "dropping a `ScheduledTask` detaches it"]
pub struct ScheduledTask<T> {
    joint: Arc<Joint<T>>,
    executor: Executor,
}

impl<T> ScheduledTask<T> {
    pub(crate) fn new(joint: Arc<Joint<T>>, executor: Executor) -> Self {
        Self { joint, executor }
    }

    /// Returns `true` once the body has produced its outcome.
    pub fn is_finished(&self) -> bool {
        self.joint.is_complete()
    }

    /// The executor the task was spawned through.
    pub fn executor(&self) -> &Executor {
        &self.executor
    }
}

impl<T> TaskHandle for ScheduledTask<T> {
    type Output = T;

    fn poll_outcome(&mut self, cx: &mut Context<'_>) -> Poll<Outcome<T>> {
        self.joint.poll_take(cx)
    }
}

impl<T> Future for ScheduledTask<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        poll_rethrow(self.get_mut(), cx)
    }
}

impl<T> fmt::Debug for ScheduledTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("finished", &self.is_finished())
            .finish_non_exhaustive()
    }
}
