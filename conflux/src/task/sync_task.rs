use super::handle::{TaskHandle, poll_rethrow};
use super::promise::{Joint, Outcome};

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Handle to a scheduled task that a plain thread can block on.
///
/// Returned by [`Executor::spawn_sync`](crate::Executor::spawn_sync). The
/// promise carries a [`Fence`](crate::sync::Fence) signaled once the outcome
/// is stored, so [`wait`](Self::wait) parks the calling thread instead of
/// polling. The handle is also a future and can be awaited like a
/// [`ScheduledTask`](super::ScheduledTask).
///
/// Blocking on a task from one of its own scheduler's workers ties up that
/// worker; with a single worker it deadlocks.
#[must_use = "dropping a `SyncTask` detaches it"]
pub struct SyncTask<T> {
    joint: Arc<Joint<T>>,
}

impl<T> SyncTask<T> {
    pub(crate) fn new(joint: Arc<Joint<T>>) -> Self {
        Self { joint }
    }

    /// Blocks until the task completes and returns its value.
    ///
    /// A panic raised by the body is rethrown here with its original
    /// payload.
    pub fn wait(self) -> T {
        match self.try_wait() {
            Ok(value) => value,
            Err(err) => err.resume(),
        }
    }

    /// Blocks until the task completes and returns its [`Outcome`].
    pub fn try_wait(self) -> Outcome<T> {
        self.joint.wait()
    }

    /// Non-blocking check of the completion fence.
    pub fn is_ready(&self) -> bool {
        self.joint.is_complete()
    }
}

impl<T> TaskHandle for SyncTask<T> {
    type Output = T;

    fn poll_outcome(&mut self, cx: &mut Context<'_>) -> Poll<Outcome<T>> {
        self.joint.poll_take(cx)
    }
}

impl<T> Future for SyncTask<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        poll_rethrow(self.get_mut(), cx)
    }
}

impl<T> fmt::Debug for SyncTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncTask")
            .field("ready", &self.is_ready())
            .finish()
    }
}
