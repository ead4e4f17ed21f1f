use super::promise::Outcome;

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Common surface of every task handle.
///
/// A handle is the single owner of one task. It is never `Clone`: moving
/// the handle moves the right to observe the task's outcome.
///
/// Awaiting a handle directly yields the task's value and rethrows a
/// captured panic with its original payload. [`catching`](Self::catching)
/// yields the [`Outcome`] instead, for callers that want to inspect the
/// failure without unwinding.
pub trait TaskHandle: Unpin + Sized {
    /// The value produced by the task body.
    type Output;

    /// Polls for the task's outcome.
    ///
    /// Returns `Pending` and records the caller as the continuation if the
    /// task has not completed yet.
    ///
    /// # Panics
    ///
    /// Panics if polled again after the outcome was delivered.
    fn poll_outcome(&mut self, cx: &mut Context<'_>) -> Poll<Outcome<Self::Output>>;

    /// Wraps the handle in a future that yields the [`Outcome`].
    fn catching(self) -> Catching<Self> {
        Catching { handle: self }
    }
}

/// Future returned by [`TaskHandle::catching`].
#[must_use = "futures do nothing unless awaited"]
pub struct Catching<H> {
    handle: H,
}

impl<H: TaskHandle> Future for Catching<H> {
    type Output = Outcome<H::Output>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.handle.poll_outcome(cx)
    }
}

/// Resolves a handle's outcome the way an `.await` on it does.
pub(crate) fn poll_rethrow<H: TaskHandle>(handle: &mut H, cx: &mut Context<'_>) -> Poll<H::Output> {
    match handle.poll_outcome(cx) {
        Poll::Ready(Ok(value)) => Poll::Ready(value),
        Poll::Ready(Err(err)) => err.resume(),
        Poll::Pending => Poll::Pending,
    }
}
