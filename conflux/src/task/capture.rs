use super::handle::{TaskHandle, poll_rethrow};
use super::promise::{CatchUnwind, Outcome};

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A boxed, type-erased frame that reports panics through its [`Outcome`].
pub type Frame<T> = Pin<Box<dyn Future<Output = Outcome<T>> + Send + 'static>>;

/// A plain task with no executor affinity.
///
/// The body does not start until the handle is first polled, and it runs on
/// whatever thread polls it. Dropping a handle whose body has not finished
/// drops the body with it.
///
/// # Examples
///
/// ```rust,ignore
/// let task = CaptureTask::new(async { 6 * 7 });
/// assert_eq!(task.await, 42);
/// ```
#[must_use = "tasks do nothing unless awaited"]
pub struct CaptureTask<T> {
    frame: Option<Frame<T>>,
    done: bool,
}

impl<T: Send + 'static> CaptureTask<T> {
    /// Wraps `future` in a new, not yet started task.
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            frame: Some(Box::pin(CatchUnwind::new(future))),
            done: false,
        }
    }
}

impl<T> CaptureTask<T> {
    /// Relinquishes ownership of the frame.
    ///
    /// Returns `None` once the task has completed or was already extracted.
    pub fn extract(mut self) -> Option<Frame<T>> {
        self.frame.take()
    }

    /// Returns `true` once the body has produced its outcome.
    pub fn is_done(&self) -> bool {
        self.done
    }
}

impl<T> TaskHandle for CaptureTask<T> {
    type Output = T;

    fn poll_outcome(&mut self, cx: &mut Context<'_>) -> Poll<Outcome<T>> {
        let Some(frame) = self.frame.as_mut() else {
            panic!("`CaptureTask` polled after completion");
        };

        let outcome = match frame.as_mut().poll(cx) {
            Poll::Ready(outcome) => outcome,
            Poll::Pending => return Poll::Pending,
        };

        self.frame = None;
        self.done = true;

        Poll::Ready(outcome)
    }
}

impl<T> Future for CaptureTask<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        poll_rethrow(self.get_mut(), cx)
    }
}

impl<T> fmt::Debug for CaptureTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureTask")
            .field("done", &self.done)
            .field("owned", &self.frame.is_some())
            .finish()
    }
}
