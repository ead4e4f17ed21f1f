use super::capture::{CaptureTask, Frame};
use super::handle::{TaskHandle, poll_rethrow};
use super::promise::Outcome;
use crate::context;
use crate::executor::Executor;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A task that carries the ambient executor.
///
/// On its first poll an unbound `ExecutorTask` adopts the executor of the
/// task awaiting it. Every poll then installs that executor as the ambient
/// context, so [`this_coro`](crate::this_coro) queries made anywhere inside
/// the body (including nested `ExecutorTask`s) resolve to it.
///
/// [`Executor::steal`](crate::Executor::steal) or [`bind`](Self::bind)
/// rebind the task explicitly.
///
/// # Examples
///
/// ```rust,ignore
/// fn depth(n: usize) -> ExecutorTask<usize> {
///     ExecutorTask::new(async move {
///         if n == 0 { 0 } else { depth(n - 1).await + 1 }
///     })
/// }
/// ```
#[must_use = "tasks do nothing unless awaited"]
pub struct ExecutorTask<T> {
    inner: CaptureTask<T>,
    executor: Option<Executor>,
}

impl<T: Send + 'static> ExecutorTask<T> {
    /// Creates an unbound task.
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            inner: CaptureTask::new(future),
            executor: None,
        }
    }
}

impl<T> ExecutorTask<T> {
    /// Binds the task to `executor`, replacing any previous binding.
    pub fn bind(&mut self, executor: Executor) {
        self.executor = Some(executor);
    }

    /// Builder-style form of [`bind`](Self::bind).
    pub fn with_executor(mut self, executor: Executor) -> Self {
        self.bind(executor);
        self
    }

    /// The executor this task is bound to, if any.
    pub fn executor(&self) -> Option<&Executor> {
        self.executor.as_ref()
    }

    /// Relinquishes ownership of the frame, dropping the binding.
    pub fn extract(self) -> Option<Frame<T>> {
        self.inner.extract()
    }

    /// Returns `true` once the body has produced its outcome.
    pub fn is_done(&self) -> bool {
        self.inner.is_done()
    }
}

impl<T> TaskHandle for ExecutorTask<T> {
    type Output = T;

    fn poll_outcome(&mut self, cx: &mut Context<'_>) -> Poll<Outcome<T>> {
        if self.executor.is_none() {
            self.executor = context::current_executor();
        }

        match self.executor.clone() {
            Some(executor) => context::enter_executor(executor, || self.inner.poll_outcome(cx)),
            None => self.inner.poll_outcome(cx),
        }
    }
}

impl<T> Future for ExecutorTask<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        poll_rethrow(self.get_mut(), cx)
    }
}

impl<T> fmt::Debug for ExecutorTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorTask")
            .field("inner", &self.inner)
            .field("executor", &self.executor)
            .finish()
    }
}
