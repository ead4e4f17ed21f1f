use super::schedule::Schedule;
use crate::executor::Executor;

use pin_project::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A foreign future brought under an executor's control.
///
/// The inner future runs to completion wherever it is polled; before its
/// output is handed back, the awaiting task hops onto the owning
/// executor's scheduler. A task therefore never resumes on a thread it
/// does not control as a side effect of awaiting third-party code.
#[pin_project]
#[must_use = "futures do nothing unless awaited"]
pub struct Adopted<F: Future> {
    #[pin]
    inner: F,
    executor: Option<Executor>,
    output: Option<F::Output>,
    hop: Option<Schedule>,
    finished: bool,
}

impl<F: Future> Adopted<F> {
    pub(crate) fn new(inner: F, executor: Option<Executor>) -> Self {
        Self {
            inner,
            executor,
            output: None,
            hop: None,
            finished: false,
        }
    }

    /// The executor the output is delivered on, if any.
    pub fn executor(&self) -> Option<&Executor> {
        self.executor.as_ref()
    }
}

impl<F: Future> Future for Adopted<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<F::Output> {
        let this = self.project();

        if *this.finished {
            panic!("`Adopted` polled after completion");
        }

        if this.output.is_none() {
            match this.inner.poll(cx) {
                Poll::Ready(value) => {
                    *this.output = Some(value);
                    *this.hop = this.executor.as_ref().map(Executor::schedule);
                }
                Poll::Pending => return Poll::Pending,
            }
        }

        if let Some(hop) = this.hop.as_mut() {
            if Pin::new(hop).poll(cx).is_pending() {
                return Poll::Pending;
            }
        }

        *this.hop = None;
        *this.finished = true;

        match this.output.take() {
            Some(value) => Poll::Ready(value),
            None => panic!("`Adopted` lost its output"),
        }
    }
}
