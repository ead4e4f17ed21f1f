use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// An awaiter that is ready on its first poll.
///
/// Used to answer ambient-context queries without suspending.
#[derive(Debug, Clone)]
#[must_use = "futures do nothing unless awaited"]
pub struct Ready<T>(Option<T>);

impl<T> Ready<T> {
    pub(crate) fn new(value: T) -> Self {
        Self(Some(value))
    }

    /// Takes the value without awaiting.
    pub fn into_inner(self) -> Option<T> {
        self.0
    }
}

impl<T> Unpin for Ready<T> {}

impl<T> Future for Ready<T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<T> {
        match self.0.take() {
            Some(value) => Poll::Ready(value),
            None => panic!("`Ready` polled after completion"),
        }
    }
}
