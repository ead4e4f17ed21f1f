//! Per-task promise records.
//!
//! A [`Promise`] is the storage half of a task: the outcome written once by
//! the frame and the continuation (the waker of whoever awaits it). The
//! [`Joint`] shares a promise between a frame running on a scheduler and the
//! handle returned to the caller, and optionally carries a [`Fence`] so a
//! plain thread can block on completion.

use crate::error::TaskError;
use crate::sync::Fence;

use parking_lot::Mutex;
use pin_project::{pin_project, pinned_drop};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

/// The tagged result of a task: its value or the failure it raised.
pub type Outcome<T> = Result<T, TaskError>;

/// Storage for a task's outcome and continuation.
pub(crate) struct Promise<T> {
    outcome: Option<Outcome<T>>,
    continuation: Option<Waker>,
    completed: bool,
}

impl<T> Promise<T> {
    pub(crate) fn new() -> Self {
        Self {
            outcome: None,
            continuation: None,
            completed: false,
        }
    }

    /// Stores the outcome and hands back the continuation to resume.
    ///
    /// Only the first call has an effect; the continuation is returned at
    /// most once over the promise's lifetime.
    pub(crate) fn complete(&mut self, outcome: Outcome<T>) -> Option<Waker> {
        if self.completed {
            return None;
        }

        self.outcome = Some(outcome);
        self.completed = true;
        self.continuation.take()
    }

    /// Moves the outcome out, or records `cx`'s waker as the continuation.
    ///
    /// # Panics
    ///
    /// Panics if the outcome was already taken.
    pub(crate) fn poll_take(&mut self, cx: &mut Context<'_>) -> Poll<Outcome<T>> {
        if self.completed {
            return match self.outcome.take() {
                Some(outcome) => Poll::Ready(outcome),
                None => panic!("task outcome already taken"),
            };
        }

        match &mut self.continuation {
            Some(waker) if waker.will_wake(cx.waker()) => {}
            slot => *slot = Some(cx.waker().clone()),
        }

        Poll::Pending
    }

    /// Moves the outcome out if the promise has completed.
    pub(crate) fn take(&mut self) -> Option<Outcome<T>> {
        self.outcome.take()
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.completed
    }
}

/// A promise shared between a scheduled frame and its handle.
pub(crate) struct Joint<T> {
    promise: Mutex<Promise<T>>,
    fence: Option<Fence>,
}

impl<T> Joint<T> {
    pub(crate) fn new() -> Self {
        Self {
            promise: Mutex::new(Promise::new()),
            fence: None,
        }
    }

    pub(crate) fn with_fence() -> Self {
        Self {
            promise: Mutex::new(Promise::new()),
            fence: Some(Fence::new()),
        }
    }

    /// Final-suspend step of a scheduled frame.
    ///
    /// The outcome is written under the promise lock, then the fence is
    /// signaled, then the continuation is woken. A thread returning from
    /// [`wait`](Self::wait) therefore always finds the outcome in place.
    pub(crate) fn complete(&self, outcome: Outcome<T>) {
        let continuation = self.promise.lock().complete(outcome);

        if let Some(fence) = &self.fence {
            fence.signal();
        }

        if let Some(waker) = continuation {
            waker.wake();
        }
    }

    /// Completes with [`TaskError::Abandoned`] unless already completed.
    pub(crate) fn abandon(&self) {
        self.complete(Err(TaskError::Abandoned));
    }

    pub(crate) fn poll_take(&self, cx: &mut Context<'_>) -> Poll<Outcome<T>> {
        self.promise.lock().poll_take(cx)
    }

    /// Blocks the calling thread until the frame completes.
    ///
    /// Only meaningful on a joint created with [`with_fence`](Self::with_fence).
    pub(crate) fn wait(&self) -> Outcome<T> {
        if let Some(fence) = &self.fence {
            fence.wait();
        }

        self.promise
            .lock()
            .take()
            .unwrap_or(Err(TaskError::Abandoned))
    }

    pub(crate) fn is_complete(&self) -> bool {
        match &self.fence {
            Some(fence) => fence.signaled(),
            None => self.promise.lock().is_complete(),
        }
    }
}

/// Converts a panic raised while polling `F` into an [`Outcome`].
#[pin_project]
pub(crate) struct CatchUnwind<F> {
    #[pin]
    inner: F,
}

impl<F> CatchUnwind<F> {
    pub(crate) fn new(inner: F) -> Self {
        Self { inner }
    }
}

impl<F: Future> Future for CatchUnwind<F> {
    type Output = Outcome<F::Output>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut inner = self.project().inner;

        match panic::catch_unwind(AssertUnwindSafe(|| inner.as_mut().poll(cx))) {
            Ok(Poll::Ready(value)) => Poll::Ready(Ok(value)),
            Ok(Poll::Pending) => Poll::Pending,
            Err(payload) => {
                let err = TaskError::Panicked(payload);
                tracing::debug!(panic = err.message(), "task body panicked");

                Poll::Ready(Err(err))
            }
        }
    }
}

/// Root future of a scheduled frame.
///
/// Runs the body under [`CatchUnwind`] and publishes the outcome through the
/// joint. Dropping an unfinished harness abandons the joint so that a waiter
/// is never left blocked on a frame that no longer exists.
#[pin_project(PinnedDrop)]
pub(crate) struct Harness<F: Future> {
    #[pin]
    body: CatchUnwind<F>,
    joint: Arc<Joint<F::Output>>,
    done: bool,
}

impl<F: Future> Harness<F> {
    pub(crate) fn new(body: F, joint: Arc<Joint<F::Output>>) -> Self {
        Self {
            body: CatchUnwind::new(body),
            joint,
            done: false,
        }
    }
}

impl<F: Future> Future for Harness<F> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.project();

        if *this.done {
            return Poll::Ready(());
        }

        let outcome = match this.body.poll(cx) {
            Poll::Ready(outcome) => outcome,
            Poll::Pending => return Poll::Pending,
        };

        *this.done = true;
        this.joint.complete(outcome);

        Poll::Ready(())
    }
}

#[pinned_drop]
impl<F: Future> PinnedDrop for Harness<F> {
    fn drop(self: Pin<&mut Self>) {
        let this = self.project();

        if !*this.done {
            this.joint.abandon();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::task::Wake;

    struct CountingWaker(AtomicUsize);

    impl Wake for CountingWaker {
        fn wake(self: Arc<Self>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_promise_returns_continuation_once() {
        let counter = Arc::new(CountingWaker(AtomicUsize::new(0)));
        let waker = Waker::from(counter.clone());
        let mut cx = Context::from_waker(&waker);

        let mut promise = Promise::<u32>::new();
        assert!(promise.poll_take(&mut cx).is_pending());

        let continuation = promise.complete(Ok(7));
        assert!(continuation.is_some());
        assert!(promise.complete(Ok(8)).is_none());

        continuation.into_iter().for_each(Waker::wake);
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);

        match promise.poll_take(&mut cx) {
            Poll::Ready(Ok(v)) => assert_eq!(v, 7),
            _ => panic!("expected the first outcome"),
        }
    }

    #[test]
    fn test_joint_wait_sees_outcome() {
        let joint = Arc::new(Joint::<String>::with_fence());
        let remote = joint.clone();

        let t = std::thread::spawn(move || remote.complete(Ok("done".to_owned())));

        let outcome = joint.wait();
        t.join().unwrap();

        assert_eq!(outcome.unwrap(), "done");
        assert!(joint.is_complete());
    }

    #[test]
    fn test_dropped_harness_abandons_joint() {
        let joint = Arc::new(Joint::<()>::with_fence());
        let harness = Harness::new(std::future::pending::<()>(), joint.clone());
        drop(harness);

        assert!(matches!(joint.wait(), Err(TaskError::Abandoned)));
    }

    #[test]
    fn test_catch_unwind_captures_payload() {
        let mut fut = Box::pin(CatchUnwind::new(async {
            std::panic::panic_any(41_u8);
        }));
        let mut cx = Context::from_waker(Waker::noop());

        match fut.as_mut().poll(&mut cx) {
            Poll::Ready(Err(err)) => assert_eq!(err.downcast_ref::<u8>(), Some(&41)),
            _ => panic!("expected a captured panic"),
        }
    }
}
