use super::state::{COMPLETED, IDLE, NOTIFIED, QUEUED, RUNNING};
use super::waker::make_waker;
use crate::context;
use crate::executor::Executor;
use crate::scheduler::Handle;

use parking_lot::Mutex;
use std::cell::UnsafeCell;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};

type Frame = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A frame owned by a scheduler.
///
/// The frame is polled by whichever worker pops the task from its home
/// scheduler's run queue. The `RUNNING` state grants that worker exclusive
/// access to the frame; wakers only ever move the task between states and
/// push it back into the queue.
pub(crate) struct RawTask {
    /// The root future, dropped as soon as it completes.
    frame: UnsafeCell<Option<Frame>>,

    /// Lifecycle state, see [`state`](super::state).
    state: AtomicUsize,

    /// Scheduler the task is queued on when woken. A schedule hop moves it.
    home: Mutex<Handle>,

    /// Ambient executor installed around every poll of the frame.
    executor: Option<Executor>,
}

unsafe impl Send for RawTask {}
unsafe impl Sync for RawTask {}

impl RawTask {
    /// Creates a task in the `QUEUED` state. The caller posts it.
    pub(crate) fn new<F>(frame: F, home: Handle, executor: Option<Executor>) -> Arc<Self>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Arc::new(Self {
            frame: UnsafeCell::new(Some(Box::pin(frame))),
            state: AtomicUsize::new(QUEUED),
            home: Mutex::new(home),
            executor,
        })
    }

    /// Polls the frame once on the current thread.
    ///
    /// - `Pending`: back to `IDLE`, or re-queued if woken during the poll.
    /// - `Ready`: the frame is dropped and the task becomes `COMPLETED`.
    pub(crate) fn run(self: Arc<Self>) {
        let current = self.state.load(Ordering::Acquire);

        if current != QUEUED && current != NOTIFIED {
            return;
        }

        if self
            .state
            .compare_exchange(current, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let waker = make_waker(self.clone());
        let mut cx = Context::from_waker(&waker);

        let poll = context::enter_task(self.clone(), || {
            // Safety: the RUNNING state guarantees that no other thread
            // touches the frame until we leave it.
            let slot = unsafe { &mut *self.frame.get() };

            let Some(frame) = slot.as_mut() else {
                return Poll::Ready(());
            };

            match &self.executor {
                Some(executor) => context::enter_executor(executor.clone(), || {
                    frame.as_mut().poll(&mut cx)
                }),
                None => frame.as_mut().poll(&mut cx),
            }
        });

        match poll {
            Poll::Pending => {
                if self
                    .state
                    .compare_exchange(RUNNING, IDLE, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    // Woken while running.
                    self.state.store(QUEUED, Ordering::Release);
                    self.schedule();
                }
            }
            Poll::Ready(()) => {
                let frame = unsafe { (*self.frame.get()).take() };
                self.state.store(COMPLETED, Ordering::Release);
                drop(frame);
            }
        }
    }

    /// Signals the task to be polled again.
    ///
    /// An `IDLE` task is queued on its home scheduler; a `RUNNING` one is
    /// marked `NOTIFIED` and re-queued by the worker when its poll returns.
    pub(crate) fn wake(self: Arc<Self>) {
        loop {
            match self.state.load(Ordering::Acquire) {
                IDLE => {
                    if self
                        .state
                        .compare_exchange(IDLE, QUEUED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        self.schedule();
                        return;
                    }
                }
                RUNNING => {
                    if self
                        .state
                        .compare_exchange(RUNNING, NOTIFIED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        return;
                    }
                }
                _ => return,
            }
        }
    }

    /// Moves the task to another scheduler for its next wake-up.
    pub(crate) fn rehome(&self, home: Handle) {
        *self.home.lock() = home;
    }

    fn schedule(self: &Arc<Self>) {
        let home = self.home.lock().clone();
        home.push_task(self.clone());
    }
}
