use crate::context;
use crate::scheduler::Handle;

use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll, Waker};

/// Resume signal shared between a suspended [`Schedule`] and the job it
/// posted onto the target scheduler.
struct Hop {
    fired: AtomicBool,
    waker: Mutex<Option<Waker>>,
}

impl Hop {
    fn fire(&self) {
        self.fired.store(true, Ordering::Release);

        let waker = self.waker.lock().take();
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

/// Moves the awaiting task onto a worker of the target scheduler.
///
/// Ready at once when the current thread already is one of the target's
/// workers. Otherwise the current task is re-homed onto the target, a
/// "resume me" job is posted there and the task suspends; it resumes on
/// one of the target's workers.
///
/// If the target scheduler is dropped before the job runs, the task is
/// never resumed.
#[must_use = "futures do nothing unless awaited"]
pub struct Schedule {
    target: Handle,
    hop: Option<Arc<Hop>>,
}

impl Schedule {
    pub(crate) fn new(target: Handle) -> Self {
        Self { target, hop: None }
    }
}

impl Future for Schedule {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();

        if let Some(hop) = &this.hop {
            if hop.fired.load(Ordering::Acquire) {
                return Poll::Ready(());
            }

            *hop.waker.lock() = Some(cx.waker().clone());

            return if hop.fired.load(Ordering::Acquire) {
                Poll::Ready(())
            } else {
                Poll::Pending
            };
        }

        if this.target.owns_thread() {
            return Poll::Ready(());
        }

        let hop = Arc::new(Hop {
            fired: AtomicBool::new(false),
            waker: Mutex::new(Some(cx.waker().clone())),
        });

        if let Some(task) = context::current_task() {
            task.rehome(this.target.clone());
        }

        let remote = hop.clone();
        this.target.post(move || remote.fire());
        this.hop = Some(hop);

        Poll::Pending
    }
}

/// Yields back to the scheduler exactly once.
///
/// The task is re-queued behind the work already posted, letting other
/// tasks make progress before it continues.
#[must_use = "futures do nothing unless awaited"]
pub struct YieldNow(bool);

impl YieldNow {
    pub(crate) fn new() -> Self {
        Self(false)
    }
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if !self.0 {
            self.0 = true;
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }

        Poll::Ready(())
    }
}
