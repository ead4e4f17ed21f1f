use crate::context;
use crate::error::{Error, Result};
use crate::reactor::{Cancel, Completion, NativeHandle, check_ready};
use crate::scheduler::Handle;

use parking_lot::Mutex;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

#[derive(Default)]
struct SlotState {
    result: Option<io::Result<()>>,
    waker: Option<Waker>,
}

/// Where the reactor drops the result of a one-shot wait.
#[derive(Default)]
struct Slot {
    state: Mutex<SlotState>,
}

impl Slot {
    fn completion(self: &Arc<Self>) -> Completion {
        let slot = self.clone();

        Box::new(move |result| {
            let waker = {
                let mut state = slot.state.lock();
                state.result = Some(result);
                state.waker.take()
            };

            if let Some(waker) = waker {
                waker.wake();
            }
        })
    }

    fn poll(&self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        let mut state = self.state.lock();

        match state.result.take() {
            Some(result) => Poll::Ready(result.map_err(Error::from)),
            None => {
                state.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

/// The registration half shared by both wait awaiters.
///
/// Dropping it before the wait completes marks the reactor entry as
/// cancelled and asks the reactor to purge it.
struct Registration {
    target: Option<Handle>,
    slot: Option<Arc<Slot>>,
    cancelled: Arc<AtomicBool>,

    /// Reactor holding the entry, until the wait has completed.
    armed: Option<(Handle, Cancel)>,
}

impl Registration {
    fn new(target: Option<Handle>) -> Self {
        Self {
            target,
            slot: None,
            cancelled: Arc::new(AtomicBool::new(false)),
            armed: None,
        }
    }

    /// Polls the slot of an armed registration; `None` if not armed yet.
    fn poll_slot(&mut self, cx: &mut Context<'_>) -> Option<Poll<Result<()>>> {
        let polled = self.slot.as_ref()?.poll(cx);

        if polled.is_ready() {
            self.armed = None;
        }

        Some(polled)
    }

    /// The scheduler whose reactor owns the wait: the explicit one, or the
    /// ambient executor's.
    fn resolve(&self) -> Result<Handle> {
        let target = match &self.target {
            Some(handle) => handle.clone(),
            None => match context::current_executor() {
                Some(executor) => executor.handle().clone(),
                None => return Err(Error::NoContext),
            },
        };

        if target.is_closed() {
            return Err(Error::Stopped);
        }

        Ok(target)
    }

    /// Stores the caller's waker in a fresh slot and returns the reactor
    /// completion feeding it.
    fn arm(&mut self, cx: &mut Context<'_>, target: &Handle, kind: Cancel) -> Completion {
        let slot = Arc::new(Slot::default());
        slot.state.lock().waker = Some(cx.waker().clone());

        let completion = slot.completion();
        self.slot = Some(slot);
        self.armed = Some((target.clone(), kind));

        completion
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::Release);

        if let Some((target, kind)) = self.armed.take() {
            if !target.is_closed() {
                target.reactor().cancel(kind);
            }
        }
    }
}

/// Suspends until a deadline.
///
/// Ready at once if the deadline has already passed; otherwise a one-shot
/// timer is registered with the scheduler's reactor on the first poll. The
/// awaiter only resumes the task; it does not abort anything.
///
/// Resolves to [`Error::NoContext`] when created without a scheduler and
/// polled outside any executor, and to [`Error::Stopped`] when the
/// scheduler has been dropped.
#[must_use = "futures do nothing unless awaited"]
pub struct WaitUntil {
    deadline: Instant,
    registration: Registration,
}

impl WaitUntil {
    pub(crate) fn new(deadline: Instant, target: Option<Handle>) -> Self {
        Self {
            deadline,
            registration: Registration::new(target),
        }
    }

    pub(crate) fn after(duration: Duration, target: Option<Handle>) -> Self {
        Self::new(Instant::now() + duration, target)
    }

    /// The instant this wait completes at or after.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

impl Future for WaitUntil {
    type Output = Result<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<()>> {
        let this = self.get_mut();

        if Instant::now() >= this.deadline {
            // An armed timer is already due and gets skipped once popped.
            this.registration.armed = None;
            return Poll::Ready(Ok(()));
        }

        if let Some(polled) = this.registration.poll_slot(cx) {
            return polled;
        }

        let target = match this.registration.resolve() {
            Ok(target) => target,
            Err(err) => return Poll::Ready(Err(err)),
        };

        let completion = this.registration.arm(cx, &target, Cancel::Timer);
        target.reactor().set_timer(
            this.deadline,
            this.registration.cancelled.clone(),
            completion,
        );

        Poll::Pending
    }
}

/// Suspends until a native handle becomes ready.
///
/// The handle is polled synchronously first; only when it is not ready yet
/// is a one-shot readiness wait registered with the scheduler's reactor. An
/// OS failure, either from the synchronous poll or reported by the reactor,
/// resolves to [`Error::Io`].
///
/// The handle must stay open until the awaiter completes or is dropped.
#[must_use = "futures do nothing unless awaited"]
pub struct WaitHandle {
    native: NativeHandle,
    registration: Registration,
}

impl WaitHandle {
    pub(crate) fn new(native: NativeHandle, target: Option<Handle>) -> Self {
        Self {
            native,
            registration: Registration::new(target),
        }
    }
}

impl Future for WaitHandle {
    type Output = Result<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<()>> {
        let this = self.get_mut();

        if let Some(polled) = this.registration.poll_slot(cx) {
            return polled;
        }

        match check_ready(this.native) {
            Ok(true) => return Poll::Ready(Ok(())),
            Ok(false) => {}
            Err(err) => return Poll::Ready(Err(Error::Io(err))),
        }

        let target = match this.registration.resolve() {
            Ok(target) => target,
            Err(err) => return Poll::Ready(Err(err)),
        };

        let completion = this.registration.arm(cx, &target, Cancel::Wait(this.native));
        target.reactor().register_wait(
            this.native,
            this.registration.cancelled.clone(),
            completion,
        );

        Poll::Pending
    }
}
