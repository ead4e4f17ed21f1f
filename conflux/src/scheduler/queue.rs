use crate::error::TaskError;
use crate::task::raw::RawTask;

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

/// A unit of posted work.
pub(crate) enum Work {
    /// A scheduler-owned frame to poll.
    Task(Arc<RawTask>),

    /// A plain closure posted with [`Handle::post`](super::Handle::post).
    Job(Box<dyn FnOnce() + Send + 'static>),
}

impl Work {
    /// Runs the work on the current thread.
    ///
    /// A panicking job is logged and swallowed so the worker survives; task
    /// bodies capture their own panics.
    pub(crate) fn run(self) {
        match self {
            Work::Task(task) => task.run(),
            Work::Job(job) => {
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                    let err = TaskError::Panicked(payload);
                    tracing::error!(panic = err.message(), "posted job panicked");
                }
            }
        }
    }
}

/// FIFO of posted work shared by all workers of a scheduler.
///
/// Workers with nothing to do and no reactor to drive park on the
/// condition variable. The park is timed so a parked worker periodically
/// retries taking over the reactor.
pub(crate) struct RunQueue {
    items: Mutex<VecDeque<Work>>,
    condvar: Condvar,
}

impl RunQueue {
    pub(crate) fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            condvar: Condvar::new(),
        }
    }

    /// Appends `work` and wakes one parked worker.
    pub(crate) fn push(&self, work: Work) {
        self.items.lock().push_back(work);
        self.condvar.notify_one();
    }

    pub(crate) fn pop(&self) -> Option<Work> {
        self.items.lock().pop_front()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Parks the current worker until work is pushed, a notification
    /// arrives, or `timeout` elapses. Returns at once if work is queued.
    pub(crate) fn park(&self, timeout: Duration) {
        let mut items = self.items.lock();

        if !items.is_empty() {
            return;
        }

        let _ = self.condvar.wait_for(&mut items, timeout);
    }

    /// Wakes every parked worker.
    pub(crate) fn notify_all(&self) {
        self.condvar.notify_all();
    }

    /// Removes all queued work. The caller drops it outside the lock.
    pub(crate) fn drain(&self) -> Vec<Work> {
        self.items.lock().drain(..).collect()
    }
}
