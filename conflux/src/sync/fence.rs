use super::RawFence;

use std::fmt;

/// A level-triggered signal that a plain thread can block on.
///
/// A `Fence` starts unsignaled. [`signal`](Self::signal) flips it and wakes
/// every thread currently blocked in [`wait`](Self::wait); it stays signaled
/// until [`reset`](Self::reset). Waiting parks the thread in the kernel
/// rather than spinning.
///
/// The fence is meant for a single waiter at a time. Several threads may
/// wait concurrently and all of them wake on `signal`, but no fairness or
/// ordering between them is promised.
///
/// Signaling uses release ordering and waiting observes it with acquire
/// ordering: everything written before `signal()` is visible to a thread
/// once its `wait()` returns.
///
/// # Examples
///
/// ```rust,ignore
/// let fence = Arc::new(Fence::new());
/// let remote = fence.clone();
///
/// std::thread::spawn(move || remote.signal());
///
/// fence.wait();
/// assert!(fence.signaled());
/// ```
pub struct Fence {
    raw: RawFence,
}

impl Fence {
    /// Creates an unsignaled fence.
    pub fn new() -> Self {
        Self {
            raw: RawFence::new(),
        }
    }

    /// Signals the fence and wakes all blocked waiters.
    ///
    /// Returns `true` if this call performed the unsignaled → signaled
    /// transition. A wake is issued either way.
    pub fn signal(&self) -> bool {
        self.raw.try_set()
    }

    /// Signals the fence unconditionally, even if already signaled.
    ///
    /// Never panics; used as the last-resort release on drop.
    pub fn force_signal(&self) {
        self.raw.set();
    }

    /// Returns the fence to the unsignaled state.
    ///
    /// Must not race with a `wait()` on another thread: the thread that
    /// resets is expected to be the only one driving transitions.
    pub fn reset(&self) {
        self.raw.clear();
    }

    /// Blocks the calling thread until the fence is signaled.
    ///
    /// Returns immediately if it already is.
    pub fn wait(&self) {
        self.raw.wait();
    }

    /// Non-blocking check of the current state.
    pub fn signaled(&self) -> bool {
        self.raw.is_set()
    }
}

impl Default for Fence {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Fence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fence")
            .field("signaled", &self.signaled())
            .finish()
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        self.force_signal();
    }
}
