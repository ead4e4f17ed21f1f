//! Linux futex-backed fence.
//!
//! Futex word semantics:
//! - 0 = unsignaled, waiters may sleep
//! - 1 = signaled, waiters return immediately
//!
//! `waiters` lets the signaling side skip the `FUTEX_WAKE` syscall when
//! nobody is blocked. Both sides use `SeqCst` so that either the waiter
//! observes the flag or the signaler observes the waiter.

use std::ptr;
use std::sync::atomic::{AtomicU32, Ordering};

const UNSIGNALED: u32 = 0;
const SIGNALED: u32 = 1;

pub(crate) struct RawFence {
    state: AtomicU32,
    waiters: AtomicU32,
}

impl RawFence {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU32::new(UNSIGNALED),
            waiters: AtomicU32::new(0),
        }
    }

    pub(crate) fn set(&self) {
        self.state.store(SIGNALED, Ordering::SeqCst);

        if self.waiters.load(Ordering::SeqCst) != 0 {
            futex_wake_all(&self.state);
        }
    }

    pub(crate) fn try_set(&self) -> bool {
        let transitioned = self
            .state
            .compare_exchange(UNSIGNALED, SIGNALED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();

        if self.waiters.load(Ordering::SeqCst) != 0 {
            futex_wake_all(&self.state);
        }

        transitioned
    }

    pub(crate) fn clear(&self) {
        self.state.store(UNSIGNALED, Ordering::Release);
    }

    pub(crate) fn is_set(&self) -> bool {
        self.state.load(Ordering::Acquire) == SIGNALED
    }

    pub(crate) fn wait(&self) {
        if self.is_set() {
            return;
        }

        self.waiters.fetch_add(1, Ordering::SeqCst);

        while self.state.load(Ordering::SeqCst) != SIGNALED {
            // EAGAIN (word already changed) and EINTR both just loop.
            futex_wait(&self.state, UNSIGNALED);
        }

        self.waiters.fetch_sub(1, Ordering::SeqCst);
    }
}

fn futex_wait(word: &AtomicU32, expected: u32) {
    unsafe {
        libc::syscall(
            libc::SYS_futex,
            word.as_ptr(),
            libc::FUTEX_WAIT | libc::FUTEX_PRIVATE_FLAG,
            expected,
            ptr::null::<libc::timespec>(),
            ptr::null::<u32>(),
            0u32,
        );
    }
}

fn futex_wake_all(word: &AtomicU32) {
    unsafe {
        libc::syscall(
            libc::SYS_futex,
            word.as_ptr(),
            libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG,
            i32::MAX,
            ptr::null::<libc::timespec>(),
            ptr::null::<u32>(),
            0u32,
        );
    }
}
