//! Thread-level synchronization primitives.
//!
//! The runtime itself synchronizes tasks through wakers; the primitives
//! here bridge the other direction, letting an ordinary (non-task) thread
//! block until something running on a scheduler has finished.
//!
//! - [`Fence`]: a level-triggered signal/wait flag with OS-level parking.
//!
//! The parking backend is chosen at compile time: a raw futex on Linux,
//! a mutex/condition-variable pair everywhere else.

mod fence;

cfg_if::cfg_if! {
    if #[cfg(any(target_os = "linux", target_os = "android"))] {
        mod futex;
        use futex::RawFence;
    } else {
        mod condvar;
        use condvar::RawFence;
    }
}

pub use fence::Fence;
