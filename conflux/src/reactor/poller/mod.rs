//! Platform-specific readiness pollers.
//!
//! Each backend exposes the same surface to the reactor driver:
//! - `Poller::new()` / `Poller::waker()`
//! - `register(handle, token)` for a one-shot readiness wait
//! - `deregister(handle)`
//! - `poll(events, timeout)` blocking until readiness, a wake-up, or
//!   the timeout
//!
//! and a `PollWaker` that other threads use to interrupt a blocked
//! `poll`. The backend is selected at compile time.

pub(crate) mod common;

cfg_if::cfg_if! {
    if #[cfg(any(target_os = "linux", target_os = "android"))] {
        mod epoll;
        pub(crate) use epoll::{EpollPoller as Poller, PollWaker};
    } else if #[cfg(any(target_os = "macos", target_os = "ios"))] {
        mod kqueue;
        pub(crate) use kqueue::{KqueuePoller as Poller, PollWaker};
    } else if #[cfg(windows)] {
        mod windows;
        pub(crate) use self::windows::{WaitPoller as Poller, PollWaker};
    } else {
        compile_error!("conflux has no readiness poller for this target");
    }
}
