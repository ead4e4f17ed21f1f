//! Linux `epoll`-based poller.
//!
//! Native-handle waits are registered with `EPOLLONESHOT`: the kernel
//! disarms the descriptor after the first report and the driver removes it
//! with `EPOLL_CTL_DEL` when it dispatches the completion.
//!
//! An `eventfd` registered under [`WAKE_TOKEN`] lets other threads
//! interrupt a blocked `epoll_wait` when work is posted.

use super::common::timeout_millis;
use crate::reactor::event::Event;
use crate::reactor::native::NativeHandle;

use libc::{
    EPOLL_CLOEXEC, EPOLL_CTL_ADD, EPOLL_CTL_DEL, EPOLLERR, EPOLLHUP, EPOLLIN, EPOLLONESHOT,
    epoll_create1, epoll_ctl, epoll_event, epoll_wait,
};
use std::io;
use std::os::fd::RawFd;
use std::sync::Arc;
use std::time::Duration;

/// Reserved token for the wake-up eventfd. Slab tokens never reach it.
const WAKE_TOKEN: u64 = u64::MAX;

/// Interrupts a blocked [`EpollPoller::poll`] from any thread.
pub(crate) struct PollWaker(RawFd);

impl PollWaker {
    pub(crate) fn wake(&self) {
        let buf: u64 = 1;
        unsafe {
            libc::write(self.0, &buf as *const u64 as *const _, 8);
        }
    }

    fn drain(&self) {
        let mut buf = 0u64;
        unsafe {
            libc::read(self.0, &mut buf as *mut u64 as *mut _, 8);
        }
    }
}

impl Drop for PollWaker {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.0);
        }
    }
}

pub(crate) struct EpollPoller {
    /// Epoll file descriptor.
    epoll: RawFd,

    /// Reusable buffer for kernel events.
    events: Vec<epoll_event>,

    waker: Arc<PollWaker>,
}

impl EpollPoller {
    pub(crate) fn new() -> io::Result<Self> {
        let epoll = unsafe { epoll_create1(EPOLL_CLOEXEC) };
        if epoll < 0 {
            return Err(io::Error::last_os_error());
        }

        let eventfd = unsafe { libc::eventfd(0, libc::EFD_NONBLOCK | libc::EFD_CLOEXEC) };
        if eventfd < 0 {
            let err = io::Error::last_os_error();
            unsafe { libc::close(epoll) };
            return Err(err);
        }

        let waker = Arc::new(PollWaker(eventfd));

        let mut event = epoll_event {
            events: EPOLLIN as u32,
            u64: WAKE_TOKEN,
        };

        let rc = unsafe { epoll_ctl(epoll, EPOLL_CTL_ADD, eventfd, &mut event) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            unsafe { libc::close(epoll) };
            return Err(err);
        }

        Ok(Self {
            epoll,
            events: Vec::with_capacity(64),
            waker,
        })
    }

    pub(crate) fn waker(&self) -> Arc<PollWaker> {
        self.waker.clone()
    }

    /// Arms a one-shot readability wait for `handle`.
    pub(crate) fn register(&mut self, handle: NativeHandle, token: usize) -> io::Result<()> {
        let mut event = epoll_event {
            events: (EPOLLIN | EPOLLONESHOT) as u32,
            u64: token as u64,
        };

        let rc = unsafe { epoll_ctl(self.epoll, EPOLL_CTL_ADD, handle.as_raw(), &mut event) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    pub(crate) fn deregister(&mut self, handle: NativeHandle) {
        unsafe {
            epoll_ctl(
                self.epoll,
                EPOLL_CTL_DEL,
                handle.as_raw(),
                std::ptr::null_mut(),
            );
        }
    }

    /// Blocks until readiness, a wake-up, or `timeout`.
    ///
    /// `EINTR` is reported as an empty, successful poll.
    pub(crate) fn poll(
        &mut self,
        events: &mut Vec<Event>,
        timeout: Option<Duration>,
    ) -> io::Result<()> {
        events.clear();

        let n = unsafe {
            epoll_wait(
                self.epoll,
                self.events.as_mut_ptr(),
                self.events.capacity() as i32,
                timeout_millis(timeout),
            )
        };

        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(err);
        }

        unsafe {
            self.events.set_len(n as usize);
        }

        for ev in self.events.drain(..) {
            let token = ev.u64;
            let flags = ev.events;

            if token == WAKE_TOKEN {
                self.waker.drain();
                continue;
            }

            events.push(Event {
                token: token as usize,
                failed: flags & (EPOLLERR as u32) != 0 && flags & (EPOLLIN | EPOLLHUP) as u32 == 0,
            });
        }

        Ok(())
    }
}

impl Drop for EpollPoller {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.epoll);
        }
    }
}
