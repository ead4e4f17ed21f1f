//! macOS `kqueue`-based poller.
//!
//! Readiness waits use `EVFILT_READ` with `EV_ONESHOT`; the wake-up path is
//! an `EVFILT_USER` event triggered with `NOTE_TRIGGER`.

use crate::reactor::event::Event;
use crate::reactor::native::NativeHandle;

use libc::{
    EV_ADD, EV_CLEAR, EV_DELETE, EV_ENABLE, EV_EOF, EV_ERROR, EV_ONESHOT, EVFILT_READ,
    EVFILT_USER, NOTE_TRIGGER, kevent, kqueue, timespec,
};
use std::io;
use std::os::fd::RawFd;
use std::ptr;
use std::sync::Arc;
use std::time::Duration;

const WAKE_IDENT: usize = usize::MAX;

fn change(ident: usize, filter: i16, flags: u16, fflags: u32, token: usize) -> kevent {
    kevent {
        ident,
        filter,
        flags,
        fflags,
        data: 0,
        udata: token as *mut _,
    }
}

fn apply(kq: RawFd, changes: &[kevent]) -> io::Result<()> {
    let rc = unsafe {
        kevent(
            kq,
            changes.as_ptr(),
            changes.len() as i32,
            ptr::null_mut(),
            0,
            ptr::null(),
        )
    };

    if rc < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

/// Interrupts a blocked [`KqueuePoller::poll`] from any thread.
pub(crate) struct PollWaker(RawFd);

impl PollWaker {
    pub(crate) fn wake(&self) {
        let _ = apply(
            self.0,
            &[change(WAKE_IDENT, EVFILT_USER, 0, NOTE_TRIGGER, 0)],
        );
    }
}

pub(crate) struct KqueuePoller {
    kqueue: RawFd,
    events: Vec<kevent>,
    waker: Arc<PollWaker>,
}

// The kevent buffer holds raw `udata` pointers that are only ever tokens.
unsafe impl Send for KqueuePoller {}

impl KqueuePoller {
    pub(crate) fn new() -> io::Result<Self> {
        let kq = unsafe { kqueue() };
        if kq < 0 {
            return Err(io::Error::last_os_error());
        }

        if let Err(err) = apply(
            kq,
            &[change(WAKE_IDENT, EVFILT_USER, EV_ADD | EV_ENABLE | EV_CLEAR, 0, 0)],
        ) {
            unsafe { libc::close(kq) };
            return Err(err);
        }

        Ok(Self {
            kqueue: kq,
            events: Vec::with_capacity(64),
            waker: Arc::new(PollWaker(kq)),
        })
    }

    pub(crate) fn waker(&self) -> Arc<PollWaker> {
        self.waker.clone()
    }

    pub(crate) fn register(&mut self, handle: NativeHandle, token: usize) -> io::Result<()> {
        apply(
            self.kqueue,
            &[change(
                handle.as_raw() as usize,
                EVFILT_READ,
                EV_ADD | EV_ENABLE | EV_ONESHOT,
                0,
                token,
            )],
        )
    }

    pub(crate) fn deregister(&mut self, handle: NativeHandle) {
        // A fired EV_ONESHOT filter is already gone; ENOENT is expected.
        let _ = apply(
            self.kqueue,
            &[change(handle.as_raw() as usize, EVFILT_READ, EV_DELETE, 0, 0)],
        );
    }

    pub(crate) fn poll(
        &mut self,
        events: &mut Vec<Event>,
        timeout: Option<Duration>,
    ) -> io::Result<()> {
        events.clear();

        let ts = timeout.map(|t| timespec {
            tv_sec: t.as_secs() as _,
            tv_nsec: t.subsec_nanos() as _,
        });
        let ts_ptr = ts
            .as_ref()
            .map_or(ptr::null(), |ts| ts as *const timespec);

        let n = unsafe {
            kevent(
                self.kqueue,
                ptr::null(),
                0,
                self.events.as_mut_ptr(),
                self.events.capacity() as i32,
                ts_ptr,
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
            if ev.filter == EVFILT_USER {
                continue;
            }

            let failed = ev.flags & EV_ERROR != 0 && ev.flags & EV_EOF == 0;

            events.push(Event {
                token: ev.udata as usize,
                failed,
            });
        }

        Ok(())
    }
}

impl Drop for KqueuePoller {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.kqueue);
        }
    }
}
