//! Windows poller built on `WaitForMultipleObjects`.
//!
//! Slot 0 of the wait array is an auto-reset event used as the wake-up
//! source; registered object handles follow it. A single wait covers at
//! most `MAXIMUM_WAIT_OBJECTS` handles, so registrations beyond that limit
//! fail with an error delivered through the wait's completion.

use super::common::timeout_millis;
use crate::reactor::event::Event;
use crate::reactor::native::NativeHandle;

use std::io;
use std::ptr;
use std::sync::Arc;
use std::time::Duration;

use windows_sys::Win32::Foundation::{CloseHandle, HANDLE, WAIT_FAILED, WAIT_OBJECT_0, WAIT_TIMEOUT};
use windows_sys::Win32::System::Threading::{
    CreateEventW, INFINITE, SetEvent, WaitForMultipleObjects,
};

const MAXIMUM_WAIT_OBJECTS: usize = 64;

/// Interrupts a blocked [`WaitPoller::poll`] from any thread.
pub(crate) struct PollWaker(HANDLE);

unsafe impl Send for PollWaker {}
unsafe impl Sync for PollWaker {}

impl PollWaker {
    pub(crate) fn wake(&self) {
        unsafe {
            SetEvent(self.0);
        }
    }
}

impl Drop for PollWaker {
    fn drop(&mut self) {
        unsafe {
            CloseHandle(self.0);
        }
    }
}

pub(crate) struct WaitPoller {
    waker: Arc<PollWaker>,

    /// Registered handles with their tokens, in wait-array order.
    registered: Vec<(NativeHandle, usize)>,
}

unsafe impl Send for WaitPoller {}

impl WaitPoller {
    pub(crate) fn new() -> io::Result<Self> {
        let event = unsafe { CreateEventW(ptr::null(), 0, 0, ptr::null()) };
        if event.is_null() {
            return Err(io::Error::last_os_error());
        }

        Ok(Self {
            waker: Arc::new(PollWaker(event)),
            registered: Vec::new(),
        })
    }

    pub(crate) fn waker(&self) -> Arc<PollWaker> {
        self.waker.clone()
    }

    pub(crate) fn register(&mut self, handle: NativeHandle, token: usize) -> io::Result<()> {
        if self.registered.len() + 1 >= MAXIMUM_WAIT_OBJECTS {
            return Err(io::Error::other("too many concurrent handle waits"));
        }

        self.registered.push((handle, token));
        Ok(())
    }

    pub(crate) fn deregister(&mut self, handle: NativeHandle) {
        self.registered.retain(|(h, _)| *h != handle);
    }

    pub(crate) fn poll(
        &mut self,
        events: &mut Vec<Event>,
        timeout: Option<Duration>,
    ) -> io::Result<()> {
        events.clear();

        let mut handles: Vec<HANDLE> = Vec::with_capacity(self.registered.len() + 1);
        handles.push(self.waker.0);
        handles.extend(self.registered.iter().map(|(h, _)| h.as_raw() as HANDLE));

        let millis = match timeout_millis(timeout) {
            -1 => INFINITE,
            ms => ms as u32,
        };

        let rc = unsafe {
            WaitForMultipleObjects(handles.len() as u32, handles.as_ptr(), 0, millis)
        };

        if rc == WAIT_TIMEOUT {
            return Ok(());
        }

        if rc == WAIT_FAILED {
            return Err(io::Error::last_os_error());
        }

        let index = rc.wrapping_sub(WAIT_OBJECT_0) as usize;
        if index == 0 || index >= handles.len() {
            return Ok(());
        }

        // The lowest signaled index wins; the others are reported on
        // subsequent polls.
        let (_, token) = self.registered[index - 1];
        events.push(Event {
            token,
            failed: false,
        });

        Ok(())
    }
}
