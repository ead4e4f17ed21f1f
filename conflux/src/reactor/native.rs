//! Native waitable handles.
//!
//! On Unix a native handle is a pollable file descriptor and "ready" means
//! readable (or hung up). On Windows it is a kernel object handle and
//! "ready" means signaled.

use std::io;

#[cfg(unix)]
pub type RawNative = std::os::fd::RawFd;

#[cfg(windows)]
pub type RawNative = std::os::windows::io::RawHandle;

/// A borrowed OS handle the reactor can wait on.
///
/// `NativeHandle` does not own the underlying descriptor or object; the
/// caller must keep it open until every wait registered on it has
/// completed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NativeHandle(RawNative);

// Windows handles are raw pointers; the handle value itself is freely
// shareable between threads.
unsafe impl Send for NativeHandle {}
unsafe impl Sync for NativeHandle {}

impl NativeHandle {
    /// Wraps a raw descriptor or handle.
    pub fn from_raw(raw: RawNative) -> Self {
        Self(raw)
    }

    /// Returns the wrapped raw value.
    pub fn as_raw(&self) -> RawNative {
        self.0
    }
}

#[cfg(unix)]
impl From<std::os::fd::BorrowedFd<'_>> for NativeHandle {
    fn from(fd: std::os::fd::BorrowedFd<'_>) -> Self {
        use std::os::fd::AsRawFd;

        Self(fd.as_raw_fd())
    }
}

/// Synchronously checks whether `handle` is ready, without blocking.
///
/// Returns `Ok(false)` when a wait would have to suspend, `Ok(true)` when
/// it can complete immediately, and an error when the OS reports the
/// handle as invalid or in an error state.
#[cfg(unix)]
pub fn check_ready(handle: NativeHandle) -> io::Result<bool> {
    let mut pollfd = libc::pollfd {
        fd: handle.as_raw(),
        events: libc::POLLIN,
        revents: 0,
    };

    let rc = unsafe { libc::poll(&mut pollfd, 1, 0) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }

    if pollfd.revents & libc::POLLNVAL != 0 {
        return Err(io::Error::from_raw_os_error(libc::EBADF));
    }

    if pollfd.revents & libc::POLLERR != 0 {
        return Err(io::Error::other("error condition reported on handle"));
    }

    Ok(pollfd.revents & (libc::POLLIN | libc::POLLHUP) != 0)
}

/// Synchronously checks whether `handle` is signaled, without blocking.
#[cfg(windows)]
pub fn check_ready(handle: NativeHandle) -> io::Result<bool> {
    use windows_sys::Win32::Foundation::{WAIT_FAILED, WAIT_OBJECT_0, WAIT_TIMEOUT};
    use windows_sys::Win32::System::Threading::WaitForSingleObject;

    let rc = unsafe { WaitForSingleObject(handle.as_raw() as _, 0) };

    match rc {
        WAIT_OBJECT_0 => Ok(true),
        WAIT_TIMEOUT => Ok(false),
        WAIT_FAILED => Err(io::Error::last_os_error()),
        other => Err(io::Error::other(format!(
            "unexpected wait status {other:#x}"
        ))),
    }
}
