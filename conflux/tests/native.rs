#![cfg(unix)]

use conflux::{Error, Executor, NativeHandle, Scheduler, check_ready};

use std::future::Future;
use std::io;
use std::os::fd::RawFd;
use std::task::{Context, Waker};
use std::thread;
use std::time::Duration;

struct Pipe {
    read: RawFd,
    write: RawFd,
}

impl Pipe {
    fn new() -> io::Result<Self> {
        let mut fds = [0 as RawFd; 2];
        if unsafe { libc::pipe(fds.as_mut_ptr()) } < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self {
            read: fds[0],
            write: fds[1],
        })
    }

    fn readable(&self) -> NativeHandle {
        NativeHandle::from_raw(self.read)
    }

    fn close_write(&mut self) {
        if self.write >= 0 {
            unsafe { libc::close(self.write) };
            self.write = -1;
        }
    }
}

impl Drop for Pipe {
    fn drop(&mut self) {
        self.close_write();
        unsafe { libc::close(self.read) };
    }
}

fn write_byte(fd: RawFd) {
    let byte = [1u8];
    let n = unsafe { libc::write(fd, byte.as_ptr().cast(), 1) };
    assert_eq!(n, 1);
}

#[test]
fn test_check_ready_tracks_readability() -> anyhow::Result<()> {
    let pipe = Pipe::new()?;

    assert!(!check_ready(pipe.readable())?);
    write_byte(pipe.write);
    assert!(check_ready(pipe.readable())?);
    Ok(())
}

#[test]
fn test_wait_handle_resumes_after_write() -> anyhow::Result<()> {
    let scheduler = Scheduler::with_autostart(true, 2)?;
    let executor = Executor::new(&scheduler);
    let pipe = Pipe::new()?;

    let writer = pipe.write;
    let wait = executor.wait_handle(pipe.readable());
    let remote = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        write_byte(writer);
    });

    executor.block_on(wait)?;
    remote.join().unwrap();

    assert!(check_ready(pipe.readable())?);
    Ok(())
}

#[test]
fn test_wait_handle_resumes_on_hangup() -> anyhow::Result<()> {
    let scheduler = Scheduler::with_autostart(true, 1)?;
    let executor = Executor::new(&scheduler);
    let mut pipe = Pipe::new()?;

    let wait = executor.wait_handle(pipe.readable());
    let task = executor.spawn_sync(wait);

    thread::sleep(Duration::from_millis(20));
    pipe.close_write();

    task.wait()?;
    Ok(())
}

#[test]
fn test_already_ready_handle_completes_without_reactor() -> anyhow::Result<()> {
    let scheduler = Scheduler::with_autostart(true, 1)?;
    let executor = Executor::new(&scheduler);
    let pipe = Pipe::new()?;
    write_byte(pipe.write);

    executor.block_on(executor.wait_handle(pipe.readable()))?;
    Ok(())
}

#[test]
fn test_invalid_handle_reports_io_error() -> anyhow::Result<()> {
    let scheduler = Scheduler::with_autostart(true, 1)?;
    let executor = Executor::new(&scheduler);

    let result = executor.block_on(executor.wait_handle(NativeHandle::from_raw(-1)));

    assert!(matches!(result, Err(Error::Io(_))), "got {result:?}");
    Ok(())
}

fn write_later(fd: RawFd, delay: Duration) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        thread::sleep(delay);
        write_byte(fd);
    })
}

#[test]
fn test_wait_again_after_dropped_wait() -> anyhow::Result<()> {
    let scheduler = Scheduler::with_autostart(true, 1)?;
    let executor = Executor::new(&scheduler);
    let pipe = Pipe::new()?;

    {
        let mut first = Box::pin(executor.wait_handle(pipe.readable()));
        let mut cx = Context::from_waker(Waker::noop());
        assert!(first.as_mut().poll(&mut cx).is_pending());
    }
    thread::sleep(Duration::from_millis(20));

    let writer = write_later(pipe.write, Duration::from_millis(50));
    executor.block_on(executor.wait_handle(pipe.readable()))?;
    writer.join().unwrap();

    Ok(())
}

#[test]
fn test_two_waits_on_one_handle() -> anyhow::Result<()> {
    let scheduler = Scheduler::with_autostart(true, 2)?;
    let executor = Executor::new(&scheduler);
    let pipe = Pipe::new()?;

    let first = executor.spawn_sync(executor.wait_handle(pipe.readable()));
    let second = executor.spawn_sync(executor.wait_handle(pipe.readable()));

    let writer = write_later(pipe.write, Duration::from_millis(30));
    first.wait()?;
    second.wait()?;
    writer.join().unwrap();

    Ok(())
}

#[test]
fn test_dropped_wait_leaves_other_waiter_armed() -> anyhow::Result<()> {
    let scheduler = Scheduler::with_autostart(true, 1)?;
    let executor = Executor::new(&scheduler);
    let pipe = Pipe::new()?;

    let kept = executor.spawn_sync(executor.wait_handle(pipe.readable()));
    thread::sleep(Duration::from_millis(20));

    {
        let mut dropped = Box::pin(executor.wait_handle(pipe.readable()));
        let mut cx = Context::from_waker(Waker::noop());
        assert!(dropped.as_mut().poll(&mut cx).is_pending());
    }

    let writer = write_later(pipe.write, Duration::from_millis(30));
    kept.wait()?;
    writer.join().unwrap();

    Ok(())
}
