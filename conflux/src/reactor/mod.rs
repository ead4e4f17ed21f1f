//! Reactor: timers and native-handle readiness.
//!
//! The reactor is shared by all workers of a scheduler. It has two halves:
//! - a thread-safe front ([`Reactor`]) that any thread uses to submit timer
//!   and handle-wait registrations and to interrupt a blocked poll,
//! - a [`Driver`](driver::Driver) that owns the OS poller and the timer
//!   heap, driven by one worker at a time.
//!
//! Every registration carries a one-shot [`Completion`] that is invoked
//! exactly once with `Ok(())` on expiry/readiness or with the OS error that
//! prevented the wait.

mod command;
mod driver;
mod event;
mod native;
mod poller;
mod timer;

pub use native::{NativeHandle, RawNative, check_ready};

pub(crate) use command::Cancel;

use command::Command;
use driver::Driver;
use poller::{PollWaker, Poller};

use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Sender, channel};
use std::time::Instant;

/// One-shot callback invoked by the reactor when a wait finishes.
pub type Completion = Box<dyn FnOnce(io::Result<()>) + Send + 'static>;

pub(crate) struct Reactor {
    /// Submission side of the command channel drained by the driver.
    sender: Sender<Command>,

    /// Interrupts a driver blocked in the OS poller.
    waker: Arc<PollWaker>,

    driver: Mutex<Driver>,

    /// Set while some worker is inside `Driver::turn`.
    polling: AtomicBool,
}

impl Reactor {
    pub(crate) fn new() -> io::Result<Self> {
        let (sender, receiver) = channel();
        let poller = Poller::new()?;
        let waker = poller.waker();

        Ok(Self {
            sender,
            waker,
            driver: Mutex::new(Driver::new(receiver, poller)),
            polling: AtomicBool::new(false),
        })
    }

    /// Schedules `completion` to run once, at or after `deadline`.
    pub(crate) fn set_timer(
        &self,
        deadline: Instant,
        cancelled: Arc<AtomicBool>,
        completion: Completion,
    ) {
        self.submit(Command::SetTimer {
            deadline,
            completion,
            cancelled,
        });
    }

    /// Runs `completion` once `handle` becomes ready or fails.
    pub(crate) fn register_wait(
        &self,
        handle: NativeHandle,
        cancelled: Arc<AtomicBool>,
        completion: Completion,
    ) {
        self.submit(Command::RegisterWait {
            handle,
            completion,
            cancelled,
        });
    }

    /// Asks the driver to purge the cancelled registrations of one kind.
    ///
    /// The awaiter must have raised its cancellation flag first.
    pub(crate) fn cancel(&self, what: Cancel) {
        self.submit(Command::Cancel(what));
    }

    fn submit(&self, cmd: Command) {
        if let Err(err) = self.sender.send(cmd) {
            if let Some(completion) = err.0.into_completion() {
                completion(Err(io::Error::other("reactor is shut down")));
            }
            return;
        }

        self.waker.wake();
    }

    /// Interrupts the driving worker, if any, so it notices new work.
    pub(crate) fn unpark(&self) {
        if self.polling.load(Ordering::SeqCst) {
            self.waker.wake();
        }
    }

    /// Wakes the driver unconditionally.
    pub(crate) fn interrupt(&self) {
        self.waker.wake();
    }

    /// Drives one reactor iteration if no other worker is doing so.
    ///
    /// `should_block` is evaluated *after* this worker has announced itself
    /// as the poller, so work posted concurrently is either seen by the
    /// check or triggers a wake-up of the poll.
    ///
    /// Returns `None` when another worker holds the driver.
    pub(crate) fn try_turn(&self, should_block: impl FnOnce() -> bool) -> Option<io::Result<()>> {
        let mut driver = self.driver.try_lock()?;

        self.polling.store(true, Ordering::SeqCst);
        let block = should_block();
        let result = driver.turn(block);
        self.polling.store(false, Ordering::SeqCst);

        Some(result)
    }

    /// Number of pending timers and handle waits.
    pub(crate) fn pending(&self) -> usize {
        self.driver.lock().pending()
    }

    /// Drops every registration without completing it.
    pub(crate) fn clear(&self) {
        let garbage = self.driver.lock().clear();
        drop(garbage);
    }
}
