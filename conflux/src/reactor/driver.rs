use super::Completion;
use super::command::{Cancel, Command};
use super::event::Event;
use super::native::NativeHandle;
use super::poller::Poller;
use super::timer::TimerEntry;
use crate::utils::Slab;

use std::collections::{BinaryHeap, HashMap};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

/// One awaiter parked on a native handle.
struct Waiter {
    completion: Completion,
    cancelled: Arc<AtomicBool>,
}

impl Waiter {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// A native handle armed in the poller, with everyone waiting on it.
///
/// A handle is registered with the OS at most once; later waits on the
/// same handle join the existing registration.
struct Registration {
    handle: NativeHandle,
    waiters: Vec<Waiter>,
}

/// The single-threaded half of the reactor.
///
/// Exactly one worker at a time holds the driver and calls
/// [`turn`](Self::turn). A turn:
/// 1. applies commands submitted since the last turn,
/// 2. blocks in the OS poller until readiness, a wake-up, or the next
///    timer deadline,
/// 3. completes the native-handle waits that became ready,
/// 4. fires expired timers.
///
/// Completions run on the driving thread while the driver is held. They
/// are expected to be short (store a result, wake a task).
pub(crate) struct Driver {
    receiver: Receiver<Command>,
    poller: Poller,
    events: Vec<Event>,
    timers: BinaryHeap<TimerEntry>,
    waits: Slab<Registration>,

    /// Poller token of every armed handle.
    tokens: HashMap<NativeHandle, usize>,

    /// Timers cancelled since the heap was last purged.
    cancelled_timers: usize,
    next_seq: u64,
}

impl Driver {
    pub(crate) fn new(receiver: Receiver<Command>, poller: Poller) -> Self {
        Self {
            receiver,
            poller,
            events: Vec::with_capacity(64),
            timers: BinaryHeap::new(),
            waits: Slab::with_capacity(64),
            tokens: HashMap::new(),
            cancelled_timers: 0,
            next_seq: 0,
        }
    }

    /// Runs one reactor iteration.
    ///
    /// With `block == false` the poll returns immediately; it is used when
    /// posted work is already waiting and the driver only needs to make
    /// progress on timers and readiness.
    pub(crate) fn turn(&mut self, block: bool) -> io::Result<()> {
        self.apply_commands();

        let timeout = if block {
            self.timers
                .peek()
                .map(|t| t.deadline.saturating_duration_since(Instant::now()))
        } else {
            Some(Duration::ZERO)
        };

        let mut events = std::mem::take(&mut self.events);
        let polled = self.poller.poll(&mut events, timeout);

        for event in events.drain(..) {
            self.dispatch(event);
        }
        self.events = events;

        self.apply_commands();
        self.fire_timers(Instant::now());

        polled
    }

    /// Number of timers and handle waits still pending.
    pub(crate) fn pending(&self) -> usize {
        let timers = self.timers.iter().filter(|t| !t.is_cancelled()).count();
        let waits: usize = self
            .tokens
            .values()
            .filter_map(|&token| self.waits.get(token))
            .map(|r| r.waiters.iter().filter(|w| !w.is_cancelled()).count())
            .sum();

        timers + waits
    }

    /// Removes every pending registration without completing it.
    ///
    /// Used when the owning scheduler is torn down. The completions are
    /// handed back so the caller can drop them (and the wakers they hold)
    /// after releasing the driver.
    pub(crate) fn clear(&mut self) -> Vec<Completion> {
        let mut garbage: Vec<Completion> = Vec::new();

        while let Ok(cmd) = self.receiver.try_recv() {
            garbage.extend(cmd.into_completion());
        }

        self.tokens.clear();
        for registration in self.waits.drain() {
            self.poller.deregister(registration.handle);
            garbage.extend(registration.waiters.into_iter().map(|w| w.completion));
        }

        garbage.extend(self.timers.drain().map(|timer| timer.completion));
        self.cancelled_timers = 0;

        garbage
    }

    fn apply_commands(&mut self) {
        while let Ok(cmd) = self.receiver.try_recv() {
            match cmd {
                Command::SetTimer {
                    deadline,
                    completion,
                    cancelled,
                } => {
                    let seq = self.next_seq;
                    self.next_seq += 1;

                    self.timers.push(TimerEntry {
                        deadline,
                        seq,
                        completion,
                        cancelled,
                    });
                }
                Command::RegisterWait {
                    handle,
                    completion,
                    cancelled,
                } => self.register_wait(handle, Waiter { completion, cancelled }),
                Command::Cancel(Cancel::Timer) => self.purge_timers(),
                Command::Cancel(Cancel::Wait(handle)) => self.purge_waits(handle),
            }
        }
    }

    fn register_wait(&mut self, handle: NativeHandle, waiter: Waiter) {
        if let Some(registration) = self
            .tokens
            .get(&handle)
            .and_then(|&token| self.waits.get_mut(token))
        {
            registration.waiters.push(waiter);
            return;
        }

        let token = self.waits.insert(Registration {
            handle,
            waiters: vec![waiter],
        });

        match self.poller.register(handle, token) {
            Ok(()) => {
                self.tokens.insert(handle, token);
            }
            Err(err) => {
                tracing::debug!(?handle, error = %err, "native handle registration failed");

                if let Some(registration) = self.waits.try_remove(token) {
                    for waiter in registration.waiters {
                        (waiter.completion)(Err(copy_error(&err)));
                    }
                }
            }
        }
    }

    /// Drops the cancelled waiters on `handle`, disarming it once nobody
    /// is left.
    fn purge_waits(&mut self, handle: NativeHandle) {
        let Some(&token) = self.tokens.get(&handle) else {
            return;
        };

        let Some(registration) = self.waits.get_mut(token) else {
            return;
        };

        registration.waiters.retain(|w| !w.is_cancelled());

        if registration.waiters.is_empty() {
            self.waits.try_remove(token);
            self.tokens.remove(&handle);
            self.poller.deregister(handle);
        }
    }

    /// Counts a cancelled timer and rebuilds the heap once half of it is
    /// dead.
    fn purge_timers(&mut self) {
        self.cancelled_timers += 1;

        if self.cancelled_timers * 2 >= self.timers.len() {
            self.timers.retain(|t| !t.is_cancelled());
            self.cancelled_timers = 0;
        }
    }

    fn dispatch(&mut self, event: Event) {
        let Some(registration) = self.waits.try_remove(event.token) else {
            return;
        };

        self.tokens.remove(&registration.handle);
        self.poller.deregister(registration.handle);

        for waiter in registration.waiters {
            if waiter.is_cancelled() {
                continue;
            }

            let result = if event.failed {
                Err(io::Error::other("error condition reported on handle"))
            } else {
                Ok(())
            };

            (waiter.completion)(result);
        }
    }

    fn fire_timers(&mut self, now: Instant) {
        while let Some(timer) = self.timers.peek() {
            if timer.deadline > now {
                break;
            }

            let Some(timer) = self.timers.pop() else {
                break;
            };

            if timer.is_cancelled() {
                self.cancelled_timers = self.cancelled_timers.saturating_sub(1);
                continue;
            }

            (timer.completion)(Ok(()));
        }
    }
}

/// `io::Error` is not `Clone`; keeps the OS code when there is one.
fn copy_error(err: &io::Error) -> io::Error {
    match err.raw_os_error() {
        Some(code) => io::Error::from_raw_os_error(code),
        None => io::Error::new(err.kind(), err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::mpsc::{Sender, channel};

    fn driver() -> (Sender<Command>, Driver) {
        let (sender, receiver) = channel();
        let poller = Poller::new().expect("poller");

        (sender, Driver::new(receiver, poller))
    }

    fn timer(sender: &Sender<Command>, after: Duration) -> Arc<AtomicBool> {
        let cancelled = Arc::new(AtomicBool::new(false));

        sender
            .send(Command::SetTimer {
                deadline: Instant::now() + after,
                completion: Box::new(|_| {}),
                cancelled: cancelled.clone(),
            })
            .unwrap();

        cancelled
    }

    #[test]
    fn test_cancelled_timers_leave_the_heap() {
        let (sender, mut driver) = driver();

        let flags: Vec<_> = (0..4)
            .map(|_| timer(&sender, Duration::from_secs(3600)))
            .collect();
        driver.turn(false).unwrap();
        assert_eq!(driver.pending(), 4);

        for flag in &flags[..2] {
            flag.store(true, Ordering::Release);
            sender.send(Command::Cancel(Cancel::Timer)).unwrap();
        }
        driver.turn(false).unwrap();

        assert_eq!(driver.pending(), 2);
        assert_eq!(driver.timers.len(), 2);
    }

    #[test]
    fn test_expired_timer_fires_once() {
        let (sender, mut driver) = driver();
        let (tx, rx) = channel();

        sender
            .send(Command::SetTimer {
                deadline: Instant::now(),
                completion: Box::new(move |result| tx.send(result.is_ok()).unwrap()),
                cancelled: Arc::new(AtomicBool::new(false)),
            })
            .unwrap();

        driver.turn(false).unwrap();
        driver.turn(false).unwrap();

        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![true]);
        assert_eq!(driver.pending(), 0);
    }
}
