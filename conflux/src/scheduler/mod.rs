//! Worker pool and run loop.
//!
//! A [`Scheduler`] owns a fixed number of worker threads and one reactor.
//! Workers pull posted work from a shared FIFO; an idle worker takes over
//! the reactor and blocks in the OS poller until work is posted, a timer is
//! due or a native handle becomes ready. At most one worker drives the
//! reactor at any time.
//!
//! Lifecycle: constructed (inactive) → [`start`](Scheduler::start) (active)
//! → [`request_stop`](Scheduler::request_stop) (draining) →
//! [`await_stop`](Scheduler::await_stop) (joined, inactive again).

mod builder;
mod queue;
mod worker;

pub use builder::{SchedulerBuilder, THREAD_NAME_ENV, WORKER_THREADS_ENV};

pub(crate) use queue::Work;

use crate::context;
use crate::error::{Error, Result};
use crate::reactor::Reactor;
use crate::task::raw::RawTask;
use builder::assert_worker_range;
use queue::RunQueue;

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

pub(crate) struct Config {
    pub(crate) workers: usize,
    pub(crate) thread_name: String,
    pub(crate) park_timeout: Duration,
}

/// State shared by the scheduler, its workers and every [`Handle`].
pub(crate) struct Shared {
    pub(crate) id: usize,
    pub(crate) queue: RunQueue,
    pub(crate) reactor: Reactor,
    pub(crate) active_workers: AtomicUsize,
    pub(crate) park_timeout: Duration,
    workers: usize,
    thread_name: String,
    active: AtomicBool,
    stopping: AtomicBool,

    /// Set once the owning `Scheduler` is dropped; later posts are discarded.
    closed: AtomicBool,
}

impl Shared {
    pub(crate) fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    fn post(&self, work: Work) {
        if self.closed.load(Ordering::Acquire) {
            tracing::trace!(scheduler = self.id, "discarding work posted after shutdown");
            return;
        }

        self.queue.push(work);
        self.reactor.unpark();
    }

    /// Releases queued work and reactor registrations.
    ///
    /// Queued tasks and pending completions hold handles back to this
    /// state; dropping them here breaks those reference cycles.
    fn close(&self) {
        self.closed.store(true, Ordering::Release);

        let work = self.queue.drain();
        let dropped = work.len();
        drop(work);

        self.reactor.clear();

        tracing::debug!(scheduler = self.id, dropped, "scheduler closed");
    }
}

/// Cloneable reference to a scheduler, used to post work onto it.
///
/// Handles compare equal when they refer to the same scheduler. A handle
/// may outlive its scheduler; work posted after the scheduler was dropped
/// is discarded.
#[derive(Clone)]
pub struct Handle {
    shared: Arc<Shared>,
}

impl Handle {
    /// Enqueues `work` to run on one of the scheduler's workers.
    ///
    /// Safe to call from any thread, and before the scheduler is started.
    pub fn post<F>(&self, work: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.post(Work::Job(Box::new(work)));
    }

    /// Returns `true` if the calling thread is one of this scheduler's
    /// workers.
    pub fn owns_thread(&self) -> bool {
        context::current_scheduler() == Some(self.shared.id)
    }

    pub(crate) fn push_task(&self, task: Arc<RawTask>) {
        self.shared.post(Work::Task(task));
    }

    pub(crate) fn reactor(&self) -> &Reactor {
        &self.shared.reactor
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for Handle {}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle").field("id", &self.shared.id).finish()
    }
}

/// A fixed-size pool of worker threads sharing one reactor.
///
/// Dropping an active scheduler stops and joins its workers. When the drop
/// happens on one of its own workers, the other workers are joined and the
/// current one exits as soon as the unit of work it is running returns.
///
/// # Examples
///
/// ```rust,ignore
/// let scheduler = Scheduler::with_autostart(true, 4)?;
/// let executor = Executor::new(&scheduler);
///
/// assert_eq!(executor.block_on(async { 42 }), 42);
/// ```
pub struct Scheduler {
    shared: Arc<Shared>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    /// Creates an inactive scheduler with `workers` threads.
    ///
    /// # Panics
    ///
    /// Panics unless `1 <= workers < i32::MAX`.
    ///
    /// # Errors
    ///
    /// Fails if the OS poller backing the reactor cannot be created.
    pub fn new(workers: usize) -> Result<Self> {
        Self::with_autostart(false, workers)
    }

    /// Creates a scheduler and, if `autostart` is set, starts it.
    pub fn with_autostart(autostart: bool, workers: usize) -> Result<Self> {
        let scheduler = SchedulerBuilder::new()
            .worker_threads(workers)
            .autostart(autostart)
            .build()?;

        Ok(scheduler)
    }

    /// Returns a builder for a customized scheduler.
    pub fn builder() -> SchedulerBuilder {
        SchedulerBuilder::new()
    }

    pub(crate) fn with_config(config: Config) -> Result<Self> {
        assert_worker_range(config.workers);

        let shared = Shared {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            queue: RunQueue::new(),
            reactor: Reactor::new()?,
            active_workers: AtomicUsize::new(0),
            park_timeout: config.park_timeout,
            workers: config.workers,
            thread_name: config.thread_name,
            active: AtomicBool::new(false),
            stopping: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        };

        Ok(Self {
            shared: Arc::new(shared),
            threads: Mutex::new(Vec::new()),
        })
    }

    /// Spawns the worker threads.
    ///
    /// Does nothing if the scheduler is already active. If a thread fails to
    /// spawn, the ones already started are stopped and joined again.
    pub fn start(&self) -> Result<()> {
        let mut threads = self.threads.lock();

        if self.shared.active.load(Ordering::Acquire) {
            return Ok(());
        }

        self.shared.stopping.store(false, Ordering::SeqCst);

        for index in 0..self.shared.workers {
            let shared = self.shared.clone();
            let name = format!("{}-{}", self.shared.thread_name, index);

            self.shared.active_workers.fetch_add(1, Ordering::AcqRel);

            let spawned = thread::Builder::new()
                .name(name)
                .spawn(move || worker::run(index, shared));

            match spawned {
                Ok(handle) => threads.push(handle),
                Err(err) => {
                    self.shared.active_workers.fetch_sub(1, Ordering::AcqRel);
                    tracing::error!(scheduler = self.shared.id, error = %err, "failed to spawn worker");

                    self.signal_stop();
                    join_all(threads.drain(..));

                    return Err(Error::Spawn(err));
                }
            }
        }

        self.shared.active.store(true, Ordering::Release);

        tracing::debug!(
            scheduler = self.shared.id,
            workers = self.shared.workers,
            "scheduler started"
        );

        Ok(())
    }

    /// Enqueues `work` to run on one of the workers.
    pub fn post<F>(&self, work: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.post(Work::Job(Box::new(work)));
    }

    /// Asks every worker to stop once its current unit of work returns.
    ///
    /// Work still queued is not started; in-flight work is not interrupted.
    pub fn request_stop(&self) {
        tracing::debug!(
            scheduler = self.shared.id,
            queued = self.shared.queue.len(),
            pending = self.shared.reactor.pending(),
            "stop requested"
        );

        self.signal_stop();
    }

    /// Requests a stop and blocks until every worker has exited.
    ///
    /// # Panics
    ///
    /// Panics if called from one of this scheduler's own workers.
    pub fn await_stop(&self) {
        assert!(
            !self.owns_thread(),
            "a scheduler cannot be joined from one of its own workers"
        );

        self.request_stop();

        let mut threads = self.threads.lock();
        join_all(threads.drain(..));

        self.shared.active.store(false, Ordering::Release);

        tracing::debug!(scheduler = self.shared.id, "scheduler stopped");
    }

    /// Returns `true` if the calling thread is one of this scheduler's
    /// workers.
    pub fn owns_thread(&self) -> bool {
        context::current_scheduler() == Some(self.shared.id)
    }

    /// `true` between a successful [`start`](Self::start) and the return
    /// of [`await_stop`](Self::await_stop).
    pub fn active(&self) -> bool {
        self.shared.active.load(Ordering::Acquire)
    }

    /// Number of worker threads currently inside the run loop.
    pub fn active_workers(&self) -> usize {
        self.shared.active_workers.load(Ordering::Acquire)
    }

    /// Configured number of worker threads.
    pub fn workers(&self) -> usize {
        self.shared.workers
    }

    /// Returns a cloneable handle to this scheduler.
    pub fn handle(&self) -> Handle {
        Handle {
            shared: self.shared.clone(),
        }
    }

    /// Stops from inside one of our own workers: every other worker is
    /// joined, the current thread exits once its unit of work returns.
    fn stop_from_worker(&self) {
        self.request_stop();

        let current = thread::current().id();
        let threads: Vec<_> = self.threads.lock().drain(..).collect();
        let others = threads.into_iter().filter(|h| h.thread().id() != current);

        join_all(others);

        self.shared.active.store(false, Ordering::Release);
    }

    fn signal_stop(&self) {
        self.shared.stopping.store(true, Ordering::SeqCst);
        self.shared.queue.notify_all();
        self.shared.reactor.interrupt();
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("id", &self.shared.id)
            .field("workers", &self.shared.workers)
            .field("active", &self.active())
            .field("active_workers", &self.active_workers())
            .finish()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if self.active() {
            if self.owns_thread() {
                self.stop_from_worker();
            } else {
                self.await_stop();
            }
        }

        self.shared.close();
    }
}

fn join_all(threads: impl Iterator<Item = JoinHandle<()>>) {
    for handle in threads {
        if handle.join().is_err() {
            tracing::error!("worker thread panicked");
        }
    }
}
