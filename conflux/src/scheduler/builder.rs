use super::{Config, Scheduler};
use crate::error::Result;

use std::str::FromStr;
use std::thread;
use std::time::Duration;

/// Overrides the worker count in [`SchedulerBuilder::from_env`].
pub const WORKER_THREADS_ENV: &str = "CONFLUX_WORKER_THREADS";

/// Overrides the worker thread name prefix in [`SchedulerBuilder::from_env`].
pub const THREAD_NAME_ENV: &str = "CONFLUX_THREAD_NAME";

const DEFAULT_THREAD_NAME: &str = "conflux-worker";
const DEFAULT_PARK_TIMEOUT: Duration = Duration::from_millis(10);

/// Builder for configuring and creating a [`Scheduler`].
///
/// By default the scheduler has one worker per logical CPU, names its
/// threads `conflux-worker-{n}` and is started by [`build`](Self::build).
///
/// # Examples
///
/// ```rust,ignore
/// let scheduler = Scheduler::builder()
///     .worker_threads(4)
///     .thread_name("io")
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct SchedulerBuilder {
    worker_threads: usize,
    thread_name: String,
    autostart: bool,
    park_timeout: Duration,
}

impl SchedulerBuilder {
    /// Creates a builder with the default configuration.
    pub fn new() -> Self {
        let worker_threads = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            worker_threads,
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
            autostart: true,
            park_timeout: DEFAULT_PARK_TIMEOUT,
        }
    }

    /// Creates a builder with defaults overridden from the environment.
    ///
    /// Reads [`WORKER_THREADS_ENV`] and [`THREAD_NAME_ENV`]. Unset or
    /// unparsable variables keep the default.
    pub fn from_env() -> Self {
        let mut builder = Self::new();

        if let Some(n) = env_get_opt::<usize>(WORKER_THREADS_ENV) {
            builder = builder.worker_threads(n);
        }

        if let Some(name) = env_get_opt::<String>(THREAD_NAME_ENV) {
            builder = builder.thread_name(name);
        }

        builder
    }

    /// Sets the number of worker threads.
    ///
    /// # Panics
    ///
    /// Panics unless `1 <= n < i32::MAX`.
    pub fn worker_threads(mut self, n: usize) -> Self {
        assert_worker_range(n);

        self.worker_threads = n;
        self
    }

    /// Sets the worker thread name prefix. Threads are named `{prefix}-{n}`.
    pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name = prefix.into();
        self
    }

    /// Whether [`build`](Self::build) also starts the workers.
    pub fn autostart(mut self, autostart: bool) -> Self {
        self.autostart = autostart;
        self
    }

    /// Upper bound on how long an idle worker sleeps before retrying to
    /// drive the reactor.
    pub fn park_timeout(mut self, timeout: Duration) -> Self {
        self.park_timeout = timeout;
        self
    }

    /// Creates the scheduler, starting it unless autostart was disabled.
    pub fn build(self) -> Result<Scheduler> {
        let scheduler = Scheduler::with_config(Config {
            workers: self.worker_threads,
            thread_name: self.thread_name,
            park_timeout: self.park_timeout,
        })?;

        if self.autostart {
            scheduler.start()?;
        }

        Ok(scheduler)
    }
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The worker-count precondition shared by the builder and the scheduler.
pub(crate) fn assert_worker_range(n: usize) {
    assert!(
        n >= 1 && n < i32::MAX as usize,
        "worker_threads must be in 1..i32::MAX, got {n}"
    );
}

fn env_get_opt<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;

    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable environment override");
            None
        }
    }
}
