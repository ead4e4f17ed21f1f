//! # Conflux
//!
//! **Conflux** is a small cooperative-concurrency runtime. Ordinary
//! `async` code is run as tasks on a fixed pool of worker threads, can
//! suspend on timers and native-handle readiness without blocking a
//! worker, and can be bridged back to plain threads through a fence.
//!
//! The building blocks, leaf first:
//!
//! - [`sync::Fence`] is a level-triggered signal a plain thread can block on.
//! - [`task`] holds the move-only task handles ([`CaptureTask`](task::CaptureTask),
//!   [`ExecutorTask`](task::ExecutorTask), [`ScheduledTask`](task::ScheduledTask),
//!   [`SyncTask`](task::SyncTask)) and the promise records behind them.
//! - [`awaiter`] holds the suspension points: immediate values, schedule
//!   hops, timed and native-handle waits, adoption of foreign futures.
//! - [`this_coro`] reads the ambient executor a task runs under.
//! - [`Executor`] binds that ambient context to one scheduler.
//! - [`Scheduler`] owns the worker threads and the reactor.
//!
//! A panic inside a task body is captured and rethrown, with its original
//! payload, where the task is awaited or waited on.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use conflux::{Executor, Scheduler};
//! use std::time::Duration;
//!
//! fn main() -> conflux::Result<()> {
//!     let scheduler = Scheduler::with_autostart(true, 4)?;
//!     let executor = Executor::new(&scheduler);
//!
//!     let answer = executor.block_on(async {
//!         let child = conflux::this_coro::spawn(async { 21 });
//!         conflux::time::sleep(Duration::from_millis(5)).await?;
//!         conflux::Result::Ok(child.await * 2)
//!     })?;
//!
//!     assert_eq!(answer, 42);
//!     Ok(())
//! }
//! ```
//!
//! The same thing with the attribute macro:
//!
//! ```rust,ignore
//! #[conflux::main(worker_threads = 4)]
//! async fn main() {
//!     let child = conflux::this_coro::spawn(async { 21 });
//!     assert_eq!(child.await * 2, 42);
//! }
//! ```
//!
//! ## Logging
//!
//! The runtime emits [`tracing`] events (scheduler lifecycle, worker
//! entry and exit, captured panics, reactor failures) and never installs a
//! subscriber itself.

mod context;
mod error;
mod executor;
mod reactor;
mod scheduler;
mod utils;

pub mod awaiter;
pub mod sync;
pub mod task;
pub mod this_coro;
pub mod time;

pub use error::{Error, Result, TaskError};
pub use executor::{Executor, Foreign, Steal, foreign};
pub use reactor::{NativeHandle, RawNative, check_ready};
pub use scheduler::{Handle, Scheduler, SchedulerBuilder, THREAD_NAME_ENV, WORKER_THREADS_ENV};

pub use conflux_macros::{main, test};
