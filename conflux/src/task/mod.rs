//! Task handles and the promise records behind them.
//!
//! Every handle owns one task and is move-only. They differ in where the
//! body runs and how its completion is observed:
//!
//! - [`CaptureTask`] runs on whichever thread polls it, with no executor
//!   affinity.
//! - [`ExecutorTask`] is like `CaptureTask`, but carries the ambient
//!   executor into its body.
//! - [`ScheduledTask`] is a task already posted onto a scheduler. The
//!   handle only observes its outcome.
//! - [`SyncTask`] is a scheduled task with a completion fence, so a plain
//!   thread can block on it.
//!
//! A panic inside a body is captured where it happens and rethrown, with
//! its original payload, when the handle is awaited or waited on.
//! [`TaskHandle::catching`] yields it as an [`Outcome`] instead.

mod capture;
mod executor_task;
mod handle;
mod scheduled;
mod state;
mod sync_task;
mod waker;

pub(crate) mod promise;
pub(crate) mod raw;

pub use capture::{CaptureTask, Frame};
pub use executor_task::ExecutorTask;
pub use handle::{Catching, TaskHandle};
pub use promise::Outcome;
pub use scheduled::ScheduledTask;
pub use sync_task::SyncTask;
