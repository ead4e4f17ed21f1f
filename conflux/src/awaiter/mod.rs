//! Awaiters: the suspension points of a task.
//!
//! Each type here is a small future standing for one way a task can pause
//! and resume:
//!
//! - [`Ready`] resolves on its first poll (ambient-context queries).
//! - [`Schedule`] hops onto a worker of a given scheduler.
//! - [`YieldNow`] re-queues the task once.
//! - [`WaitUntil`] resumes at or after a deadline.
//! - [`WaitHandle`] resumes when a native handle becomes ready.
//! - [`Adopted`] runs a foreign future, then hops back onto the owning
//!   scheduler.
//!
//! Awaiting a task handle is covered by the handles themselves, see
//! [`task`](crate::task).

mod adopt;
mod ready;
mod schedule;
mod wait;

pub use adopt::Adopted;
pub use ready::Ready;
pub use schedule::{Schedule, YieldNow};
pub use wait::{WaitHandle, WaitUntil};
