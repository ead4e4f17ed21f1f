//! Ambient timers.
//!
//! [`sleep`] and [`sleep_until`] resolve the reactor from the executor of
//! the task awaiting them. To target a specific scheduler, use
//! [`Executor::sleep`](crate::Executor::sleep) and
//! [`Executor::wait_until`](crate::Executor::wait_until) instead.

mod sleep;

#[doc(inline)]
pub use sleep::{sleep, sleep_until};
