//! Lifecycle states of a scheduler-owned frame.
//!
//! Transitions:
//! - `QUEUED → RUNNING` when a worker picks the task up,
//! - `RUNNING → IDLE` when the poll returns `Pending`,
//! - `RUNNING → NOTIFIED` when woken during its own poll,
//! - `IDLE → QUEUED` when woken while suspended,
//! - `NOTIFIED → QUEUED` when the interrupted poll finishes,
//! - `RUNNING → COMPLETED` when the frame returns `Ready`.

/// Suspended, not in any run queue.
pub(crate) const IDLE: usize = 0;

/// Sitting in a run queue.
pub(crate) const QUEUED: usize = 1;

/// Being polled. At most one worker observes this state at a time.
pub(crate) const RUNNING: usize = 2;

/// The frame returned `Poll::Ready` and has been dropped.
pub(crate) const COMPLETED: usize = 3;

/// Woken while running; re-queued once the current poll returns.
pub(crate) const NOTIFIED: usize = 4;
