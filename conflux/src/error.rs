use std::any::Any;
use std::fmt;
use std::io;
use std::panic;

/// Errors reported by the runtime itself.
///
/// Failures raised *inside* a task body are not represented here; they are
/// captured as [`TaskError`] and handed back to whoever awaits the task.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A timer or native-handle wait failed at the OS level.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A worker thread could not be spawned while starting a scheduler.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),

    /// An ambient query was made outside of any executor context.
    #[error("no executor is bound to the current task")]
    NoContext,

    /// The reactor owning the registration has been torn down.
    #[error("the scheduler reactor has shut down")]
    Stopped,
}

const ABANDONED: &str = "task was dropped before completing";

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The failure half of a task [`Outcome`](crate::task::Outcome).
///
/// A panic raised by a task body is caught where the body runs and stored
/// until the task is awaited. Awaiting rethrows the original payload, so a
/// `catch_unwind` around the await site sees exactly the value that was
/// passed to `panic!`/`panic_any`.
pub enum TaskError {
    /// The task body panicked with this payload.
    Panicked(Box<dyn Any + Send + 'static>),

    /// The frame was destroyed before it completed, e.g. because its
    /// scheduler was dropped while the task was still queued.
    Abandoned,
}

impl TaskError {
    /// Returns `true` if the task panicked.
    pub fn is_panic(&self) -> bool {
        matches!(self, TaskError::Panicked(_))
    }

    /// Attempts to view the panic payload as a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            TaskError::Panicked(payload) => payload.downcast_ref::<T>(),
            TaskError::Abandoned => None,
        }
    }

    /// Consumes the error, returning the raw panic payload.
    ///
    /// An abandoned task yields a `&'static str` payload describing it.
    pub fn into_panic(self) -> Box<dyn Any + Send + 'static> {
        match self {
            TaskError::Panicked(payload) => payload,
            TaskError::Abandoned => Box::new(ABANDONED),
        }
    }

    /// Rethrows the captured panic on the current thread.
    pub fn resume(self) -> ! {
        panic::resume_unwind(self.into_panic())
    }

    /// Best-effort textual form of the payload, for diagnostics.
    pub(crate) fn message(&self) -> &str {
        let payload = match self {
            TaskError::Panicked(payload) => payload,
            TaskError::Abandoned => return ABANDONED,
        };

        if let Some(s) = payload.downcast_ref::<&'static str>() {
            s
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.as_str()
        } else {
            "Box<dyn Any>"
        }
    }
}

impl fmt::Debug for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskError::Panicked(_) => f.debug_tuple("Panicked").field(&self.message()).finish(),
            TaskError::Abandoned => f.write_str("Abandoned"),
        }
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskError::Panicked(_) => write!(f, "task panicked: {}", self.message()),
            TaskError::Abandoned => f.write_str(ABANDONED),
        }
    }
}

impl std::error::Error for TaskError {}
