use super::Completion;
use super::native::NativeHandle;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

/// A request sent to whichever worker currently drives the reactor.
///
/// Registration variants carry a one-shot completion which the driver
/// invokes exactly once, and a cancellation flag the requesting awaiter
/// raises when it is dropped before completion.
pub(crate) enum Command {
    SetTimer {
        deadline: Instant,
        completion: Completion,
        cancelled: Arc<AtomicBool>,
    },
    RegisterWait {
        handle: NativeHandle,
        completion: Completion,
        cancelled: Arc<AtomicBool>,
    },

    /// Purge registrations whose cancellation flag has been raised.
    Cancel(Cancel),
}

/// Which kind of registration a dropped awaiter left behind.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Cancel {
    Timer,
    Wait(NativeHandle),
}

impl Command {
    /// Consumes the command, returning its completion, if it has one.
    pub(crate) fn into_completion(self) -> Option<Completion> {
        match self {
            Command::SetTimer { completion, .. } => Some(completion),
            Command::RegisterWait { completion, .. } => Some(completion),
            Command::Cancel(_) => None,
        }
    }
}
