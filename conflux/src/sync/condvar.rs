//! Portable fence backend built on a mutex and a condition variable.

use parking_lot::{Condvar, Mutex};

pub(crate) struct RawFence {
    state: Mutex<bool>,
    condvar: Condvar,
}

impl RawFence {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    pub(crate) fn set(&self) {
        *self.state.lock() = true;
        self.condvar.notify_all();
    }

    pub(crate) fn try_set(&self) -> bool {
        let transitioned = {
            let mut state = self.state.lock();
            !std::mem::replace(&mut *state, true)
        };

        self.condvar.notify_all();
        transitioned
    }

    pub(crate) fn clear(&self) {
        *self.state.lock() = false;
    }

    pub(crate) fn is_set(&self) -> bool {
        *self.state.lock()
    }

    pub(crate) fn wait(&self) {
        let mut state = self.state.lock();

        while !*state {
            self.condvar.wait(&mut state);
        }
    }
}
