use super::raw::RawTask;

use std::mem;
use std::sync::Arc;
use std::task::{RawWaker, RawWakerVTable, Waker};

static VTABLE: RawWakerVTable = RawWakerVTable::new(clone_raw, wake_raw, wake_by_ref_raw, drop_raw);

/// Creates a [`Waker`] that re-queues `task` on its home scheduler.
///
/// # Safety
///
/// The data pointer comes from `Arc::into_raw` and every vtable entry
/// below keeps the strong count balanced: `clone` adds one, `wake` and
/// `drop` release one, `wake_by_ref` leaves it unchanged.
pub(crate) fn make_waker(task: Arc<RawTask>) -> Waker {
    unsafe { Waker::from_raw(RawWaker::new(Arc::into_raw(task) as *const (), &VTABLE)) }
}

fn clone_raw(ptr: *const ()) -> RawWaker {
    let arc = unsafe { Arc::from_raw(ptr as *const RawTask) };
    let cloned = arc.clone();
    mem::forget(arc);

    RawWaker::new(Arc::into_raw(cloned) as *const (), &VTABLE)
}

fn wake_raw(ptr: *const ()) {
    let arc = unsafe { Arc::from_raw(ptr as *const RawTask) };
    arc.wake();
}

fn wake_by_ref_raw(ptr: *const ()) {
    let arc = unsafe { Arc::from_raw(ptr as *const RawTask) };
    arc.clone().wake();
    mem::forget(arc);
}

fn drop_raw(ptr: *const ()) {
    unsafe { drop(Arc::from_raw(ptr as *const RawTask)) };
}
