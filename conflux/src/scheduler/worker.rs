use super::Shared;
use crate::context;

use std::sync::Arc;
use std::sync::atomic::Ordering;

/// Units of work a worker runs back to back before it gives the reactor a
/// non-blocking turn.
const REACTOR_INTERVAL: u32 = 61;

/// Decrements the active worker count when the run loop exits.
struct ActiveGuard<'a>(&'a Shared);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.active_workers.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Runs the worker loop until the scheduler is asked to stop.
///
/// The caller has already counted this worker in `active_workers`.
///
/// Each iteration:
/// 1. runs the next posted unit of work, if any, and every
///    `REACTOR_INTERVAL` units polls the reactor without blocking so timers
///    and readiness are dispatched even while the queue never drains,
/// 2. otherwise drives the reactor if no other worker is doing so,
///    blocking in the OS poller until work is posted, a timer is due or a
///    native handle becomes ready,
/// 3. otherwise parks until work is posted.
pub(crate) fn run(index: usize, shared: Arc<Shared>) {
    let _scheduler = context::enter_scheduler(shared.id);

    let _active = ActiveGuard(&shared);

    tracing::trace!(scheduler = shared.id, worker = index, "worker entered run loop");

    let mut ticks: u32 = 0;

    loop {
        if shared.is_stopping() {
            break;
        }

        if let Some(work) = shared.queue.pop() {
            work.run();

            ticks += 1;
            if ticks == REACTOR_INTERVAL {
                ticks = 0;

                if let Some(Err(err)) = shared.reactor.try_turn(|| false) {
                    tracing::error!(scheduler = shared.id, error = %err, "reactor poll failed");
                }
            }
            continue;
        }

        ticks = 0;

        let turned = shared
            .reactor
            .try_turn(|| shared.queue.is_empty() && !shared.is_stopping());

        match turned {
            Some(Ok(())) => {}
            Some(Err(err)) => {
                tracing::error!(scheduler = shared.id, error = %err, "reactor poll failed");
                shared.queue.park(shared.park_timeout);
            }
            None => shared.queue.park(shared.park_timeout),
        }
    }

    tracing::trace!(scheduler = shared.id, worker = index, "worker left run loop");
}
