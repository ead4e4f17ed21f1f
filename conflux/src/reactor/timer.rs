use super::Completion;

use std::cmp::Ordering;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::time::Instant;

/// An entry in the reactor timer queue.
///
/// Stored in a `BinaryHeap`; the ordering is reversed so the heap pops the
/// earliest deadline first. Entries with equal deadlines fire in
/// registration order (`seq` breaks the tie).
pub(crate) struct TimerEntry {
    /// The time at or after which the completion runs.
    pub(crate) deadline: Instant,

    /// Monotonic registration counter.
    pub(crate) seq: u64,

    /// Invoked exactly once when the deadline is reached.
    pub(crate) completion: Completion,

    /// Raised by the awaiter if it is dropped first.
    pub(crate) cancelled: Arc<AtomicBool>,
}

impl TimerEntry {
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(AtomicOrdering::Acquire)
    }
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BinaryHeap;
    use std::time::Duration;

    fn entry(deadline: Instant, seq: u64) -> TimerEntry {
        TimerEntry {
            deadline,
            seq,
            completion: Box::new(|_| {}),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    #[test]
    fn test_heap_pops_earliest_deadline_first() {
        let now = Instant::now();
        let mut heap = BinaryHeap::new();

        heap.push(entry(now + Duration::from_millis(30), 0));
        heap.push(entry(now + Duration::from_millis(10), 1));
        heap.push(entry(now + Duration::from_millis(20), 2));

        let order: Vec<u64> = std::iter::from_fn(|| heap.pop().map(|e| e.seq)).collect();
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn test_equal_deadlines_fire_in_registration_order() {
        let at = Instant::now();
        let mut heap = BinaryHeap::new();

        for seq in [3, 1, 2] {
            heap.push(entry(at, seq));
        }

        let order: Vec<u64> = std::iter::from_fn(|| heap.pop().map(|e| e.seq)).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }
}
