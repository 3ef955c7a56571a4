use crate::Work;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Instant;

/// Delayed work ordered by deadline, then by submission order.
pub(super) struct Timers {
    heap: BinaryHeap<Timer>,
    next_seq: u64,
}

impl Timers {
    pub(super) const fn new() -> Self {
        Timers {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    pub(super) fn push(&mut self, deadline: Instant, work: Work) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.heap.push(Timer {
            deadline,
            seq,
            work,
        });
    }

    pub(super) fn next_deadline(&self) -> Option<Instant> {
        self.heap.peek().map(|t| t.deadline)
    }

    /// Removes all timers due at `now`, earliest first.
    pub(super) fn pop_due(&mut self, now: Instant) -> impl Iterator<Item = Work> + '_ {
        std::iter::from_fn(move || {
            if self.heap.peek()?.deadline <= now {
                self.heap.pop().map(|t| t.work)
            } else {
                None
            }
        })
    }

    pub(super) fn len(&self) -> usize {
        self.heap.len()
    }

    pub(super) fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

struct Timer {
    deadline: Instant,
    seq: u64,
    work: Work,
}

// `BinaryHeap` is a max-heap, the ordering is reversed so the earliest timer is on top.
impl Ord for Timer {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Timer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Timer {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for Timer {}
