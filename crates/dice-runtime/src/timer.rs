#![forbid(unsafe_code)]

//! Deadline-ordered queue of pending timer messages.
//!
//! # Invariants
//!
//! 1. Entries pop in `(deadline, sequence)` order, so timers with equal
//!    deadlines fire in the order they were scheduled.
//! 2. Cancelled entries are never returned; they are pruned lazily when they
//!    reach the head of the queue.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Duration;

use crate::cancellation::CancellationToken;

struct Entry<M> {
    deadline: Duration,
    seq: u64,
    token: CancellationToken,
    msg: M,
}

impl<M> PartialEq for Entry<M> {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl<M> Eq for Entry<M> {}

impl<M> PartialOrd for Entry<M> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<M> Ord for Entry<M> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.deadline
            .cmp(&other.deadline)
            .then(self.seq.cmp(&other.seq))
    }
}

pub(crate) struct TimerQueue<M> {
    heap: BinaryHeap<Reverse<Entry<M>>>,
    next_seq: u64,
}

impl<M> TimerQueue<M> {
    pub(crate) fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    pub(crate) fn push(&mut self, deadline: Duration, token: CancellationToken, msg: M) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Entry {
            deadline,
            seq,
            token,
            msg,
        }));
    }

    /// Earliest deadline among live entries.
    pub(crate) fn next_deadline(&mut self) -> Option<Duration> {
        self.prune_head();
        self.heap.peek().map(|Reverse(e)| e.deadline)
    }

    /// Pop the earliest live entry if it is due at `now`.
    pub(crate) fn pop_due(&mut self, now: Duration) -> Option<M> {
        self.prune_head();
        let due = matches!(self.heap.peek(), Some(Reverse(e)) if e.deadline <= now);
        if due {
            self.heap.pop().map(|Reverse(e)| e.msg)
        } else {
            None
        }
    }

    /// Number of live (uncancelled) entries.
    pub(crate) fn live_len(&self) -> usize {
        self.heap
            .iter()
            .filter(|Reverse(e)| !e.token.is_cancelled())
            .count()
    }

    pub(crate) fn clear(&mut self) {
        self.heap.clear();
    }

    fn prune_head(&mut self) {
        while let Some(Reverse(head)) = self.heap.peek() {
            if !head.token.is_cancelled() {
                break;
            }
            if let Some(Reverse(stale)) = self.heap.pop() {
                tracing::trace!(
                    target: "dice.runtime",
                    deadline_ms = stale.deadline.as_millis() as u64,
                    "dropping cancelled timer"
                );
            }
        }
    }
}
