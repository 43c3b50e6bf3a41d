use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

use crate::session::Epoch;

/// A scheduled callback into an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timer<E> {
    pub deadline_ms: u64,
    pub epoch: Epoch,
    pub event: E,
    seq: u64,
}

impl<E: Eq> Ord for Timer<E> {
    // Reversed so the max-heap yields the earliest deadline first, then the
    // earliest scheduled among equal deadlines.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline_ms
            .cmp(&self.deadline_ms)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<E: Eq> PartialOrd for Timer<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Virtual-time queue of one-shot timers.
///
/// The queue keeps its own millisecond clock. Engines move it forward with
/// [`TimerQueue::pop_due`] and [`TimerQueue::settle`], which lets a firing timer
/// schedule follow-ups that still land inside the same advance window.
#[derive(Debug, Clone)]
pub struct TimerQueue<E> {
    now_ms: u64,
    next_seq: u64,
    pending: BinaryHeap<Timer<E>>,
}

impl<E: Eq> Default for TimerQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Eq> TimerQueue<E> {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            next_seq: 0,
            pending: BinaryHeap::new(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn schedule(&mut self, delay_ms: u64, epoch: Epoch, event: E) {
        let timer = Timer {
            deadline_ms: self.now_ms.saturating_add(delay_ms),
            epoch,
            event,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.pending.push(timer);
    }

    /// Removes and returns the next timer due at or before `until_ms`, moving the
    /// clock to its deadline.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<Timer<E>> {
        if self.pending.peek()?.deadline_ms > until_ms {
            return None;
        }
        let timer = self.pending.pop()?;
        self.now_ms = self.now_ms.max(timer.deadline_ms);
        Some(timer)
    }

    /// Moves the clock to `until_ms` once every due timer has been popped.
    pub fn settle(&mut self, until_ms: u64) {
        self.now_ms = self.now_ms.max(until_ms);
    }

    pub fn target(&self, elapsed: Duration) -> u64 {
        self.now_ms.saturating_add(elapsed.as_millis() as u64)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pending timers in firing order.
    pub fn pending(&self) -> Vec<&Timer<E>> {
        let mut timers: Vec<&Timer<E>> = self.pending.iter().collect();
        timers.sort_by(|a, b| b.cmp(a));
        timers
    }
}
