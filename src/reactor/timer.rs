//! Timer queue: pending scheduled tasks ordered by deadline.
//!
//! Ties on deadline fire in schedule order. Cancelled tasks stay in the
//! heap until they reach the front, then are discarded.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tokio::time::Instant;

use super::context::Task;
use crate::native::NativeHandle;

/// A scheduled task waiting in the queue.
#[derive(Debug)]
pub struct TimerEntry {
    pub deadline: Instant,
    pub task: Task,
    /// Handler for the `timer_task` event. `None` means the reactor's
    /// default handler.
    pub handler: Option<NativeHandle>,
    /// Whether the reactor built `handler` and must release it.
    pub owned: bool,
}

impl TimerEntry {
    fn key(&self) -> (Instant, u64) {
        (self.deadline, self.task.id())
    }
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for TimerEntry {}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerEntry {
    // Reversed: BinaryHeap is a max-heap, we want the earliest first.
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    heap: BinaryHeap<TimerEntry>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: TimerEntry) {
        self.heap.push(entry);
    }

    /// Deadline of the earliest live task.
    ///
    /// Cancelled entries at the front are popped and returned through
    /// `discarded` so the caller can release their handles.
    pub fn next_deadline(&mut self, discarded: &mut Vec<TimerEntry>) -> Option<Instant> {
        while let Some(front) = self.heap.peek() {
            if !front.task.is_cancelled() {
                return Some(front.deadline);
            }
            discarded.extend(self.heap.pop());
        }
        None
    }

    /// Pop every live task whose deadline is at or before `now`, earliest
    /// first. Cancelled entries go to `discarded`.
    pub fn pop_due(&mut self, now: Instant, discarded: &mut Vec<TimerEntry>) -> Vec<TimerEntry> {
        let mut due = Vec::new();
        while self.heap.peek().is_some_and(|e| e.deadline <= now) {
            let Some(entry) = self.heap.pop() else { break };
            if entry.task.is_cancelled() {
                discarded.push(entry);
            } else {
                due.push(entry);
            }
        }
        due
    }

    /// Number of entries, cancelled ones included.
    pub fn len(&self) -> usize {
        self.heap.len()
    }
}
