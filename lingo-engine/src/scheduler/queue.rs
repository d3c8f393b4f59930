//! Min-heap of scheduled tasks
//!
//! Ordered by target time quantized to the task epsilon and then by creation
//! sequence, so tasks due at the same instant fire in the order they were
//! scheduled. Quantizing keeps the order total. Insert and pop are O(log n); arbitrary removal
//! rebuilds the heap in O(n), which is fine for dozens of tasks.

use super::{TaskCallback, TaskId, TaskKind};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// A queued callback
pub struct ScheduledTask {
    pub id: TaskId,
    pub kind: TaskKind,
    /// Media seconds (`MediaTime`) or wall-clock ms (`Relative`)
    pub target: f64,
    /// Wall-clock ms when the task was scheduled
    pub created_at_ms: f64,
    pub(crate) seq: u64,
    pub(crate) epsilon: f64,
    pub(crate) callback: TaskCallback,
}

impl ScheduledTask {
    /// Due when `now >= target - epsilon`
    pub fn is_due(&self, now: f64) -> bool {
        now >= self.target - self.epsilon
    }

    /// Target rounded to a multiple of epsilon (exact target when epsilon is 0)
    fn slot(&self) -> f64 {
        if self.epsilon > 0.0 {
            (self.target / self.epsilon).round()
        } else {
            self.target
        }
    }
}

impl std::fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("target", &self.target)
            .field("seq", &self.seq)
            .finish()
    }
}

impl PartialEq for ScheduledTask {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScheduledTask {}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledTask {
    fn cmp(&self, other: &Self) -> Ordering {
        // A queue holds one task kind, so epsilons match; fall back to the
        // exact target if they ever differ
        let by_target = if self.epsilon == other.epsilon {
            self.slot().total_cmp(&other.slot())
        } else {
            self.target.total_cmp(&other.target)
        };
        by_target.then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Binary min-heap of [`ScheduledTask`]s
#[derive(Debug, Default)]
pub struct TaskQueue {
    heap: BinaryHeap<Reverse<ScheduledTask>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: ScheduledTask) {
        self.heap.push(Reverse(task));
    }

    /// Earliest task
    pub fn peek(&self) -> Option<&ScheduledTask> {
        self.heap.peek().map(|Reverse(task)| task)
    }

    /// Pop the head if it is due at `now`
    ///
    /// A non-due head means nothing behind it is due either.
    pub fn pop_due(&mut self, now: f64) -> Option<ScheduledTask> {
        if self.peek()?.is_due(now) {
            self.heap.pop().map(|Reverse(task)| task)
        } else {
            None
        }
    }

    pub fn has_due(&self, now: f64) -> bool {
        self.peek().is_some_and(|task| task.is_due(now))
    }

    /// Remove one task by id
    pub fn remove(&mut self, id: TaskId) -> bool {
        let before = self.heap.len();
        self.heap.retain(|Reverse(task)| task.id != id);
        self.heap.len() != before
    }

    /// Keep only tasks matching `keep`; returns how many were removed
    pub fn retain(&mut self, mut keep: impl FnMut(&ScheduledTask) -> bool) -> usize {
        let before = self.heap.len();
        self.heap.retain(|Reverse(task)| keep(task));
        before - self.heap.len()
    }

    /// Remove everything; returns how many were removed
    pub fn clear(&mut self) -> usize {
        let removed = self.heap.len();
        self.heap.clear();
        removed
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.heap.iter().any(|Reverse(task)| task.id == id)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
