//! Command queue: tasks accumulated between session turns.
//!
//! Tasks are flushed as one ordered batch. A flush hands over every task
//! pushed since the previous flush, in push order, and leaves the queue
//! empty.

use crate::task::Task;

/// Single-owner FIFO of pending tasks.
#[derive(Debug, Default)]
pub struct CommandQueue {
    tasks: Vec<Task>,
}

impl CommandQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task.
    pub fn push(&mut self, task: Task) {
        self.tasks.push(task);
    }

    /// Take the pending batch, resetting the queue.
    ///
    /// Flushing an empty queue returns an empty batch.
    pub fn flush(&mut self) -> Vec<Task> {
        std::mem::take(&mut self.tasks)
    }

    /// Pending tasks, oldest first.
    pub fn pending(&self) -> &[Task] {
        &self.tasks
    }

    /// Whether a task with this tag is pending.
    pub fn contains(&self, tag: &str) -> bool {
        self.tasks.iter().any(|t| t.is(tag))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
