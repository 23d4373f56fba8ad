//! Pending-task queue
//!
//! FIFO of accepted tasks plus the drain-in-progress flag. Both live under a
//! single session-owned mutex; `draining` is the exclusivity token between
//! the drain worker and synchronous execution.

use std::collections::VecDeque;

use super::task::Task;

#[derive(Default)]
pub(crate) struct TaskQueue {
    tasks: VecDeque<Box<dyn Task>>,
    pub(crate) draining: bool,
}

impl TaskQueue {
    pub(crate) fn push(&mut self, task: Box<dyn Task>) {
        self.tasks.push_back(task);
    }

    pub(crate) fn pop(&mut self) -> Option<Box<dyn Task>> {
        self.tasks.pop_front()
    }

    /// Drop every not-yet-started task. Abandoned tasks are neither run nor
    /// notified. Returns how many were dropped.
    pub(crate) fn abandon_pending(&mut self) -> usize {
        let abandoned = self.tasks.len();
        self.tasks.clear();
        abandoned
    }
}
