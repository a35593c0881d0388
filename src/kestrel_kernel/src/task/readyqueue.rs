//! The ready queue: per-priority FIFO rings with an occupancy bitmap.
use arrayvec::ArrayVec;

use crate::{
    cfg::{MAX_TASKS, PRIORITY_LEVELS},
    task::TaskId,
    utils::PrioBitmap,
};

/// The result of [`ReadyQueue::pop_front_task`].
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ScheduleDecision {
    /// Keep the current running task.
    Keep,
    /// Switch to the specified task, or go idle.
    SwitchTo(Option<TaskId>),
}

#[derive(Debug)]
pub(crate) struct ReadyQueue {
    queues: [ArrayVec<TaskId, MAX_TASKS>; PRIORITY_LEVELS],
    bitmap: PrioBitmap,
}

impl ReadyQueue {
    pub(crate) fn new() -> Self {
        Self {
            queues: Default::default(),
            bitmap: PrioBitmap::new(),
        }
    }

    pub(crate) fn push_back_task(&mut self, level: usize, task: TaskId) {
        self.queues[level].push(task);
        self.bitmap.set(level);
    }

    pub(crate) fn remove_task(&mut self, level: usize, task: TaskId) -> bool {
        let queue = &mut self.queues[level];
        if let Some(i) = queue.iter().position(|&t| t == task) {
            queue.remove(i);
            if queue.is_empty() {
                self.bitmap.clear(level);
            }
            true
        } else {
            false
        }
    }

    /// Move a task from one priority level to the back of another.
    pub(crate) fn reorder_task(&mut self, task: TaskId, new_level: usize, old_level: usize) {
        if self.remove_task(old_level, task) {
            self.push_back_task(new_level, task);
        } else {
            debug_assert!(false, "{task:?} was not ready at level {old_level}");
        }
    }

    /// Is there a Ready task strictly more urgent than `end`?
    pub(crate) fn has_ready_task_in_priority_range(&self, end: usize) -> bool {
        matches!(self.bitmap.find_set(), Some(level) if level < end)
    }

    /// Decide whether the task at `prev_task_priority` should keep the
    /// processor, and if not, dequeue its replacement. `usize::MAX` means
    /// the previous task cannot continue to run (it is blocked or there is
    /// none).
    pub(crate) fn pop_front_task(&mut self, prev_task_priority: usize) -> ScheduleDecision {
        match self.bitmap.find_set() {
            Some(level) if level < prev_task_priority => {
                let task = self.queues[level].remove(0);
                if self.queues[level].is_empty() {
                    self.bitmap.clear(level);
                }
                ScheduleDecision::SwitchTo(Some(task))
            }
            Some(_) => ScheduleDecision::Keep,
            None if prev_task_priority == usize::MAX => ScheduleDecision::SwitchTo(None),
            None => ScheduleDecision::Keep,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(i: usize) -> TaskId {
        TaskId::from_index(i)
    }

    #[test]
    fn equal_priority_does_not_preempt() {
        let mut q = ReadyQueue::new();
        q.push_back_task(5, t(0));
        assert_eq!(q.pop_front_task(5), ScheduleDecision::Keep);
        assert_eq!(q.pop_front_task(6), ScheduleDecision::Keep);
        assert_eq!(q.pop_front_task(4), ScheduleDecision::SwitchTo(Some(t(0))));
    }

    #[test]
    fn fifo_within_a_level() {
        let mut q = ReadyQueue::new();
        q.push_back_task(3, t(0));
        q.push_back_task(3, t(1));
        q.push_back_task(3, t(2));
        assert_eq!(q.pop_front_task(usize::MAX), ScheduleDecision::SwitchTo(Some(t(0))));
        assert_eq!(q.pop_front_task(usize::MAX), ScheduleDecision::SwitchTo(Some(t(1))));
        assert_eq!(q.pop_front_task(usize::MAX), ScheduleDecision::SwitchTo(Some(t(2))));
        assert_eq!(q.pop_front_task(usize::MAX), ScheduleDecision::SwitchTo(None));
    }

    #[test]
    fn reorder_moves_between_levels() {
        let mut q = ReadyQueue::new();
        q.push_back_task(7, t(0));
        q.reorder_task(t(0), 2, 7);
        assert!(q.has_ready_task_in_priority_range(3));
        assert!(!q.has_ready_task_in_priority_range(2));
        assert!(q.remove_task(2, t(0)));
        assert!(!q.remove_task(2, t(0)));
    }
}
