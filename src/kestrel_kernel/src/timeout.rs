//! The timeout manager.
//!
//! Every blocking service with a timeout shares one min-heap of armed
//! timeouts, keyed by absolute expiry tick. Each Waiting task has at most
//! one armed timeout, so the heap stores task IDs and the per-task
//! [`TimeoutState`] carries the expiry time and the entry's current heap
//! position (maintained by [`BinaryHeapCtx::on_move`]), making removal O(log
//! n) when a wait completes before it expires.
use arrayvec::ArrayVec;

use crate::{
    cfg::MAX_TASKS,
    state::Kernel,
    task::{TaskCb, TaskId},
    utils::{BinaryHeap, BinaryHeapCtx},
};

/// A relative timeout, in ticks. Zero is not a valid wait duration; the
/// `try_` service variants cover the no-wait case.
pub type Ticks = u32;

/// An absolute point in time, in ticks since boot.
pub(crate) type Time64 = u64;

#[derive(Debug)]
pub(crate) struct TimeoutGlobals {
    /// Tasks with an armed timeout, ordered by expiry.
    pub(crate) heap: ArrayVec<TaskId, MAX_TASKS>,
    pub(crate) tick_count: Time64,
}

impl TimeoutGlobals {
    pub(crate) fn new() -> Self {
        Self {
            heap: ArrayVec::new(),
            tick_count: 0,
        }
    }
}

/// Armed-timeout bookkeeping stored on the Waiting task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TimeoutState {
    pub(crate) expires_at: Time64,
    pub(crate) heap_pos: usize,
}

struct TimeoutHeapCtx<'a> {
    tasks: &'a mut [TaskCb],
}

impl TimeoutHeapCtx<'_> {
    fn expires_at(&self, task: TaskId) -> Time64 {
        match self.tasks[task.index()].wait.timeout {
            Some(state) => state.expires_at,
            None => {
                debug_assert!(false, "{task:?} is in the timeout heap but has no timeout");
                Time64::MAX
            }
        }
    }
}

impl BinaryHeapCtx<TaskId> for TimeoutHeapCtx<'_> {
    fn lt(&mut self, x: &TaskId, y: &TaskId) -> bool {
        self.expires_at(*x) < self.expires_at(*y)
    }

    fn on_move(&mut self, e: &mut TaskId, new_index: usize) {
        if let Some(state) = self.tasks[e.index()].wait.timeout.as_mut() {
            state.heap_pos = new_index;
        }
    }
}

impl Kernel {
    /// Arm a timeout for `task`, `ticks` from now.
    pub(crate) fn arm_timeout(&mut self, task: TaskId, ticks: Ticks) {
        let expires_at = self.timeouts.tick_count + Time64::from(ticks);
        debug_assert!(self.tasks[task.index()].wait.timeout.is_none());
        self.tasks[task.index()].wait.timeout = Some(TimeoutState {
            expires_at,
            heap_pos: 0,
        });
        let Kernel { timeouts, tasks, .. } = self;
        timeouts.heap.heap_push(
            task,
            TimeoutHeapCtx {
                tasks: &mut tasks[..],
            },
        );
    }

    /// Remove `task`'s armed timeout, if any. Guaranteed to have removed the
    /// heap entry when it returns.
    pub(crate) fn disarm_timeout(&mut self, task: TaskId) {
        if let Some(state) = self.tasks[task.index()].wait.timeout.take() {
            let Kernel { timeouts, tasks, .. } = self;
            let removed = timeouts.heap.heap_remove(
                state.heap_pos,
                TimeoutHeapCtx {
                    tasks: &mut tasks[..],
                },
            );
            debug_assert_eq!(removed, Some(task));
        }
    }

    /// Advance time by one tick and fire every timeout that has expired.
    /// Callable from interrupt context (wrap with
    /// [`enter_interrupt`](Self::enter_interrupt) /
    /// [`leave_interrupt`](Self::leave_interrupt) there).
    pub fn handle_tick(&mut self) {
        self.timeouts.tick_count += 1;
        let now = self.timeouts.tick_count;
        loop {
            let front = match self.timeouts.heap.first() {
                Some(&task) => task,
                None => break,
            };
            let expires_at = match self.tasks[front.index()].wait.timeout {
                Some(state) => state.expires_at,
                None => {
                    debug_assert!(false, "{front:?} is in the timeout heap but has no timeout");
                    break;
                }
            };
            if expires_at > now {
                break;
            }
            let Kernel { timeouts, tasks, .. } = self;
            let popped = timeouts.heap.heap_pop(TimeoutHeapCtx {
                tasks: &mut tasks[..],
            });
            debug_assert_eq!(popped, Some(front));
            self.tasks[front.index()].wait.timeout = None;
            log::trace!("timeout expired for {front:?} at tick {now}");
            self.wait_timed_out(front);
        }
        self.check_preemption();
    }

    /// Ticks elapsed since boot.
    pub fn tick_count(&self) -> u64 {
        self.timeouts.tick_count
    }
}
