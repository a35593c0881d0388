//! Global kernel state.
use arrayvec::ArrayVec;

use crate::{
    cfg::{MAX_EVENT_GROUPS, MAX_MUTEXES, MAX_PIPES, MAX_SEMAPHORES, MAX_TASKS},
    error::BadContextError,
    event_group::EventGroupCb,
    mem_pool::MemPoolCb,
    mutex::MutexCb,
    pipe::PipeCb,
    semaphore::SemaphoreCb,
    task::{readyqueue::ReadyQueue, TaskCb, TaskId},
    timeout::TimeoutGlobals,
};

/// The kernel's entire state: every object slab, the scheduler, and the
/// timeout manager.
///
/// Exclusive access to this value is the kernel's critical section. All
/// services are methods taking `&mut self`; an embedding keeps the value in
/// one place (typically a `static` guarded by interrupt masking) and every
/// task- and interrupt-level entry point borrows it for the duration of the
/// call.
pub struct Kernel {
    pub(crate) tasks: ArrayVec<TaskCb, MAX_TASKS>,
    pub(crate) mutexes: ArrayVec<MutexCb, MAX_MUTEXES>,
    pub(crate) event_groups: ArrayVec<EventGroupCb, MAX_EVENT_GROUPS>,
    pub(crate) semaphores: ArrayVec<SemaphoreCb, MAX_SEMAPHORES>,
    pub(crate) pipes: ArrayVec<PipeCb, MAX_PIPES>,
    pub(crate) pool: MemPoolCb,
    pub(crate) ready_queue: ReadyQueue,
    pub(crate) running_task: Option<TaskId>,
    pub(crate) timeouts: TimeoutGlobals,
    pub(crate) interrupt_nesting: usize,
    /// A preemption that could not be performed on the spot (interrupt
    /// context, or a cooperative task is Running) and is owed at the next
    /// preemption point.
    pub(crate) pending_preemption: bool,
}

impl Kernel {
    pub fn new() -> Self {
        Self {
            tasks: ArrayVec::new(),
            mutexes: ArrayVec::new(),
            event_groups: ArrayVec::new(),
            semaphores: ArrayVec::new(),
            pipes: ArrayVec::new(),
            pool: MemPoolCb::new(),
            ready_queue: ReadyQueue::new(),
            running_task: None,
            timeouts: TimeoutGlobals::new(),
            interrupt_nesting: 0,
            pending_preemption: false,
        }
    }

    /// The currently Running task, if any.
    pub fn current_task(&self) -> Option<TaskId> {
        self.running_task
    }

    /// Mark the beginning of an interrupt handler. Nests.
    pub fn enter_interrupt(&mut self) {
        self.interrupt_nesting += 1;
    }

    /// Mark the end of an interrupt handler. When the outermost handler
    /// finishes, a deferred preemption takes effect.
    pub fn leave_interrupt(&mut self) -> Result<(), BadContextError> {
        if self.interrupt_nesting == 0 {
            return Err(BadContextError::BadContext);
        }
        self.interrupt_nesting -= 1;
        if self.interrupt_nesting == 0 && self.pending_preemption {
            self.choose_next_running_task();
        }
        Ok(())
    }

    pub fn is_interrupt_context(&self) -> bool {
        self.interrupt_nesting != 0
    }

    /// Check that the current context can wait, and identify the task that
    /// would do the waiting.
    pub(crate) fn expect_waitable_context(&self) -> Result<TaskId, BadContextError> {
        if self.interrupt_nesting != 0 {
            return Err(BadContextError::BadContext);
        }
        self.running_task.ok_or(BadContextError::BadContext)
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}
