//! Wait queues and the wait/wake machinery shared by all primitives.
use arrayvec::ArrayVec;

use crate::{
    cfg::{MAX_TASKS, PIPE_REQUEST_LEN},
    error::{BadIdError, PipeXferError, WaitError},
    event_group::{EventBits, EventGroupId, EventWaitFlags},
    mutex::MutexId,
    pipe::PipeId,
    semaphore::SemaphoreId,
    state::Kernel,
    task::{TaskCb, TaskId, TaskSt},
    timeout::{Ticks, TimeoutState},
};

/// What a Waiting task is waiting for. Stored in [`TaskWait::current_wait`]
/// so that an early end of the wait (timeout or termination) can unlink the
/// task from the primitive it is parked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WaitPayload {
    Mutex(MutexId),
    Semaphore(SemaphoreId),
    EventGroup {
        event_group: EventGroupId,
        bits: EventBits,
        flags: EventWaitFlags,
    },
    PipeWriter(PipeId),
    PipeReader(PipeId),
}

/// Per-task wait state.
#[derive(Debug)]
pub(crate) struct TaskWait {
    pub(crate) current_wait: Option<WaitPayload>,
    /// Bookkeeping of the armed timeout, if the current wait has one.
    pub(crate) timeout: Option<TimeoutState>,
    /// The result of the last completed wait, not yet collected by the task.
    pub(crate) wake_result: Option<Wake>,
}

impl TaskWait {
    pub(crate) fn new() -> Self {
        Self {
            current_wait: None,
            timeout: None,
            wake_result: None,
        }
    }
}

/// The result of a completed wait, delivered to the woken task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Wake {
    /// A mutex lock. `Ok` means ownership was transferred to this task.
    Mutex(Result<(), WaitError>),
    /// A semaphore wait. `Ok` means one permit was consumed.
    Semaphore(Result<(), WaitError>),
    /// An event wait. `matched` holds the bits that satisfied the condition,
    /// captured before any atomic clear; on timeout it holds whatever subset
    /// of the awaited bits was present at expiry.
    EventGroup {
        matched: EventBits,
        result: Result<(), WaitError>,
    },
    /// A pipe send. `bytes` is the number of bytes accepted by the pipe.
    PipeSend {
        bytes: usize,
        result: Result<(), PipeXferError>,
    },
    /// A pipe receive. `data` holds the received bytes, including any
    /// partial transfer accumulated before a timeout.
    PipeReceive {
        data: ArrayVec<u8, PIPE_REQUEST_LEN>,
        result: Result<(), PipeXferError>,
    },
}

/// A queue of tasks waiting on one primitive, kept sorted by effective
/// priority, most urgent first, FIFO among equals.
#[derive(Debug, Default)]
pub(crate) struct WaitQueue {
    entries: ArrayVec<TaskId, MAX_TASKS>,
}

impl WaitQueue {
    pub(crate) fn new() -> Self {
        Self {
            entries: ArrayVec::new(),
        }
    }

    pub(crate) fn insert(&mut self, tasks: &[TaskCb], task: TaskId) {
        let priority = tasks[task.index()].effective_priority;
        let pos = self
            .entries
            .iter()
            .position(|&t| tasks[t.index()].effective_priority > priority)
            .unwrap_or(self.entries.len());
        self.entries.insert(pos, task);
    }

    pub(crate) fn remove(&mut self, task: TaskId) -> bool {
        if let Some(i) = self.entries.iter().position(|&t| t == task) {
            self.entries.remove(i);
            true
        } else {
            false
        }
    }

    /// Re-place a task after its effective priority changed. No-op if the
    /// task is not in this queue.
    pub(crate) fn reorder(&mut self, tasks: &[TaskCb], task: TaskId) {
        if self.remove(task) {
            self.insert(tasks, task);
        }
    }

    pub(crate) fn front(&self) -> Option<TaskId> {
        self.entries.first().copied()
    }

    pub(crate) fn pop_front(&mut self) -> Option<TaskId> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0))
        }
    }

    pub(crate) fn iter(&self) -> core::slice::Iter<'_, TaskId> {
        self.entries.iter()
    }
}

impl Kernel {
    /// Transition the Running task `task` into the Waiting state and elect
    /// the next Running task. The caller has already linked the task into
    /// the primitive's wait queue.
    pub(crate) fn begin_wait(
        &mut self,
        task: TaskId,
        payload: WaitPayload,
        timeout: Option<Ticks>,
    ) {
        log::trace!("{task:?} waits on {payload:?} (timeout = {timeout:?})");
        let cb = &mut self.tasks[task.index()];
        debug_assert_eq!(cb.st, TaskSt::Running);
        cb.st = TaskSt::Waiting;
        cb.wait.current_wait = Some(payload);
        if let Some(ticks) = timeout {
            self.arm_timeout(task, ticks);
        }
        self.choose_next_running_task();
    }

    /// Complete `task`'s wait, delivering `wake` as its result. The caller
    /// has already unlinked the task from the primitive's wait queue and is
    /// responsible for a subsequent `check_preemption`.
    pub(crate) fn complete_wait(&mut self, task: TaskId, wake: Wake) {
        self.disarm_timeout(task);
        let cb = &mut self.tasks[task.index()];
        debug_assert_eq!(cb.st, TaskSt::Waiting);
        cb.wait.current_wait = None;
        cb.wait.wake_result = Some(wake);
        log::trace!("{task:?} woken");
        self.make_ready(task);
    }

    /// Collect the result of the task's last completed wait.
    pub fn take_wake_result(&mut self, task: TaskId) -> Result<Option<Wake>, BadIdError> {
        Ok(self.task_cb_mut(task)?.wait.wake_result.take())
    }

    /// Called by the timeout manager when a Waiting task's timeout fires.
    pub(crate) fn wait_timed_out(&mut self, task: TaskId) {
        let payload = match self.tasks[task.index()].wait.current_wait {
            Some(payload) => payload,
            None => {
                debug_assert!(false, "{task:?} timed out but is not waiting");
                return;
            }
        };
        match payload {
            WaitPayload::Mutex(mutex) => {
                self.mutexes[mutex.index()].wait_queue.remove(task);
                self.complete_wait(task, Wake::Mutex(Err(WaitError::Timeout)));
            }
            WaitPayload::Semaphore(semaphore) => {
                self.semaphores[semaphore.index()].wait_queue.remove(task);
                self.complete_wait(task, Wake::Semaphore(Err(WaitError::Timeout)));
            }
            WaitPayload::EventGroup {
                event_group, bits, ..
            } => {
                self.event_groups[event_group.index()]
                    .wait_queue
                    .remove(task);
                let current = self.event_groups[event_group.index()].bits;
                self.complete_wait(
                    task,
                    Wake::EventGroup {
                        matched: current & bits,
                        result: Err(WaitError::Timeout),
                    },
                );
            }
            WaitPayload::PipeWriter(pipe) => self.pipe_wait_timed_out(pipe, task, true),
            WaitPayload::PipeReader(pipe) => self.pipe_wait_timed_out(pipe, task, false),
        }
    }

    /// Forcibly end a wait without waking the task (task termination).
    pub(crate) fn cancel_wait(&mut self, task: TaskId) {
        self.disarm_timeout(task);
        let payload = self.tasks[task.index()].wait.current_wait.take();
        match payload {
            Some(WaitPayload::Mutex(mutex)) => {
                self.mutexes[mutex.index()].wait_queue.remove(task);
            }
            Some(WaitPayload::Semaphore(semaphore)) => {
                self.semaphores[semaphore.index()].wait_queue.remove(task);
            }
            Some(WaitPayload::EventGroup { event_group, .. }) => {
                self.event_groups[event_group.index()]
                    .wait_queue
                    .remove(task);
            }
            Some(WaitPayload::PipeWriter(pipe)) => self.pipe_cancel_request(pipe, task, true),
            Some(WaitPayload::PipeReader(pipe)) => self.pipe_cancel_request(pipe, task, false),
            None => debug_assert!(false, "{task:?} is Waiting with no payload"),
        }
    }
}
