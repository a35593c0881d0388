//! Tasks and the scheduler.
pub(crate) mod readyqueue;

use crate::{
    cfg::{PRIORITY_MAX, PRIORITY_MIN},
    error::{
        ActivateTaskError, BadIdError, CreateError, ResumeTaskError, SetTaskPriorityError,
        SuspendTaskError, TerminateTaskError, YieldError,
    },
    state::Kernel,
    wait::{TaskWait, WaitPayload},
};

use self::readyqueue::ScheduleDecision;

/// Task priority. Numerically lower values are more urgent. Negative
/// priorities form the cooperative band: a Running task with a negative
/// effective priority is not preempted.
pub type Priority = i8;

crate::define_id! {
    /// Identifies a task.
    pub struct TaskId
}

/// Map a priority to its ready-queue level (0 = most urgent).
pub(crate) fn priority_level(priority: Priority) -> usize {
    (priority as isize - PRIORITY_MIN as isize) as usize
}

/// Task state machine.
///
/// `Dormant` doubles as the created-but-never-started and the terminated
/// state; `task_activate` starts the task afresh from either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskSt {
    Dormant,
    Ready,
    Running,
    Waiting,
    Suspended,
}

/// *Task control block* - the state data of a task.
#[derive(Debug)]
pub(crate) struct TaskCb {
    /// The priority the task was created with; `task_activate` restores it.
    pub(crate) init_priority: Priority,
    pub(crate) base_priority: Priority,
    /// `base_priority`, possibly raised by priority inheritance. This is the
    /// priority the scheduler and all wait queues order by.
    pub(crate) effective_priority: Priority,
    pub(crate) st: TaskSt,
    pub(crate) wait: TaskWait,
    /// The head of the singly-linked chain of mutexes the task holds, most
    /// recently locked first. The links live in
    /// [`MutexCb::prev_mutex_held`](crate::mutex::MutexCb).
    pub(crate) last_mutex_held: Option<crate::mutex::MutexId>,
}

impl Kernel {
    pub(crate) fn task_cb(&self, task: TaskId) -> Result<&TaskCb, BadIdError> {
        self.tasks.get(task.index()).ok_or(BadIdError::BadId)
    }

    pub(crate) fn task_cb_mut(&mut self, task: TaskId) -> Result<&mut TaskCb, BadIdError> {
        self.tasks.get_mut(task.index()).ok_or(BadIdError::BadId)
    }

    /// Create a task in the Dormant state.
    pub fn task_create(&mut self, priority: Priority) -> Result<TaskId, CreateError> {
        if !(PRIORITY_MIN..=PRIORITY_MAX).contains(&priority) {
            return Err(CreateError::BadParam);
        }
        if self.tasks.is_full() {
            return Err(CreateError::OutOfMemory);
        }
        self.tasks.push(TaskCb {
            init_priority: priority,
            base_priority: priority,
            effective_priority: priority,
            st: TaskSt::Dormant,
            wait: TaskWait::new(),
            last_mutex_held: None,
        });
        Ok(TaskId::from_index(self.tasks.len() - 1))
    }

    /// Start a Dormant task at its initial priority.
    pub fn task_activate(&mut self, task: TaskId) -> Result<(), ActivateTaskError> {
        let cb = self.task_cb_mut(task)?;
        if cb.st != TaskSt::Dormant {
            return Err(ActivateTaskError::BadObjectState);
        }
        cb.base_priority = cb.init_priority;
        cb.effective_priority = cb.init_priority;
        cb.wait = TaskWait::new();
        self.make_ready(task);
        self.check_preemption();
        Ok(())
    }

    /// Suspend a Ready or Running task. Waiting tasks cannot be suspended.
    pub fn task_suspend(&mut self, task: TaskId) -> Result<(), SuspendTaskError> {
        let cb = self.task_cb(task)?;
        match cb.st {
            TaskSt::Running => {
                self.tasks[task.index()].st = TaskSt::Suspended;
                self.choose_next_running_task();
                Ok(())
            }
            TaskSt::Ready => {
                let level = priority_level(cb.effective_priority);
                self.ready_queue.remove_task(level, task);
                self.tasks[task.index()].st = TaskSt::Suspended;
                Ok(())
            }
            _ => Err(SuspendTaskError::BadObjectState),
        }
    }

    pub fn task_resume(&mut self, task: TaskId) -> Result<(), ResumeTaskError> {
        let cb = self.task_cb(task)?;
        if cb.st != TaskSt::Suspended {
            return Err(ResumeTaskError::BadObjectState);
        }
        self.make_ready(task);
        self.check_preemption();
        Ok(())
    }

    /// Terminate a task, releasing it from any wait queue it occupies. Fails
    /// while the task holds a mutex.
    pub fn task_terminate(&mut self, task: TaskId) -> Result<(), TerminateTaskError> {
        let cb = self.task_cb(task)?;
        if cb.st == TaskSt::Dormant || cb.last_mutex_held.is_some() {
            return Err(TerminateTaskError::BadObjectState);
        }
        match cb.st {
            TaskSt::Ready => {
                let level = priority_level(cb.effective_priority);
                self.ready_queue.remove_task(level, task);
            }
            TaskSt::Waiting => self.cancel_wait(task),
            TaskSt::Running | TaskSt::Suspended => {}
            TaskSt::Dormant => unreachable!(),
        }
        let cb = &mut self.tasks[task.index()];
        cb.st = TaskSt::Dormant;
        cb.wait = TaskWait::new();
        if self.running_task == Some(task) {
            self.choose_next_running_task();
        }
        Ok(())
    }

    /// Change a task's base priority. The effective priority is recomputed
    /// and, if the task is blocked on a mutex, the change is propagated down
    /// the ownership chain.
    pub fn task_set_priority(
        &mut self,
        task: TaskId,
        priority: Priority,
    ) -> Result<(), SetTaskPriorityError> {
        if !(PRIORITY_MIN..=PRIORITY_MAX).contains(&priority) {
            return Err(SetTaskPriorityError::BadParam);
        }
        let cb = self.task_cb_mut(task)?;
        if cb.st == TaskSt::Dormant {
            return Err(SetTaskPriorityError::BadObjectState);
        }
        cb.base_priority = priority;
        let effective = self.evaluate_task_effective_priority(task);
        self.set_task_effective_priority(task, effective);
        if let Some(WaitPayload::Mutex(mutex)) = self.tasks[task.index()].wait.current_wait {
            if let Some(owner) = self.mutexes[mutex.index()].owning_task {
                let urgency = self.tasks[task.index()].effective_priority;
                self.propagate_priority_boost(owner, urgency);
            }
        }
        self.check_preemption();
        Ok(())
    }

    pub fn task_state(&self, task: TaskId) -> Result<TaskSt, BadIdError> {
        Ok(self.task_cb(task)?.st)
    }

    pub fn task_base_priority(&self, task: TaskId) -> Result<Priority, BadIdError> {
        Ok(self.task_cb(task)?.base_priority)
    }

    pub fn task_effective_priority(&self, task: TaskId) -> Result<Priority, BadIdError> {
        Ok(self.task_cb(task)?.effective_priority)
    }

    /// Surrender the processor to the next task of equal or higher urgency.
    /// This is also the preemption point for the cooperative band.
    pub fn task_yield(&mut self) -> Result<(), YieldError> {
        let task = self.expect_waitable_context()?;
        self.make_ready(task);
        self.choose_next_running_task();
        Ok(())
    }

    /// Move a task to the Ready state and enqueue it at the back of its
    /// effective priority level.
    pub(crate) fn make_ready(&mut self, task: TaskId) {
        let cb = &mut self.tasks[task.index()];
        cb.st = TaskSt::Ready;
        let level = priority_level(cb.effective_priority);
        self.ready_queue.push_back_task(level, task);
    }

    /// Preempt the running task if a more urgent one is Ready. In interrupt
    /// context, or while a cooperative task is Running, the switch is
    /// deferred to the next preemption point instead.
    pub(crate) fn check_preemption(&mut self) {
        let prev = self.running_priority_level();
        if !self.ready_queue.has_ready_task_in_priority_range(prev) {
            return;
        }
        if self.interrupt_nesting > 0 {
            self.pending_preemption = true;
            return;
        }
        if let Some(task) = self.running_task {
            let cb = &self.tasks[task.index()];
            if cb.st == TaskSt::Running && cb.effective_priority < 0 {
                self.pending_preemption = true;
                return;
            }
        }
        self.choose_next_running_task();
    }

    fn running_priority_level(&self) -> usize {
        match self.running_task {
            Some(task) => {
                let cb = &self.tasks[task.index()];
                if cb.st == TaskSt::Running {
                    priority_level(cb.effective_priority)
                } else {
                    usize::MAX
                }
            }
            None => usize::MAX,
        }
    }

    /// Elect the next Running task. A task of equal urgency never displaces
    /// the incumbent.
    pub(crate) fn choose_next_running_task(&mut self) {
        self.pending_preemption = false;
        let prev = self.running_priority_level();
        match self.ready_queue.pop_front_task(prev) {
            ScheduleDecision::Keep => {}
            ScheduleDecision::SwitchTo(next) => {
                if let Some(prev_task) = self.running_task {
                    if self.tasks[prev_task.index()].st == TaskSt::Running {
                        // Preempted; goes back to the ready queue
                        self.make_ready(prev_task);
                    }
                }
                if let Some(next_task) = next {
                    self.tasks[next_task.index()].st = TaskSt::Running;
                }
                log::trace!("dispatching {:?} (prev = {:?})", next, self.running_task);
                self.running_task = next;
            }
        }
    }

    /// Update a task's effective priority and its position in whichever
    /// queue currently orders by it.
    pub(crate) fn set_task_effective_priority(&mut self, task: TaskId, new: Priority) {
        let cb = &mut self.tasks[task.index()];
        let old = cb.effective_priority;
        if old == new {
            return;
        }
        cb.effective_priority = new;
        let st = cb.st;
        let payload = cb.wait.current_wait;
        log::trace!("{task:?} effective priority {old} -> {new}");
        match st {
            TaskSt::Ready => {
                self.ready_queue
                    .reorder_task(task, priority_level(new), priority_level(old));
            }
            TaskSt::Waiting => match payload {
                Some(WaitPayload::Mutex(mutex)) => {
                    let (tasks, mutexes) = (&self.tasks, &mut self.mutexes);
                    mutexes[mutex.index()].wait_queue.reorder(tasks, task);
                }
                Some(WaitPayload::Semaphore(semaphore)) => {
                    let (tasks, semaphores) = (&self.tasks, &mut self.semaphores);
                    semaphores[semaphore.index()]
                        .wait_queue
                        .reorder(tasks, task);
                }
                Some(WaitPayload::EventGroup { event_group, .. }) => {
                    let (tasks, event_groups) = (&self.tasks, &mut self.event_groups);
                    event_groups[event_group.index()]
                        .wait_queue
                        .reorder(tasks, task);
                }
                Some(WaitPayload::PipeWriter(pipe)) => {
                    self.reorder_pipe_request(pipe, task, true, new);
                }
                Some(WaitPayload::PipeReader(pipe)) => {
                    self.reorder_pipe_request(pipe, task, false, new);
                }
                None => debug_assert!(false, "{task:?} is Waiting with no payload"),
            },
            TaskSt::Running | TaskSt::Suspended | TaskSt::Dormant => {}
        }
    }
}
