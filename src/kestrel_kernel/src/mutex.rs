//! Mutexes with priority inheritance.
//!
//! Locks are recursive: the owner may lock again and must unlock the same
//! number of times. While a more urgent task waits, the owner's effective
//! priority is raised to the waiter's, transitively through chains of
//! ownership up to [`MUTEX_CHAIN_DEPTH_MAX`] links. Unlocking hands the
//! mutex directly to the most urgent waiter, so no third task can sneak in
//! and acquire it between the release and the waiter's wake-up.
use crate::{
    cfg::MUTEX_CHAIN_DEPTH_MAX,
    error::{BadIdError, CreateError, LockMutexError, TryLockMutexError, UnlockMutexError},
    state::Kernel,
    task::{Priority, TaskId},
    timeout::Ticks,
    wait::{WaitPayload, WaitQueue, Wake},
    Outcome,
};

crate::define_id! {
    /// Identifies a mutex.
    pub struct MutexId
}

/// *Mutex control block* - the state data of a mutex.
#[derive(Debug)]
pub(crate) struct MutexCb {
    pub(crate) owning_task: Option<TaskId>,
    /// Recursive lock count. Zero iff the mutex is unlocked.
    pub(crate) lock_depth: usize,
    pub(crate) wait_queue: WaitQueue,
    /// The next link of the owner's held-mutex chain (see
    /// [`TaskCb::last_mutex_held`](crate::task::TaskCb)).
    pub(crate) prev_mutex_held: Option<MutexId>,
}

impl Kernel {
    pub(crate) fn mutex_cb(&self, mutex: MutexId) -> Result<&MutexCb, BadIdError> {
        self.mutexes.get(mutex.index()).ok_or(BadIdError::BadId)
    }

    pub fn mutex_create(&mut self) -> Result<MutexId, CreateError> {
        if self.mutexes.is_full() {
            return Err(CreateError::OutOfMemory);
        }
        self.mutexes.push(MutexCb {
            owning_task: None,
            lock_depth: 0,
            wait_queue: WaitQueue::new(),
            prev_mutex_held: None,
        });
        Ok(MutexId::from_index(self.mutexes.len() - 1))
    }

    /// The task currently owning the mutex.
    pub fn mutex_owner(&self, mutex: MutexId) -> Result<Option<TaskId>, BadIdError> {
        Ok(self.mutex_cb(mutex)?.owning_task)
    }

    /// Lock the mutex, waiting indefinitely if it is contended.
    pub fn mutex_lock(&mut self, mutex: MutexId) -> Result<Outcome<()>, LockMutexError> {
        self.mutex_lock_inner(mutex, None)
    }

    /// Lock the mutex, waiting at most `ticks`.
    pub fn mutex_lock_timeout(
        &mut self,
        mutex: MutexId,
        ticks: Ticks,
    ) -> Result<Outcome<()>, LockMutexError> {
        if ticks == 0 {
            return Err(LockMutexError::BadParam);
        }
        self.mutex_lock_inner(mutex, Some(ticks))
    }

    /// Lock the mutex only if that is possible without waiting.
    pub fn mutex_try_lock(&mut self, mutex: MutexId) -> Result<(), TryLockMutexError> {
        let task = self.expect_waitable_context()?;
        self.mutex_cb(mutex)?;
        match self.mutexes[mutex.index()].owning_task {
            None => {
                self.lock_core(mutex, task);
                Ok(())
            }
            Some(owner) if owner == task => {
                self.mutexes[mutex.index()].lock_depth += 1;
                Ok(())
            }
            Some(_) => Err(TryLockMutexError::WouldBlock),
        }
    }

    fn mutex_lock_inner(
        &mut self,
        mutex: MutexId,
        timeout: Option<Ticks>,
    ) -> Result<Outcome<()>, LockMutexError> {
        let task = self.expect_waitable_context()?;
        self.mutex_cb(mutex)?;
        match self.mutexes[mutex.index()].owning_task {
            None => {
                self.lock_core(mutex, task);
                Ok(Outcome::Complete(()))
            }
            Some(owner) if owner == task => {
                self.mutexes[mutex.index()].lock_depth += 1;
                Ok(Outcome::Complete(()))
            }
            Some(owner) => {
                // Contended. Queue up and lend the caller's urgency to the
                // owner.
                let (tasks, mutexes) = (&self.tasks, &mut self.mutexes);
                mutexes[mutex.index()].wait_queue.insert(tasks, task);
                let urgency = self.tasks[task.index()].effective_priority;
                self.propagate_priority_boost(owner, urgency);
                self.begin_wait(task, WaitPayload::Mutex(mutex), timeout);
                Ok(Outcome::Pending)
            }
        }
    }

    /// Unlock the mutex. If other tasks are waiting, ownership passes
    /// directly to the most urgent of them.
    pub fn mutex_unlock(&mut self, mutex: MutexId) -> Result<(), UnlockMutexError> {
        let task = self.expect_waitable_context()?;
        let cb = self.mutex_cb(mutex)?;
        if cb.owning_task != Some(task) {
            return Err(UnlockMutexError::NotOwner);
        }
        if cb.lock_depth > 1 {
            self.mutexes[mutex.index()].lock_depth -= 1;
            return Ok(());
        }
        self.unlock_core(mutex, task);
        self.check_preemption();
        Ok(())
    }

    /// Record `task` as the owner of the currently-unowned `mutex`.
    pub(crate) fn lock_core(&mut self, mutex: MutexId, task: TaskId) {
        let prev = self.tasks[task.index()].last_mutex_held;
        self.tasks[task.index()].last_mutex_held = Some(mutex);
        let cb = &mut self.mutexes[mutex.index()];
        debug_assert!(cb.owning_task.is_none());
        cb.owning_task = Some(task);
        cb.lock_depth = 1;
        cb.prev_mutex_held = prev;
    }

    fn unlock_core(&mut self, mutex: MutexId, owner: TaskId) {
        self.unlink_held_mutex(owner, mutex);
        // Boost rollback: whatever urgency this mutex's waiters were lending
        // no longer applies to the old owner
        let effective = self.evaluate_task_effective_priority(owner);
        self.set_task_effective_priority(owner, effective);

        match self.mutexes[mutex.index()].wait_queue.pop_front() {
            Some(next) => {
                // Direct handoff
                self.lock_core(mutex, next);
                let effective = self.evaluate_task_effective_priority(next);
                self.set_task_effective_priority(next, effective);
                self.complete_wait(next, Wake::Mutex(Ok(())));
            }
            None => {
                let cb = &mut self.mutexes[mutex.index()];
                cb.owning_task = None;
                cb.lock_depth = 0;
                cb.prev_mutex_held = None;
            }
        }
    }

    fn unlink_held_mutex(&mut self, task: TaskId, mutex: MutexId) {
        let head = self.tasks[task.index()].last_mutex_held;
        if head == Some(mutex) {
            self.tasks[task.index()].last_mutex_held =
                self.mutexes[mutex.index()].prev_mutex_held;
            self.mutexes[mutex.index()].prev_mutex_held = None;
            return;
        }
        let mut cursor = head;
        while let Some(m) = cursor {
            let next = self.mutexes[m.index()].prev_mutex_held;
            if next == Some(mutex) {
                self.mutexes[m.index()].prev_mutex_held =
                    self.mutexes[mutex.index()].prev_mutex_held;
                self.mutexes[mutex.index()].prev_mutex_held = None;
                return;
            }
            cursor = next;
        }
        debug_assert!(false, "{mutex:?} is not in {task:?}'s held chain");
    }

    /// The priority a task is entitled to: its base priority, raised by the
    /// most urgent waiter of each mutex it holds.
    pub(crate) fn evaluate_task_effective_priority(&self, task: TaskId) -> Priority {
        let cb = &self.tasks[task.index()];
        let mut effective = cb.base_priority;
        let mut held = cb.last_mutex_held;
        while let Some(mutex) = held {
            let mcb = &self.mutexes[mutex.index()];
            if let Some(waiter) = mcb.wait_queue.front() {
                effective = effective.min(self.tasks[waiter.index()].effective_priority);
            }
            held = mcb.prev_mutex_held;
        }
        effective
    }

    /// Raise `owner`'s effective priority to `urgency` and follow the chain:
    /// if the owner is itself blocked on a mutex, that mutex's owner
    /// inherits too.
    pub(crate) fn propagate_priority_boost(&mut self, owner: TaskId, urgency: Priority) {
        let mut owner = owner;
        for _ in 0..MUTEX_CHAIN_DEPTH_MAX {
            if self.tasks[owner.index()].effective_priority <= urgency {
                return;
            }
            self.set_task_effective_priority(owner, urgency);
            match self.tasks[owner.index()].wait.current_wait {
                Some(WaitPayload::Mutex(mutex)) => {
                    match self.mutexes[mutex.index()].owning_task {
                        Some(next) => owner = next,
                        None => return,
                    }
                }
                _ => return,
            }
        }
        log::warn!(
            "priority inheritance chain exceeds {MUTEX_CHAIN_DEPTH_MAX} mutexes; \
             the boost stops here"
        );
    }
}
