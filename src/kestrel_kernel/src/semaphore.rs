//! Semaphores.
use crate::{
    error::{
        BadIdError, CreateError, PollSemaphoreError, SignalSemaphoreError, WaitSemaphoreError,
    },
    state::Kernel,
    timeout::Ticks,
    wait::{WaitPayload, WaitQueue, Wake},
    Outcome,
};

/// Unsigned integer type representing the number of permits held by a
/// semaphore.
pub type SemaphoreValue = u32;

crate::define_id! {
    /// Identifies a semaphore.
    pub struct SemaphoreId
}

/// *Semaphore control block* - the state data of a semaphore.
#[derive(Debug)]
pub(crate) struct SemaphoreCb {
    pub(crate) value: SemaphoreValue,
    pub(crate) max_value: SemaphoreValue,
    pub(crate) wait_queue: WaitQueue,
}

/// Check if the current state of a semaphore, `value`, satisfies the wait
/// condition.
///
/// If `value` satisfies the wait condition, this function updates `value`
/// and returns `true`. Otherwise, it returns `false`.
#[inline]
fn poll_core(value: &mut SemaphoreValue) -> bool {
    if *value > 0 {
        *value -= 1;
        true
    } else {
        false
    }
}

impl Kernel {
    pub(crate) fn semaphore_cb(&self, semaphore: SemaphoreId) -> Result<&SemaphoreCb, BadIdError> {
        self.semaphores
            .get(semaphore.index())
            .ok_or(BadIdError::BadId)
    }

    pub fn semaphore_create(
        &mut self,
        initial: SemaphoreValue,
        max_value: SemaphoreValue,
    ) -> Result<SemaphoreId, CreateError> {
        if max_value == 0 || initial > max_value {
            return Err(CreateError::BadParam);
        }
        if self.semaphores.is_full() {
            return Err(CreateError::OutOfMemory);
        }
        self.semaphores.push(SemaphoreCb {
            value: initial,
            max_value,
            wait_queue: WaitQueue::new(),
        });
        Ok(SemaphoreId::from_index(self.semaphores.len() - 1))
    }

    pub fn semaphore_value(&self, semaphore: SemaphoreId) -> Result<SemaphoreValue, BadIdError> {
        Ok(self.semaphore_cb(semaphore)?.value)
    }

    /// Deposit `count` permits. Waiting tasks are paid first; the remainder
    /// raises the value.
    pub fn semaphore_signal(
        &mut self,
        semaphore: SemaphoreId,
        count: SemaphoreValue,
    ) -> Result<(), SignalSemaphoreError> {
        let cb = self.semaphore_cb(semaphore)?;
        if cb.max_value - cb.value < count {
            return Err(SignalSemaphoreError::QueueOverflow);
        }
        self.semaphore_signal_core(semaphore, count);
        Ok(())
    }

    /// Like [`semaphore_signal`](Self::semaphore_signal), but saturates at
    /// the maximum value instead of failing. Used by internal completion
    /// paths that cannot report an overflow to anyone.
    pub(crate) fn semaphore_signal_core(&mut self, semaphore: SemaphoreId, count: SemaphoreValue) {
        let mut remaining = count;
        let mut woke_any = false;
        // Wake one task per permit; deposit whatever is left over
        while remaining > 0 {
            match self.semaphores[semaphore.index()].wait_queue.pop_front() {
                Some(task) => {
                    self.complete_wait(task, Wake::Semaphore(Ok(())));
                    woke_any = true;
                    remaining -= 1;
                }
                None => {
                    let cb = &mut self.semaphores[semaphore.index()];
                    cb.value = cb.value.saturating_add(remaining).min(cb.max_value);
                    break;
                }
            }
        }
        if woke_any {
            self.check_preemption();
        }
    }

    /// Take one permit, waiting indefinitely for one to become available.
    pub fn semaphore_wait(
        &mut self,
        semaphore: SemaphoreId,
    ) -> Result<Outcome<()>, WaitSemaphoreError> {
        self.semaphore_wait_inner(semaphore, None)
    }

    /// Take one permit, waiting at most `ticks`.
    pub fn semaphore_wait_timeout(
        &mut self,
        semaphore: SemaphoreId,
        ticks: Ticks,
    ) -> Result<Outcome<()>, WaitSemaphoreError> {
        if ticks == 0 {
            return Err(WaitSemaphoreError::BadParam);
        }
        self.semaphore_wait_inner(semaphore, Some(ticks))
    }

    /// Take one permit only if that is possible without waiting.
    pub fn semaphore_poll(&mut self, semaphore: SemaphoreId) -> Result<(), PollSemaphoreError> {
        self.semaphore_cb(semaphore)?;
        if poll_core(&mut self.semaphores[semaphore.index()].value) {
            Ok(())
        } else {
            Err(PollSemaphoreError::WouldBlock)
        }
    }

    fn semaphore_wait_inner(
        &mut self,
        semaphore: SemaphoreId,
        timeout: Option<Ticks>,
    ) -> Result<Outcome<()>, WaitSemaphoreError> {
        let task = self.expect_waitable_context()?;
        self.semaphore_cb(semaphore)?;
        if poll_core(&mut self.semaphores[semaphore.index()].value) {
            return Ok(Outcome::Complete(()));
        }
        // The current state does not satisfy the wait condition. Start
        // waiting; the signaler completes the effect of the wait.
        let (tasks, semaphores) = (&self.tasks, &mut self.semaphores);
        semaphores[semaphore.index()].wait_queue.insert(tasks, task);
        self.begin_wait(task, WaitPayload::Semaphore(semaphore), timeout);
        Ok(Outcome::Pending)
    }
}
