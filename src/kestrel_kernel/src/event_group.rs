//! Event groups.
//!
//! An event group holds a word of independent event bits. Waiters name the
//! bits they care about, whether they need all of them or any one, and
//! whether a successful wait atomically clears the matched bits. A single
//! update wakes every waiter whose condition holds, evaluated in wake order
//! (priority, then FIFO), with each atomic clear visible to the waiters
//! evaluated after it.
use arrayvec::ArrayVec;
use bitflags::bitflags;

use crate::{
    cfg::MAX_TASKS,
    error::{BadIdError, CreateError, PollEventsError, UpdateEventGroupError, WaitEventsError},
    state::Kernel,
    timeout::Ticks,
    wait::{WaitPayload, WaitQueue, Wake},
    Outcome,
};

/// A word of event bits.
pub type EventBits = u32;

bitflags! {
    /// Options for event waits.
    pub struct EventWaitFlags: u8 {
        /// Require all the awaited bits instead of any one of them.
        const ALL = 1 << 0;
        /// Atomically clear the matched bits when the wait succeeds.
        const CLEAR = 1 << 1;
    }
}

crate::define_id! {
    /// Identifies an event group.
    pub struct EventGroupId
}

/// *Event group control block* - the state data of an event group.
#[derive(Debug)]
pub(crate) struct EventGroupCb {
    pub(crate) bits: EventBits,
    pub(crate) wait_queue: WaitQueue,
}

/// Check the wait condition `(bits, flags)` against `current`.
///
/// If the condition holds, this returns the matched bits (captured before
/// any clear) and, with [`EventWaitFlags::CLEAR`], removes them from
/// `current`. Otherwise it returns `None` and leaves `current` alone.
pub(crate) fn poll_core(
    current: &mut EventBits,
    bits: EventBits,
    flags: EventWaitFlags,
) -> Option<EventBits> {
    let satisfied = if flags.contains(EventWaitFlags::ALL) {
        *current & bits == bits
    } else {
        *current & bits != 0
    };
    if satisfied {
        let matched = *current & bits;
        if flags.contains(EventWaitFlags::CLEAR) {
            *current &= !bits;
        }
        Some(matched)
    } else {
        None
    }
}

impl Kernel {
    pub(crate) fn event_group_cb(&self, event_group: EventGroupId) -> Result<&EventGroupCb, BadIdError> {
        self.event_groups
            .get(event_group.index())
            .ok_or(BadIdError::BadId)
    }

    pub fn event_group_create(&mut self, initial: EventBits) -> Result<EventGroupId, CreateError> {
        if self.event_groups.is_full() {
            return Err(CreateError::OutOfMemory);
        }
        self.event_groups.push(EventGroupCb {
            bits: initial,
            wait_queue: WaitQueue::new(),
        });
        Ok(EventGroupId::from_index(self.event_groups.len() - 1))
    }

    /// OR `bits` into the event group and wake the waiters whose condition
    /// now holds.
    pub fn event_post(
        &mut self,
        event_group: EventGroupId,
        bits: EventBits,
    ) -> Result<(), UpdateEventGroupError> {
        let cb = self.event_group_cb(event_group)?;
        let new = cb.bits | bits;
        if new == cb.bits {
            // No new bit; no pending waiter can newly match
            return Ok(());
        }
        self.event_groups[event_group.index()].bits = new;
        self.wake_event_waiters(event_group);
        Ok(())
    }

    /// Replace the event group's bits wholesale, then wake as `event_post`
    /// does.
    pub fn event_set(
        &mut self,
        event_group: EventGroupId,
        bits: EventBits,
    ) -> Result<(), UpdateEventGroupError> {
        let cb = self.event_group_cb(event_group)?;
        let added = bits & !cb.bits;
        self.event_groups[event_group.index()].bits = bits;
        if added != 0 {
            self.wake_event_waiters(event_group);
        }
        Ok(())
    }

    /// Clear `bits`, returning the value they are cleared from.
    pub fn event_clear(
        &mut self,
        event_group: EventGroupId,
        bits: EventBits,
    ) -> Result<EventBits, UpdateEventGroupError> {
        self.event_group_cb(event_group)?;
        let cb = &mut self.event_groups[event_group.index()];
        let prior = cb.bits;
        cb.bits &= !bits;
        Ok(prior)
    }

    /// The current event bits.
    pub fn event_bits(&self, event_group: EventGroupId) -> Result<EventBits, BadIdError> {
        Ok(self.event_group_cb(event_group)?.bits)
    }

    /// Wait until the condition `(bits, flags)` holds, indefinitely.
    pub fn event_wait(
        &mut self,
        event_group: EventGroupId,
        bits: EventBits,
        flags: EventWaitFlags,
    ) -> Result<Outcome<EventBits>, WaitEventsError> {
        self.event_wait_inner(event_group, bits, flags, None)
    }

    /// Wait until the condition `(bits, flags)` holds, at most `ticks`. A
    /// timed-out wait still reports the awaited bits present at expiry.
    pub fn event_wait_timeout(
        &mut self,
        event_group: EventGroupId,
        bits: EventBits,
        flags: EventWaitFlags,
        ticks: Ticks,
    ) -> Result<Outcome<EventBits>, WaitEventsError> {
        if ticks == 0 {
            return Err(WaitEventsError::BadParam);
        }
        self.event_wait_inner(event_group, bits, flags, Some(ticks))
    }

    /// Check the condition `(bits, flags)` without waiting.
    pub fn event_poll(
        &mut self,
        event_group: EventGroupId,
        bits: EventBits,
        flags: EventWaitFlags,
    ) -> Result<EventBits, PollEventsError> {
        if bits == 0 {
            return Err(PollEventsError::BadParam);
        }
        self.event_group_cb(event_group)?;
        let cb = &mut self.event_groups[event_group.index()];
        poll_core(&mut cb.bits, bits, flags).ok_or(PollEventsError::WouldBlock)
    }

    fn event_wait_inner(
        &mut self,
        event_group: EventGroupId,
        bits: EventBits,
        flags: EventWaitFlags,
        timeout: Option<Ticks>,
    ) -> Result<Outcome<EventBits>, WaitEventsError> {
        let task = self.expect_waitable_context()?;
        if bits == 0 {
            return Err(WaitEventsError::BadParam);
        }
        self.event_group_cb(event_group)?;
        let cb = &mut self.event_groups[event_group.index()];
        if let Some(matched) = poll_core(&mut cb.bits, bits, flags) {
            return Ok(Outcome::Complete(matched));
        }
        let (tasks, event_groups) = (&self.tasks, &mut self.event_groups);
        event_groups[event_group.index()]
            .wait_queue
            .insert(tasks, task);
        self.begin_wait(
            task,
            WaitPayload::EventGroup {
                event_group,
                bits,
                flags,
            },
            timeout,
        );
        Ok(Outcome::Pending)
    }

    /// One pass over the wait queue in wake order. Each waiter's condition
    /// is evaluated against the bits as left by the waiters before it, so an
    /// atomic clear consumes the bits for everyone evaluated later.
    fn wake_event_waiters(&mut self, event_group: EventGroupId) {
        let mut bits = self.event_groups[event_group.index()].bits;
        let mut woken: ArrayVec<(crate::task::TaskId, EventBits), MAX_TASKS> = ArrayVec::new();
        for &task in self.event_groups[event_group.index()].wait_queue.iter() {
            let payload = self.tasks[task.index()].wait.current_wait;
            if let Some(WaitPayload::EventGroup {
                bits: mask, flags, ..
            }) = payload
            {
                if let Some(matched) = poll_core(&mut bits, mask, flags) {
                    woken.push((task, matched));
                }
            } else {
                debug_assert!(false, "{task:?} queued with a foreign wait payload");
            }
        }
        self.event_groups[event_group.index()].bits = bits;
        let any = !woken.is_empty();
        for (task, matched) in woken {
            self.event_groups[event_group.index()].wait_queue.remove(task);
            self.complete_wait(
                task,
                Wake::EventGroup {
                    matched,
                    result: Ok(()),
                },
            );
        }
        if any {
            self.check_preemption();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_core_any_matches_subset() {
        let mut current = 0b0110;
        assert_eq!(
            poll_core(&mut current, 0b0011, EventWaitFlags::empty()),
            Some(0b0010)
        );
        assert_eq!(current, 0b0110);
    }

    #[test]
    fn poll_core_all_requires_every_bit() {
        let mut current = 0b0110;
        assert_eq!(poll_core(&mut current, 0b0011, EventWaitFlags::ALL), None);
        current = 0b0111;
        assert_eq!(
            poll_core(&mut current, 0b0011, EventWaitFlags::ALL),
            Some(0b0011)
        );
    }

    #[test]
    fn poll_core_clear_consumes_matched_bits_only() {
        let mut current = 0b1110;
        assert_eq!(
            poll_core(
                &mut current,
                0b0110,
                EventWaitFlags::ALL | EventWaitFlags::CLEAR
            ),
            Some(0b0110)
        );
        assert_eq!(current, 0b1000);
    }
}
