//! Event group posting, waiting, and the cumulative atomic clear.
use kestrel_kernel::{
    error::{PollEventsError, WaitEventsError, WaitError},
    EventWaitFlags, Kernel, Outcome, TaskSt, Wake,
};
use quickcheck_macros::quickcheck;

fn kernel() -> Kernel {
    let _ = env_logger::builder().is_test(true).try_init();
    Kernel::new()
}

#[test]
fn post_accumulates_until_the_condition_holds() {
    let mut k = kernel();
    let a = k.task_create(5).unwrap();
    let b = k.task_create(2).unwrap();
    let eg = k.event_group_create(0).unwrap();
    k.task_activate(a).unwrap();
    k.task_activate(b).unwrap();
    assert!(k
        .event_wait(eg, 0x3, EventWaitFlags::ALL | EventWaitFlags::CLEAR)
        .unwrap()
        .is_pending());
    assert_eq!(k.current_task(), Some(a));
    k.event_post(eg, 0x1).unwrap();
    // only one of the two required bits; b keeps waiting
    assert_eq!(k.task_state(b).unwrap(), TaskSt::Waiting);
    k.event_post(eg, 0x2).unwrap();
    assert_eq!(k.current_task(), Some(b));
    assert_eq!(
        k.take_wake_result(b).unwrap(),
        Some(Wake::EventGroup {
            matched: 0x3,
            result: Ok(())
        })
    );
    // CLEAR consumed the matched bits
    assert_eq!(k.event_bits(eg).unwrap(), 0);
}

#[test]
fn any_wait_without_clear_leaves_the_bits() {
    let mut k = kernel();
    let a = k.task_create(5).unwrap();
    let eg = k.event_group_create(0b100).unwrap();
    k.task_activate(a).unwrap();
    assert_eq!(
        k.event_wait(eg, 0b110, EventWaitFlags::empty()).unwrap(),
        Outcome::Complete(0b100)
    );
    assert_eq!(k.event_bits(eg).unwrap(), 0b100);
}

#[test]
fn clear_is_cumulative_in_wake_order() {
    let mut k = kernel();
    let a = k.task_create(6).unwrap();
    let urgent = k.task_create(1).unwrap();
    let lazy = k.task_create(3).unwrap();
    let eg = k.event_group_create(0).unwrap();
    k.task_activate(a).unwrap();
    k.task_activate(lazy).unwrap();
    assert!(k
        .event_wait(eg, 0x1, EventWaitFlags::CLEAR)
        .unwrap()
        .is_pending());
    k.task_activate(urgent).unwrap();
    assert!(k
        .event_wait(eg, 0x1, EventWaitFlags::CLEAR)
        .unwrap()
        .is_pending());
    assert_eq!(k.current_task(), Some(a));
    k.event_post(eg, 0x1).unwrap();
    // the more urgent waiter consumed the bit; the other never matched
    assert_eq!(k.current_task(), Some(urgent));
    assert_eq!(
        k.take_wake_result(urgent).unwrap(),
        Some(Wake::EventGroup {
            matched: 0x1,
            result: Ok(())
        })
    );
    assert_eq!(k.task_state(lazy).unwrap(), TaskSt::Waiting);
    assert_eq!(k.event_bits(eg).unwrap(), 0);
}

#[test]
fn equal_priority_waiters_wake_fifo() {
    let mut k = kernel();
    let a = k.task_create(6).unwrap();
    let first = k.task_create(3).unwrap();
    let second = k.task_create(3).unwrap();
    let eg = k.event_group_create(0).unwrap();
    k.task_activate(a).unwrap();
    k.task_activate(first).unwrap();
    assert!(k
        .event_wait(eg, 0x1, EventWaitFlags::CLEAR)
        .unwrap()
        .is_pending());
    k.task_activate(second).unwrap();
    assert!(k
        .event_wait(eg, 0x1, EventWaitFlags::CLEAR)
        .unwrap()
        .is_pending());
    k.event_post(eg, 0x1).unwrap();
    assert_eq!(k.current_task(), Some(first));
    assert_eq!(k.task_state(second).unwrap(), TaskSt::Waiting);
}

#[test]
fn set_replaces_and_clear_returns_prior() {
    let mut k = kernel();
    let eg = k.event_group_create(0b1010).unwrap();
    k.event_set(eg, 0b0101).unwrap();
    assert_eq!(k.event_bits(eg).unwrap(), 0b0101);
    assert_eq!(k.event_clear(eg, 0b0001).unwrap(), 0b0101);
    assert_eq!(k.event_bits(eg).unwrap(), 0b0100);
}

#[test]
fn timed_out_wait_reports_the_bits_present_at_expiry() {
    let mut k = kernel();
    let a = k.task_create(5).unwrap();
    let b = k.task_create(2).unwrap();
    let eg = k.event_group_create(0).unwrap();
    k.task_activate(a).unwrap();
    k.task_activate(b).unwrap();
    assert!(k
        .event_wait_timeout(eg, 0x3, EventWaitFlags::ALL, 2)
        .unwrap()
        .is_pending());
    k.event_post(eg, 0x1).unwrap();
    k.handle_tick();
    k.handle_tick();
    assert_eq!(
        k.take_wake_result(b).unwrap(),
        Some(Wake::EventGroup {
            matched: 0x1,
            result: Err(WaitError::Timeout)
        })
    );
    // the partial match was never consumed
    assert_eq!(k.event_bits(eg).unwrap(), 0x1);
}

#[test]
fn poll_and_parameter_validation() {
    let mut k = kernel();
    let a = k.task_create(5).unwrap();
    let eg = k.event_group_create(0x2).unwrap();
    k.task_activate(a).unwrap();
    assert_eq!(
        k.event_poll(eg, 0x3, EventWaitFlags::empty()).unwrap(),
        0x2
    );
    assert_eq!(
        k.event_poll(eg, 0x1, EventWaitFlags::empty()),
        Err(PollEventsError::WouldBlock)
    );
    assert_eq!(
        k.event_poll(eg, 0, EventWaitFlags::empty()),
        Err(PollEventsError::BadParam)
    );
    assert_eq!(
        k.event_wait(eg, 0, EventWaitFlags::empty()),
        Err(WaitEventsError::BadParam)
    );
}

/// A waiter whose condition a random post/set sequence has satisfied is
/// never left sleeping: whenever the waiter is still Waiting, none of its
/// awaited bits are present.
#[quickcheck]
fn a_satisfied_waiter_is_never_left_sleeping(ops: Vec<u8>) -> bool {
    let mut k = Kernel::new();
    let driver = k.task_create(5).unwrap();
    let waiter = k.task_create(2).unwrap();
    let eg = k.event_group_create(0).unwrap();
    k.task_activate(driver).unwrap();
    k.task_activate(waiter).unwrap();
    let mut mask = 0;
    for op in ops {
        if k.current_task() == Some(waiter) {
            // the previous wake has been delivered; start a new wait
            let _ = k.take_wake_result(waiter).unwrap();
            mask = u32::from(op & 0xf) + 1;
            if k
                .event_wait(eg, mask, EventWaitFlags::CLEAR)
                .unwrap()
                .is_pending()
            {
                assert_eq!(k.current_task(), Some(driver));
            }
        }
        let bits = u32::from(op >> 4) + 1;
        if op & 1 == 0 {
            k.event_post(eg, bits).unwrap();
        } else {
            k.event_set(eg, bits).unwrap();
        }
        if k.task_state(waiter).unwrap() == TaskSt::Waiting
            && k.event_bits(eg).unwrap() & mask != 0
        {
            return false;
        }
    }
    true
}
