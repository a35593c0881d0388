//! Scheduler behavior: dispatch order, preemption, the cooperative band,
//! interrupt deferral, and the task lifecycle.
use kestrel_kernel::{
    error::{BadContextError, CreateError, SuspendTaskError, TerminateTaskError},
    Kernel, Outcome, TaskId, TaskSt,
};
use quickcheck_macros::quickcheck;

fn kernel() -> Kernel {
    let _ = env_logger::builder().is_test(true).try_init();
    Kernel::new()
}

#[test]
fn most_urgent_ready_task_runs() {
    let mut k = kernel();
    let a = k.task_create(5).unwrap();
    let b = k.task_create(2).unwrap();
    assert_eq!(k.current_task(), None);
    k.task_activate(a).unwrap();
    assert_eq!(k.current_task(), Some(a));
    // more urgent; preempts on the spot
    k.task_activate(b).unwrap();
    assert_eq!(k.current_task(), Some(b));
    assert_eq!(k.task_state(a).unwrap(), TaskSt::Ready);
}

#[test]
fn equal_priority_runs_fifo_and_yield_rotates() {
    let mut k = kernel();
    let a = k.task_create(3).unwrap();
    let b = k.task_create(3).unwrap();
    k.task_activate(a).unwrap();
    k.task_activate(b).unwrap();
    // activating an equal does not preempt
    assert_eq!(k.current_task(), Some(a));
    k.task_yield().unwrap();
    assert_eq!(k.current_task(), Some(b));
    k.task_yield().unwrap();
    assert_eq!(k.current_task(), Some(a));
}

#[test]
fn suspend_and_resume() {
    let mut k = kernel();
    let a = k.task_create(5).unwrap();
    let b = k.task_create(3).unwrap();
    k.task_activate(a).unwrap();
    k.task_activate(b).unwrap();
    assert_eq!(k.current_task(), Some(b));
    k.task_suspend(b).unwrap();
    assert_eq!(k.current_task(), Some(a));
    k.task_resume(b).unwrap();
    assert_eq!(k.current_task(), Some(b));
    // a is merely Ready; suspending it does not reschedule
    k.task_suspend(a).unwrap();
    assert_eq!(k.task_state(a).unwrap(), TaskSt::Suspended);
    assert_eq!(k.current_task(), Some(b));
}

#[test]
fn waiting_task_cannot_be_suspended() {
    let mut k = kernel();
    let a = k.task_create(5).unwrap();
    let b = k.task_create(2).unwrap();
    let sem = k.semaphore_create(0, 1).unwrap();
    k.task_activate(a).unwrap();
    k.task_activate(b).unwrap();
    assert!(k.semaphore_wait(sem).unwrap().is_pending());
    assert_eq!(k.task_state(b).unwrap(), TaskSt::Waiting);
    assert_eq!(k.task_suspend(b), Err(SuspendTaskError::BadObjectState));
}

#[test]
fn cooperative_band_defers_preemption_to_yield() {
    let mut k = kernel();
    let coop = k.task_create(-1).unwrap();
    let urgent = k.task_create(-4).unwrap();
    k.task_activate(coop).unwrap();
    assert_eq!(k.current_task(), Some(coop));
    // strictly more urgent, but the running task is cooperative
    k.task_activate(urgent).unwrap();
    assert_eq!(k.current_task(), Some(coop));
    k.task_yield().unwrap();
    assert_eq!(k.current_task(), Some(urgent));
}

#[test]
fn interrupt_defers_preemption_to_leave() {
    let mut k = kernel();
    let a = k.task_create(5).unwrap();
    let b = k.task_create(1).unwrap();
    k.task_activate(a).unwrap();
    k.enter_interrupt();
    assert!(k.is_interrupt_context());
    k.task_activate(b).unwrap();
    assert_eq!(k.current_task(), Some(a));
    k.leave_interrupt().unwrap();
    assert_eq!(k.current_task(), Some(b));
    assert_eq!(k.leave_interrupt(), Err(BadContextError::BadContext));
}

#[test]
fn blocking_calls_are_rejected_in_interrupt_context() {
    let mut k = kernel();
    let a = k.task_create(5).unwrap();
    let sem = k.semaphore_create(0, 1).unwrap();
    let m = k.mutex_create().unwrap();
    k.task_activate(a).unwrap();
    k.enter_interrupt();
    assert!(k.semaphore_wait(sem).is_err());
    assert!(k.mutex_lock(m).is_err());
    assert!(k.task_yield().is_err());
    k.leave_interrupt().unwrap();
    // and permitted again afterwards
    assert_eq!(k.mutex_lock(m).unwrap(), Outcome::Complete(()));
}

#[test]
fn terminate_releases_waits_and_reschedules() {
    let mut k = kernel();
    let a = k.task_create(5).unwrap();
    let b = k.task_create(2).unwrap();
    let sem = k.semaphore_create(0, 10).unwrap();
    k.task_activate(a).unwrap();
    k.task_activate(b).unwrap();
    assert!(k.semaphore_wait(sem).unwrap().is_pending());
    assert_eq!(k.current_task(), Some(a));
    k.task_terminate(b).unwrap();
    assert_eq!(k.task_state(b).unwrap(), TaskSt::Dormant);
    // the permit no longer has a taker; it stays on the semaphore
    k.semaphore_signal(sem, 1).unwrap();
    assert_eq!(k.semaphore_value(sem).unwrap(), 1);
    // terminating the running task elects a successor
    k.task_terminate(a).unwrap();
    assert_eq!(k.current_task(), None);
}

#[test]
fn terminate_refused_while_holding_a_mutex() {
    let mut k = kernel();
    let a = k.task_create(5).unwrap();
    let m = k.mutex_create().unwrap();
    k.task_activate(a).unwrap();
    assert_eq!(k.mutex_lock(m).unwrap(), Outcome::Complete(()));
    assert_eq!(k.task_terminate(a), Err(TerminateTaskError::BadObjectState));
    k.mutex_unlock(m).unwrap();
    k.task_terminate(a).unwrap();
}

#[test]
fn reactivation_restores_the_initial_priority() {
    let mut k = kernel();
    let a = k.task_create(5).unwrap();
    k.task_activate(a).unwrap();
    k.task_set_priority(a, 1).unwrap();
    assert_eq!(k.task_base_priority(a).unwrap(), 1);
    k.task_terminate(a).unwrap();
    k.task_activate(a).unwrap();
    assert_eq!(k.task_base_priority(a).unwrap(), 5);
    assert_eq!(k.task_effective_priority(a).unwrap(), 5);
}

#[test]
fn priority_change_reorders_ready_tasks() {
    let mut k = kernel();
    let a = k.task_create(5).unwrap();
    let b = k.task_create(6).unwrap();
    k.task_activate(a).unwrap();
    k.task_activate(b).unwrap();
    assert_eq!(k.current_task(), Some(a));
    k.task_set_priority(b, 1).unwrap();
    assert_eq!(k.current_task(), Some(b));
    // lowering the running task below a Ready one preempts too
    k.task_set_priority(b, 6).unwrap();
    assert_eq!(k.current_task(), Some(a));
}

#[test]
fn create_rejects_bad_priority_and_exhaustion() {
    let mut k = kernel();
    assert_eq!(k.task_create(-9), Err(CreateError::BadParam));
    assert_eq!(k.task_create(8), Err(CreateError::BadParam));
    for _ in 0..kestrel_kernel::cfg::MAX_TASKS {
        k.task_create(0).unwrap();
    }
    assert_eq!(k.task_create(0), Err(CreateError::OutOfMemory));
}

/// Under an arbitrary stream of lifecycle operations, a preemptive Running
/// task is never outranked by a Ready one, and the processor never idles
/// while work is Ready.
#[quickcheck]
fn running_task_is_never_outranked(ops: Vec<u8>) -> bool {
    let mut k = Kernel::new();
    let tasks: Vec<TaskId> = (0..4).map(|i| k.task_create(i as i8).unwrap()).collect();
    for op in ops {
        let t = tasks[(op as usize / 8) % 4];
        match op % 8 {
            0 => drop(k.task_activate(t)),
            1 => drop(k.task_suspend(t)),
            2 => drop(k.task_resume(t)),
            3 => drop(k.task_terminate(t)),
            4 => drop(k.task_yield()),
            5 => drop(k.task_set_priority(t, (op as i8) % 8)),
            6 => k.handle_tick(),
            _ => {}
        }
        match k.current_task() {
            Some(running) => {
                let rp = k.task_effective_priority(running).unwrap();
                if rp >= 0 {
                    for &t in &tasks {
                        if t != running
                            && k.task_state(t).unwrap() == TaskSt::Ready
                            && k.task_effective_priority(t).unwrap() < rp
                        {
                            return false;
                        }
                    }
                }
            }
            None => {
                for &t in &tasks {
                    if k.task_state(t).unwrap() == TaskSt::Ready {
                        return false;
                    }
                }
            }
        }
    }
    true
}
