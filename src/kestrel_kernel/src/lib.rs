//! The Kestrel kernel core: a preemptive, priority-scheduled RTOS
//! concurrency layer.
//!
//! This crate provides the state and algorithms of an RTOS kernel without a
//! hardware port: tasks and the scheduler, recursive priority-inheriting
//! mutexes, multi-bit event groups, counting semaphores, bounded byte pipes
//! with partial transfers and asynchronous sends, and the timeout manager
//! shared by all blocking services.
//!
//! # Execution model
//!
//! The whole kernel is an explicit state machine owned by a single [`Kernel`]
//! value. Exclusive (`&mut`) access to it *is* the kernel's critical section;
//! an embedding places the value behind whatever interrupt-masking primitive
//! its platform provides and funnels every service call through it.
//!
//! Because there is no context-switching port, a blocking service call does
//! not suspend the caller's thread of execution. Instead it returns
//! [`Outcome::Pending`] after moving the calling task to the Waiting state
//! and electing the next Running task. When the wait later completes (by a
//! wake or a timeout), the result is stored on the task as a [`Wake`] value
//! and can be collected with [`Kernel::take_wake_result`] once the task is
//! dispatched again.
//!
//! Interrupt handlers are modeled by [`Kernel::enter_interrupt`] and
//! [`Kernel::leave_interrupt`]. While interrupt nesting is non-zero, blocking
//! calls fail with a `BadContext` error and any preemption they would cause
//! is deferred to the outermost `leave_interrupt`.
//!
//! # Priorities
//!
//! Task priorities are signed ([`Priority`]); numerically lower values are
//! more urgent. The negative sub-range is the cooperative band: a Running
//! task with a negative effective priority is never preempted and surrenders
//! the processor only when it blocks or yields.
#![cfg_attr(not(test), no_std)]

pub mod cfg;
pub mod error;
pub mod event_group;
pub mod mem_pool;
pub mod mutex;
pub mod pipe;
pub mod semaphore;
mod state;
pub mod task;
pub mod timeout;
mod utils;
mod wait;

pub use self::{
    event_group::{EventBits, EventGroupId, EventWaitFlags},
    mem_pool::PoolBlockId,
    mutex::MutexId,
    pipe::{PipeId, PipeOption},
    semaphore::{SemaphoreId, SemaphoreValue},
    state::Kernel,
    task::{Priority, TaskId, TaskSt},
    timeout::Ticks,
    wait::Wake,
};

/// The interior of a kernel object handle. Handles are one-based so that
/// `Option<…Id>` is pointer-sized; slot `i` of the corresponding slab is
/// identified by `i + 1`.
pub(crate) type Id = core::num::NonZeroUsize;

macro_rules! define_id {
    ($(#[$meta:meta])* pub struct $Name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $Name(crate::Id);

        impl $Name {
            pub(crate) fn from_index(index: usize) -> Self {
                match crate::Id::new(index + 1) {
                    Some(id) => Self(id),
                    None => unreachable!(),
                }
            }

            /// The slab slot this handle designates.
            pub(crate) fn index(self) -> usize {
                self.0.get() - 1
            }
        }
    };
}
pub(crate) use define_id;

/// The immediate result of a potentially-blocking service call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Outcome<T> {
    /// The operation finished without blocking.
    Complete(T),
    /// The calling task was moved to the Waiting state. The eventual result
    /// will be delivered as a [`Wake`] value, collectable with
    /// [`Kernel::take_wake_result`] after the task runs again.
    Pending,
}

impl<T> Outcome<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Convert to `Some(value)` if the operation completed immediately.
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Complete(value) => Some(value),
            Self::Pending => None,
        }
    }
}
