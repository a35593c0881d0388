//! Error codes returned by the kernel services.
//!
//! Each service defines its own error enum listing exactly the failures it
//! can produce. A few failures exist on their own as single-variant enums so
//! that internal helpers can return them and have the caller convert with
//! `?` into the service-specific enum.

macro_rules! define_error {
    (
        $(#[$meta:meta])*
        pub enum $Name:ident {
            $(
                $(#[$vmeta:meta])*
                $Variant:ident
            ),* $(,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $Name {
            $( $(#[$vmeta])* $Variant, )*
        }
    };
}

/// Generate `From<$Sub> for $Name` conversions, mapping the sub-error to the
/// like-named variant of each service error enum.
macro_rules! impl_sub_error {
    ($Sub:ident => $Variant:ident => $($Name:ident),* $(,)*) => {
        $(
            impl From<$Sub> for $Name {
                #[inline]
                fn from(_: $Sub) -> Self {
                    Self::$Variant
                }
            }
        )*
    };
}

define_error! {
    /// The object ID does not designate an existing object.
    pub enum BadIdError { BadId }
}

define_error! {
    /// The operation is not permitted in the current context (e.g., a
    /// blocking call from an interrupt handler or from outside any task).
    pub enum BadContextError { BadContext }
}

define_error! {
    /// A parameter is out of the permitted range.
    pub enum BadParamError { BadParam }
}

define_error! {
    /// Error type for the object creation services.
    pub enum CreateError {
        /// A parameter is out of the permitted range.
        BadParam,
        /// All slots of the object's slab are in use.
        OutOfMemory,
    }
}

define_error! {
    /// Error type for [`Kernel::task_activate`](crate::Kernel::task_activate).
    pub enum ActivateTaskError { BadId, BadObjectState }
}

define_error! {
    /// Error type for [`Kernel::task_terminate`](crate::Kernel::task_terminate).
    pub enum TerminateTaskError {
        BadId,
        /// The task is already Dormant, or it still holds a mutex.
        BadObjectState,
    }
}

define_error! {
    /// Error type for [`Kernel::task_suspend`](crate::Kernel::task_suspend).
    pub enum SuspendTaskError { BadId, BadObjectState }
}

define_error! {
    /// Error type for [`Kernel::task_resume`](crate::Kernel::task_resume).
    pub enum ResumeTaskError { BadId, BadObjectState }
}

define_error! {
    /// Error type for [`Kernel::task_set_priority`](crate::Kernel::task_set_priority).
    pub enum SetTaskPriorityError { BadId, BadParam, BadObjectState }
}

define_error! {
    /// Error type for [`Kernel::task_yield`](crate::Kernel::task_yield).
    pub enum YieldError { BadContext }
}

define_error! {
    /// Error type for the blocking mutex lock services.
    pub enum LockMutexError { BadId, BadContext, BadParam }
}

define_error! {
    /// Error type for [`Kernel::mutex_try_lock`](crate::Kernel::mutex_try_lock).
    pub enum TryLockMutexError {
        BadId,
        BadContext,
        /// The mutex is held by another task.
        WouldBlock,
    }
}

define_error! {
    /// Error type for [`Kernel::mutex_unlock`](crate::Kernel::mutex_unlock).
    pub enum UnlockMutexError {
        BadId,
        BadContext,
        /// The calling task does not own the mutex.
        NotOwner,
    }
}

define_error! {
    /// Error type for the non-waiting event group update services.
    pub enum UpdateEventGroupError { BadId }
}

define_error! {
    /// Error type for the blocking event group wait services.
    pub enum WaitEventsError { BadId, BadContext, BadParam }
}

define_error! {
    /// Error type for [`Kernel::event_poll`](crate::Kernel::event_poll).
    pub enum PollEventsError {
        BadId,
        BadParam,
        /// The wait condition is not currently satisfied.
        WouldBlock,
    }
}

define_error! {
    /// Error type for [`Kernel::semaphore_signal`](crate::Kernel::semaphore_signal).
    pub enum SignalSemaphoreError {
        BadId,
        /// The deposit would push the semaphore value past its maximum.
        QueueOverflow,
    }
}

define_error! {
    /// Error type for the blocking semaphore wait services.
    pub enum WaitSemaphoreError { BadId, BadContext, BadParam }
}

define_error! {
    /// Error type for [`Kernel::semaphore_poll`](crate::Kernel::semaphore_poll).
    pub enum PollSemaphoreError {
        BadId,
        /// The semaphore value is zero.
        WouldBlock,
    }
}

define_error! {
    /// Error type for the blocking pipe send services.
    pub enum PipePutError {
        BadId,
        BadContext,
        BadParam,
        /// The pipe's writer request queue is full.
        QueueOverflow,
    }
}

define_error! {
    /// Error type for the blocking pipe receive services.
    pub enum PipeGetError {
        BadId,
        BadContext,
        BadParam,
        /// The pipe's reader request queue is full.
        QueueOverflow,
    }
}

define_error! {
    /// Error type for [`Kernel::pipe_put_async`](crate::Kernel::pipe_put_async).
    pub enum PipePutAsyncError {
        BadId,
        BadParam,
        /// The pipe's writer request queue is full.
        QueueOverflow,
    }
}

define_error! {
    /// Error type for [`Kernel::pipe_flush`](crate::Kernel::pipe_flush).
    pub enum FlushPipeError { BadId }
}

define_error! {
    /// Error type for [`Kernel::pool_alloc`](crate::Kernel::pool_alloc).
    pub enum AllocBlockError {
        /// No free block is available.
        WouldBlock,
    }
}

define_error! {
    /// Error type for [`Kernel::pool_free`](crate::Kernel::pool_free).
    pub enum FreeBlockError {
        /// The handle does not designate a currently-allocated block.
        BadId,
    }
}

/// Error type for [`Kernel::pipe_try_put`](crate::Kernel::pipe_try_put).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryPipePutError {
    BadId,
    BadContext,
    BadParam,
    /// No byte could be transferred.
    WouldBlock,
    /// Some bytes were transferred, but fewer than the option demands. The
    /// transferred bytes are not rolled back.
    Incomplete { bytes_written: usize },
}

/// Error type for [`Kernel::pipe_try_get`](crate::Kernel::pipe_try_get).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryPipeGetError {
    BadId,
    BadContext,
    BadParam,
    /// No byte could be transferred.
    WouldBlock,
    /// Some bytes were transferred, but fewer than the option demands. The
    /// transferred bytes are not rolled back.
    Incomplete { bytes_read: usize },
}

define_error! {
    /// How a completed wait ended, delivered inside a
    /// [`Wake`](crate::Wake) value.
    pub enum WaitError {
        /// The timeout elapsed before the wait condition was satisfied.
        Timeout,
        /// The wait was forcibly ended.
        Canceled,
    }
}

define_error! {
    /// How a pended pipe transfer request ended when it did not fully
    /// satisfy its option.
    pub enum PipeXferError {
        /// The request reached a terminal state with fewer bytes than its
        /// option demands.
        Incomplete,
        /// The request's timeout elapsed first.
        Timeout,
        /// The request was withdrawn.
        Canceled,
    }
}

impl_sub_error!(BadIdError => BadId =>
    ActivateTaskError, TerminateTaskError, SuspendTaskError, ResumeTaskError,
    SetTaskPriorityError, LockMutexError, TryLockMutexError, UnlockMutexError,
    UpdateEventGroupError, WaitEventsError, PollEventsError,
    SignalSemaphoreError, WaitSemaphoreError, PollSemaphoreError,
    PipePutError, PipeGetError, PipePutAsyncError, FlushPipeError,
    TryPipePutError, TryPipeGetError,
);

impl_sub_error!(BadContextError => BadContext =>
    YieldError, LockMutexError, TryLockMutexError, UnlockMutexError,
    WaitEventsError, WaitSemaphoreError, PipePutError, PipeGetError,
    TryPipePutError, TryPipeGetError,
);

impl_sub_error!(BadParamError => BadParam =>
    CreateError, SetTaskPriorityError, LockMutexError, WaitEventsError,
    PollEventsError, WaitSemaphoreError, PipePutError, PipeGetError,
    PipePutAsyncError, TryPipePutError, TryPipeGetError,
);
