//! Static capacities of the kernel.
//!
//! Everything the kernel owns lives in fixed-size slabs, so the object
//! counts and buffer lengths are compile-time constants.
use crate::task::Priority;

/// The number of task slots.
pub const MAX_TASKS: usize = 32;

/// The number of mutex slots.
pub const MAX_MUTEXES: usize = 16;

/// The number of event group slots.
pub const MAX_EVENT_GROUPS: usize = 16;

/// The number of semaphore slots.
pub const MAX_SEMAPHORES: usize = 16;

/// The number of pipe slots.
pub const MAX_PIPES: usize = 8;

/// The number of transfer requests (per direction) a pipe can keep pended.
pub const PIPE_MAX_REQUESTS: usize = 8;

/// The largest ring buffer a pipe can be created with.
pub const PIPE_BUFFER_LEN: usize = 256;

/// The largest payload a single pipe transfer request can carry.
pub const PIPE_REQUEST_LEN: usize = 256;

/// The number of blocks in the memory pool backing asynchronous sends.
pub const POOL_BLOCK_COUNT: usize = 16;

/// The size of each memory pool block.
pub const POOL_BLOCK_LEN: usize = PIPE_REQUEST_LEN;

/// The most urgent task priority. The negative sub-range
/// `PRIORITY_MIN..0` is the cooperative (non-preemptible) band.
pub const PRIORITY_MIN: Priority = -8;

/// The least urgent task priority.
pub const PRIORITY_MAX: Priority = 7;

/// The number of distinct priority levels.
pub const PRIORITY_LEVELS: usize = (PRIORITY_MAX as isize - PRIORITY_MIN as isize) as usize + 1;

/// The longest mutex ownership chain a priority boost will walk. Boosting
/// stops (with a logged warning) past this depth.
pub const MUTEX_CHAIN_DEPTH_MAX: usize = 8;
