//! Byte pipes.
//!
//! A pipe moves a byte stream from writers to readers through a bounded
//! ring buffer. Transfers are *requests* that may be satisfied in parts:
//! bytes already moved are never rolled back, and each request's
//! [`PipeOption`] decides both when a pended request completes (all bytes
//! for all-or-nothing, the first byte otherwise) and how much progress
//! counts as success when it is forced to end (timeout or flush).
//!
//! Requests of both directions queue in priority order (most urgent first,
//! FIFO among equals) and data flows whenever both ends can make progress:
//! buffer to readers, pended writers to readers directly, pended writers
//! into freed buffer space. At rest the invariants hold that a pended
//! reader implies an empty buffer and a pended writer implies a full one,
//! and that both directions are never pended at once.
//!
//! Asynchronous sends ([`Kernel::pipe_put_async`]) carry their payload in a
//! memory pool block instead of blocking the caller; the block is returned
//! to the pool when the request ends, and a semaphore can be named to be
//! signaled at that moment.
use core::fmt;

use arrayvec::ArrayVec;
use either::Either;

use crate::{
    cfg::{PIPE_BUFFER_LEN, PIPE_MAX_REQUESTS, PIPE_REQUEST_LEN, POOL_BLOCK_LEN, PRIORITY_MAX},
    error::{
        BadIdError, CreateError, FlushPipeError, PipeGetError, PipePutAsyncError, PipePutError,
        PipeXferError, TryPipeGetError, TryPipePutError,
    },
    mem_pool::PoolBlockId,
    semaphore::SemaphoreId,
    state::Kernel,
    task::{Priority, TaskId},
    timeout::Ticks,
    wait::{WaitPayload, Wake},
    Outcome,
};

crate::define_id! {
    /// Identifies a pipe.
    pub struct PipeId
}

/// Completion policy of a transfer request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeOption {
    /// The request succeeds only if every byte is transferred.
    AllOrNothing,
    /// The request succeeds once at least one byte is transferred.
    AtLeastOne,
    /// The request succeeds regardless of how many bytes are transferred,
    /// including none. Such a request never blocks.
    BestEffort,
}

/// Whether and how a request was forced into a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum XferStatus {
    Busy,
    TimedOut,
    Canceled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestShape {
    /// A blocked task awaits the result.
    Sync(TaskId),
    /// Fire-and-forget; the payload came from a pool block, which is freed
    /// (and `signal` signaled) at the terminal state.
    Async {
        block: PoolBlockId,
        signal: Option<SemaphoreId>,
    },
}

/// One transfer request, live (being served on the caller's stack) or
/// pended in a [`PipeCb`] queue.
#[derive(Debug)]
pub(crate) struct PipeRequest {
    shape: RequestShape,
    /// Queue ordering key: the requester's effective priority at submission.
    priority: Priority,
    /// Total bytes requested.
    size: usize,
    /// Bytes moved so far.
    xferred: usize,
    status: XferStatus,
    option: PipeOption,
    /// Writer: the bytes not yet moved out. Reader: the bytes received.
    data: ArrayVec<u8, PIPE_REQUEST_LEN>,
}

impl PipeRequest {
    fn new_writer(
        shape: RequestShape,
        priority: Priority,
        payload: &[u8],
        option: PipeOption,
    ) -> Self {
        let mut data = ArrayVec::new();
        let ok = data.try_extend_from_slice(payload);
        debug_assert!(ok.is_ok());
        Self {
            shape,
            priority,
            size: payload.len(),
            xferred: 0,
            status: XferStatus::Busy,
            option,
            data,
        }
    }

    fn new_reader(shape: RequestShape, priority: Priority, size: usize, option: PipeOption) -> Self {
        Self {
            shape,
            priority,
            size,
            xferred: 0,
            status: XferStatus::Busy,
            option,
            data: ArrayVec::new(),
        }
    }

    fn remaining(&self) -> usize {
        self.size - self.xferred
    }

    /// The smallest transfer the option accepts as success.
    fn min_xfer(&self) -> usize {
        match self.option {
            PipeOption::AllOrNothing => self.size,
            PipeOption::AtLeastOne => self.size.min(1),
            PipeOption::BestEffort => 0,
        }
    }

    fn is_satisfied(&self) -> bool {
        self.xferred >= self.min_xfer()
    }

    /// The request's terminal result.
    fn reply(&self) -> Result<(), PipeXferError> {
        if self.is_satisfied() {
            Ok(())
        } else {
            match self.status {
                XferStatus::TimedOut => Err(PipeXferError::Timeout),
                XferStatus::Canceled => Err(PipeXferError::Canceled),
                XferStatus::Busy => Err(PipeXferError::Incomplete),
            }
        }
    }
}

/// Bounded byte ring.
pub(crate) struct RingBuffer {
    buf: [u8; PIPE_BUFFER_LEN],
    cap: usize,
    head: usize,
    len: usize,
}

impl RingBuffer {
    fn new(cap: usize) -> Self {
        debug_assert!(cap >= 1 && cap <= PIPE_BUFFER_LEN);
        Self {
            buf: [0; PIPE_BUFFER_LEN],
            cap,
            head: 0,
            len: 0,
        }
    }

    fn level(&self) -> usize {
        self.len
    }

    fn space(&self) -> usize {
        self.cap - self.len
    }

    /// The longest readable run starting at the head.
    fn contiguous(&self) -> &[u8] {
        let n = self.len.min(self.cap - self.head);
        &self.buf[self.head..self.head + n]
    }

    fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.len);
        self.head = (self.head + n) % self.cap;
        self.len -= n;
    }

    /// Append as much of `src` as fits; returns the number of bytes taken.
    fn push_slice(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(self.space());
        for (i, &byte) in src[..n].iter().enumerate() {
            self.buf[(self.head + self.len + i) % self.cap] = byte;
        }
        self.len += n;
        n
    }

    fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}

impl fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("cap", &self.cap)
            .field("len", &self.len)
            .finish()
    }
}

/// *Pipe control block* - the state data of a pipe.
#[derive(Debug)]
pub(crate) struct PipeCb {
    pub(crate) ring: RingBuffer,
    /// Pended send requests, most urgent first.
    pub(crate) writers: ArrayVec<PipeRequest, PIPE_MAX_REQUESTS>,
    /// Pended receive requests, most urgent first.
    pub(crate) readers: ArrayVec<PipeRequest, PIPE_MAX_REQUESTS>,
}

const DONE_CAP: usize = PIPE_MAX_REQUESTS * 2;

fn insert_request(queue: &mut ArrayVec<PipeRequest, PIPE_MAX_REQUESTS>, request: PipeRequest) {
    let pos = queue
        .iter()
        .position(|r| r.priority > request.priority)
        .unwrap_or(queue.len());
    queue.insert(pos, request);
}

/// Move bytes into `reader` from the ring buffer or directly from a pended
/// writer. Returns the number of bytes moved.
fn fill_reader(
    reader: &mut PipeRequest,
    source: Either<&mut RingBuffer, &mut PipeRequest>,
) -> usize {
    match source {
        Either::Left(ring) => {
            let mut moved = 0;
            loop {
                let chunk = ring.contiguous();
                let n = chunk.len().min(reader.remaining());
                if n == 0 {
                    break;
                }
                let ok = reader.data.try_extend_from_slice(&chunk[..n]);
                debug_assert!(ok.is_ok());
                reader.xferred += n;
                ring.consume(n);
                moved += n;
            }
            moved
        }
        Either::Right(writer) => {
            let n = writer.data.len().min(reader.remaining());
            if n > 0 {
                let ok = reader.data.try_extend_from_slice(&writer.data[..n]);
                debug_assert!(ok.is_ok());
                reader.xferred += n;
                writer.data.drain(..n);
                writer.xferred += n;
            }
            n
        }
    }
}

/// Spill a writer's pending bytes into the ring buffer. Returns the number
/// of bytes moved.
fn drain_writer_into_ring(writer: &mut PipeRequest, ring: &mut RingBuffer) -> usize {
    let n = ring.push_slice(&writer.data);
    writer.data.drain(..n);
    writer.xferred += n;
    n
}

/// Pull every request whose option is now satisfied out of the queue. An
/// all-or-nothing request stays until its last byte; any other pended
/// request leaves with the first byte it moves.
fn extract_satisfied(
    queue: &mut ArrayVec<PipeRequest, PIPE_MAX_REQUESTS>,
    is_writer: bool,
    done: &mut ArrayVec<(PipeRequest, bool), DONE_CAP>,
) {
    let mut i = 0;
    while i < queue.len() {
        if queue[i].is_satisfied() {
            done.push((queue.remove(i), is_writer));
        } else {
            i += 1;
        }
    }
}

impl Kernel {
    pub(crate) fn pipe_cb(&self, pipe: PipeId) -> Result<&PipeCb, BadIdError> {
        self.pipes.get(pipe.index()).ok_or(BadIdError::BadId)
    }

    /// Create a pipe with a ring buffer of `capacity` bytes.
    pub fn pipe_create(&mut self, capacity: usize) -> Result<PipeId, CreateError> {
        if capacity == 0 || capacity > PIPE_BUFFER_LEN {
            return Err(CreateError::BadParam);
        }
        if self.pipes.is_full() {
            return Err(CreateError::OutOfMemory);
        }
        self.pipes.push(PipeCb {
            ring: RingBuffer::new(capacity),
            writers: ArrayVec::new(),
            readers: ArrayVec::new(),
        });
        Ok(PipeId::from_index(self.pipes.len() - 1))
    }

    /// Bytes currently readable from the ring buffer.
    pub fn pipe_read_avail(&self, pipe: PipeId) -> Result<usize, BadIdError> {
        Ok(self.pipe_cb(pipe)?.ring.level())
    }

    /// Bytes currently writable into the ring buffer.
    pub fn pipe_write_avail(&self, pipe: PipeId) -> Result<usize, BadIdError> {
        Ok(self.pipe_cb(pipe)?.ring.space())
    }

    /// Send `data`, waiting indefinitely until the option is satisfied.
    pub fn pipe_put(
        &mut self,
        pipe: PipeId,
        data: &[u8],
        option: PipeOption,
    ) -> Result<Outcome<usize>, PipePutError> {
        self.pipe_put_inner(pipe, data, option, None)
    }

    /// Send `data`, waiting at most `ticks`. A timed-out request still
    /// reports the bytes it moved; whether that counts as success is the
    /// option's call.
    pub fn pipe_put_timeout(
        &mut self,
        pipe: PipeId,
        data: &[u8],
        option: PipeOption,
        ticks: Ticks,
    ) -> Result<Outcome<usize>, PipePutError> {
        if ticks == 0 {
            return Err(PipePutError::BadParam);
        }
        self.pipe_put_inner(pipe, data, option, Some(ticks))
    }

    /// Send without waiting. Returns the bytes accepted if the option is
    /// satisfied by the immediate transfer.
    pub fn pipe_try_put(
        &mut self,
        pipe: PipeId,
        data: &[u8],
        option: PipeOption,
    ) -> Result<usize, TryPipePutError> {
        let task = self.expect_waitable_context()?;
        self.pipe_cb(pipe)?;
        if data.len() > PIPE_REQUEST_LEN {
            return Err(TryPipePutError::BadParam);
        }
        let priority = self.tasks[task.index()].effective_priority;
        let mut request =
            PipeRequest::new_writer(RequestShape::Sync(task), priority, data, option);
        self.pump_writer(pipe, &mut request);
        self.check_preemption();
        if request.is_satisfied() {
            Ok(request.xferred)
        } else if request.xferred == 0 {
            Err(TryPipePutError::WouldBlock)
        } else {
            Err(TryPipePutError::Incomplete {
                bytes_written: request.xferred,
            })
        }
    }

    fn pipe_put_inner(
        &mut self,
        pipe: PipeId,
        data: &[u8],
        option: PipeOption,
        timeout: Option<Ticks>,
    ) -> Result<Outcome<usize>, PipePutError> {
        let task = self.expect_waitable_context()?;
        self.pipe_cb(pipe)?;
        if data.len() > PIPE_REQUEST_LEN {
            return Err(PipePutError::BadParam);
        }
        // Checked up front so a partial transfer never has to be unwound
        if self.pipes[pipe.index()].writers.is_full() {
            return Err(PipePutError::QueueOverflow);
        }
        let priority = self.tasks[task.index()].effective_priority;
        let mut request =
            PipeRequest::new_writer(RequestShape::Sync(task), priority, data, option);
        self.pump_writer(pipe, &mut request);
        if request.is_satisfied() {
            self.check_preemption();
            return Ok(Outcome::Complete(request.xferred));
        }
        insert_request(&mut self.pipes[pipe.index()].writers, request);
        self.begin_wait(task, WaitPayload::PipeWriter(pipe), timeout);
        Ok(Outcome::Pending)
    }

    /// Receive up to `buf.len()` bytes, waiting indefinitely until the
    /// option is satisfied.
    pub fn pipe_get(
        &mut self,
        pipe: PipeId,
        buf: &mut [u8],
        option: PipeOption,
    ) -> Result<Outcome<usize>, PipeGetError> {
        self.pipe_get_inner(pipe, buf, option, None)
    }

    /// Receive up to `buf.len()` bytes, waiting at most `ticks`. Bytes
    /// accumulated before a timeout are delivered in the wake result.
    pub fn pipe_get_timeout(
        &mut self,
        pipe: PipeId,
        buf: &mut [u8],
        option: PipeOption,
        ticks: Ticks,
    ) -> Result<Outcome<usize>, PipeGetError> {
        if ticks == 0 {
            return Err(PipeGetError::BadParam);
        }
        self.pipe_get_inner(pipe, buf, option, Some(ticks))
    }

    /// Receive without waiting.
    pub fn pipe_try_get(
        &mut self,
        pipe: PipeId,
        buf: &mut [u8],
        option: PipeOption,
    ) -> Result<usize, TryPipeGetError> {
        let task = self.expect_waitable_context()?;
        self.pipe_cb(pipe)?;
        if buf.len() > PIPE_REQUEST_LEN {
            return Err(TryPipeGetError::BadParam);
        }
        let priority = self.tasks[task.index()].effective_priority;
        let mut request =
            PipeRequest::new_reader(RequestShape::Sync(task), priority, buf.len(), option);
        self.pump_reader(pipe, &mut request);
        self.check_preemption();
        buf[..request.xferred].copy_from_slice(&request.data);
        if request.is_satisfied() {
            Ok(request.xferred)
        } else if request.xferred == 0 {
            Err(TryPipeGetError::WouldBlock)
        } else {
            Err(TryPipeGetError::Incomplete {
                bytes_read: request.xferred,
            })
        }
    }

    fn pipe_get_inner(
        &mut self,
        pipe: PipeId,
        buf: &mut [u8],
        option: PipeOption,
        timeout: Option<Ticks>,
    ) -> Result<Outcome<usize>, PipeGetError> {
        let task = self.expect_waitable_context()?;
        self.pipe_cb(pipe)?;
        if buf.len() > PIPE_REQUEST_LEN {
            return Err(PipeGetError::BadParam);
        }
        if self.pipes[pipe.index()].readers.is_full() {
            return Err(PipeGetError::QueueOverflow);
        }
        let priority = self.tasks[task.index()].effective_priority;
        let mut request =
            PipeRequest::new_reader(RequestShape::Sync(task), priority, buf.len(), option);
        self.pump_reader(pipe, &mut request);
        if request.is_satisfied() {
            buf[..request.xferred].copy_from_slice(&request.data);
            self.check_preemption();
            return Ok(Outcome::Complete(request.xferred));
        }
        insert_request(&mut self.pipes[pipe.index()].readers, request);
        self.begin_wait(task, WaitPayload::PipeReader(pipe), timeout);
        Ok(Outcome::Pending)
    }

    /// Send the first `len` bytes of a pool block without ever blocking the
    /// caller. The block is returned to the pool when the request ends, and
    /// `signal`, if given, receives one permit at that moment. Callable
    /// from interrupt context.
    pub fn pipe_put_async(
        &mut self,
        pipe: PipeId,
        block: PoolBlockId,
        len: usize,
        option: PipeOption,
        signal: Option<SemaphoreId>,
    ) -> Result<(), PipePutAsyncError> {
        self.pipe_cb(pipe)?;
        if let Some(semaphore) = signal {
            self.semaphore_cb(semaphore)?;
        }
        if len > POOL_BLOCK_LEN {
            return Err(PipePutAsyncError::BadParam);
        }
        if self.pipes[pipe.index()].writers.is_full() {
            return Err(PipePutAsyncError::QueueOverflow);
        }
        let priority = match self.running_task {
            Some(task) => self.tasks[task.index()].effective_priority,
            None => PRIORITY_MAX,
        };
        let payload = self.pool.block(block)?;
        let mut request = PipeRequest::new_writer(
            RequestShape::Async { block, signal },
            priority,
            &payload[..len],
            option,
        );
        self.pump_writer(pipe, &mut request);
        if request.is_satisfied() {
            self.finish_request(request, true);
        } else {
            insert_request(&mut self.pipes[pipe.index()].writers, request);
        }
        self.check_preemption();
        Ok(())
    }

    /// Discard all buffered data and every pended writer's remaining bytes.
    /// The writers complete as fully transferred.
    pub fn pipe_flush(&mut self, pipe: PipeId) -> Result<(), FlushPipeError> {
        self.pipe_cb(pipe)?;
        {
            let PipeCb { ring, writers, .. } = &mut self.pipes[pipe.index()];
            ring.clear();
            for writer in writers.iter_mut() {
                // Discarded bytes count as accepted
                writer.xferred += writer.data.len();
                writer.data.clear();
            }
        }
        self.finish_completed_requests(pipe);
        self.check_preemption();
        Ok(())
    }

    /// Serve a freshly-submitted write request: pended readers first (most
    /// urgent first), then the ring buffer.
    ///
    /// At rest a pended writer implies a full ring and no pended reader, so
    /// a new writer arriving behind pended ones correctly moves nothing.
    fn pump_writer(&mut self, pipe: PipeId, request: &mut PipeRequest) {
        {
            let PipeCb { ring, readers, .. } = &mut self.pipes[pipe.index()];
            for reader in readers.iter_mut() {
                fill_reader(reader, Either::Right(&mut *request));
            }
            drain_writer_into_ring(request, ring);
        }
        self.finish_completed_requests(pipe);
    }

    /// Serve a freshly-submitted read request: the ring buffer first (byte
    /// order), then pended writers, whose residuals then spill into the
    /// freed buffer space.
    fn pump_reader(&mut self, pipe: PipeId, request: &mut PipeRequest) {
        {
            let PipeCb { ring, writers, .. } = &mut self.pipes[pipe.index()];
            fill_reader(request, Either::Left(&mut *ring));
            for writer in writers.iter_mut() {
                fill_reader(request, Either::Right(&mut *writer));
            }
            for writer in writers.iter_mut() {
                drain_writer_into_ring(writer, ring);
            }
        }
        self.finish_completed_requests(pipe);
    }

    /// Pop every request whose completion condition holds and deliver its
    /// result.
    fn finish_completed_requests(&mut self, pipe: PipeId) {
        let mut done: ArrayVec<(PipeRequest, bool), DONE_CAP> = ArrayVec::new();
        {
            let PipeCb {
                writers, readers, ..
            } = &mut self.pipes[pipe.index()];
            extract_satisfied(writers, true, &mut done);
            extract_satisfied(readers, false, &mut done);
        }
        for (request, is_writer) in done {
            self.finish_request(request, is_writer);
        }
    }

    fn finish_request(&mut self, request: PipeRequest, is_writer: bool) {
        let result = request.reply();
        log::trace!(
            "pipe request done: {:?} xferred {}/{} -> {:?}",
            request.shape,
            request.xferred,
            request.size,
            result
        );
        match request.shape {
            RequestShape::Sync(task) => {
                let wake = if is_writer {
                    Wake::PipeSend {
                        bytes: request.xferred,
                        result,
                    }
                } else {
                    Wake::PipeReceive {
                        data: request.data,
                        result,
                    }
                };
                // A canceled request's task is being terminated, not woken
                if request.status != XferStatus::Canceled {
                    self.complete_wait(task, wake);
                }
            }
            RequestShape::Async { block, signal } => {
                let freed = self.pool.free(block);
                debug_assert!(freed.is_ok());
                if let Some(semaphore) = signal {
                    self.semaphore_signal_core(semaphore, 1);
                }
            }
        }
    }

    /// Called by the timeout manager for a task pended on this pipe.
    pub(crate) fn pipe_wait_timed_out(&mut self, pipe: PipeId, task: TaskId, is_writer: bool) {
        let queue = if is_writer {
            &mut self.pipes[pipe.index()].writers
        } else {
            &mut self.pipes[pipe.index()].readers
        };
        let pos = queue
            .iter()
            .position(|r| r.shape == RequestShape::Sync(task));
        let pos = match pos {
            Some(pos) => pos,
            None => {
                debug_assert!(false, "{task:?} pended on {pipe:?} without a request");
                return;
            }
        };
        let mut request = queue.remove(pos);
        request.status = XferStatus::TimedOut;
        self.finish_request(request, is_writer);
    }

    /// Withdraw a terminating task's pended request.
    pub(crate) fn pipe_cancel_request(&mut self, pipe: PipeId, task: TaskId, is_writer: bool) {
        let queue = if is_writer {
            &mut self.pipes[pipe.index()].writers
        } else {
            &mut self.pipes[pipe.index()].readers
        };
        if let Some(pos) = queue
            .iter()
            .position(|r| r.shape == RequestShape::Sync(task))
        {
            let mut request = queue.remove(pos);
            request.status = XferStatus::Canceled;
            self.finish_request(request, is_writer);
        }
    }

    /// Re-place a pended request after its task's effective priority
    /// changed.
    pub(crate) fn reorder_pipe_request(
        &mut self,
        pipe: PipeId,
        task: TaskId,
        is_writer: bool,
        new_priority: Priority,
    ) {
        let queue = if is_writer {
            &mut self.pipes[pipe.index()].writers
        } else {
            &mut self.pipes[pipe.index()].readers
        };
        if let Some(pos) = queue
            .iter()
            .position(|r| r.shape == RequestShape::Sync(task))
        {
            let mut request = queue.remove(pos);
            request.priority = new_priority;
            insert_request(queue, request);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_wraps_around() {
        let mut ring = RingBuffer::new(4);
        assert_eq!(ring.push_slice(&[1, 2, 3]), 3);
        assert_eq!(ring.contiguous(), &[1, 2, 3]);
        ring.consume(2);
        assert_eq!(ring.push_slice(&[4, 5, 6]), 3);
        assert_eq!(ring.space(), 0);
        // head is at 2; the readable run stops at the physical end
        assert_eq!(ring.contiguous(), &[3, 4]);
        ring.consume(2);
        assert_eq!(ring.contiguous(), &[5, 6]);
    }

    #[test]
    fn push_slice_respects_space() {
        let mut ring = RingBuffer::new(2);
        assert_eq!(ring.push_slice(&[9, 8, 7]), 2);
        assert_eq!(ring.level(), 2);
        assert_eq!(ring.push_slice(&[6]), 0);
    }

    #[test]
    fn fill_reader_from_writer_moves_both_cursors() {
        let mut writer = PipeRequest::new_writer(
            RequestShape::Sync(TaskId::from_index(0)),
            0,
            &[1, 2, 3, 4],
            PipeOption::AllOrNothing,
        );
        let mut reader = PipeRequest::new_reader(
            RequestShape::Sync(TaskId::from_index(1)),
            0,
            3,
            PipeOption::AllOrNothing,
        );
        assert_eq!(fill_reader(&mut reader, Either::Right(&mut writer)), 3);
        assert_eq!(reader.data[..], [1, 2, 3]);
        assert_eq!(reader.remaining(), 0);
        assert_eq!(writer.xferred, 3);
        assert_eq!(writer.data[..], [4]);
    }

    #[test]
    fn reply_follows_the_option() {
        let mut request = PipeRequest::new_reader(
            RequestShape::Sync(TaskId::from_index(0)),
            0,
            4,
            PipeOption::AtLeastOne,
        );
        request.status = XferStatus::TimedOut;
        assert_eq!(request.reply(), Err(PipeXferError::Timeout));
        request.xferred = 1;
        assert_eq!(request.reply(), Ok(()));
        request.option = PipeOption::AllOrNothing;
        assert_eq!(request.reply(), Err(PipeXferError::Timeout));
        request.status = XferStatus::Busy;
        assert_eq!(request.reply(), Err(PipeXferError::Incomplete));
        request.option = PipeOption::BestEffort;
        request.xferred = 0;
        assert_eq!(request.reply(), Ok(()));
    }
}
