//! Idle-buffer FIFO and inbound slots shared across execution contexts
//!
//! The outbound completion callback runs in interrupt context while the
//! submission layer pops from process context, so the queues sit behind a
//! spin lock held only for the push or pop itself. Buffer contents are never
//! touched under the lock.

use heapless::{Deque, Vec};
use spin::Mutex;

use crate::buffer::TransferBuffer;

/// Number of outbound buffers cycled through the idle queue
pub const TX_QUEUE_DEPTH: usize = 4;
/// Number of concurrently posted inbound buffers
pub const RX_CONCURRENCY: usize = 2;

/// Per-device transfer buffer queues
pub struct TransferQueue {
    idle: Mutex<Deque<TransferBuffer, TX_QUEUE_DEPTH>>,
    inbound: Mutex<Vec<TransferBuffer, RX_CONCURRENCY>>,
}

impl TransferQueue {
    /// Create empty queues (const-compatible)
    pub const fn new() -> Self {
        Self {
            idle: Mutex::new(Deque::new()),
            inbound: Mutex::new(Vec::new()),
        }
    }

    /// Append a buffer to the tail of the idle queue
    ///
    /// Returns the buffer when the queue is full so the caller can return it
    /// to the pool; a full queue means the buffer did not come from this
    /// device's allocation.
    pub fn push_idle(
        &self,
        buffer: TransferBuffer,
    ) -> core::result::Result<(), TransferBuffer> {
        self.idle.lock().push_back(buffer)
    }

    /// Remove a buffer from the head of the idle queue, without blocking
    pub fn pop_idle(&self) -> Option<TransferBuffer> {
        self.idle.lock().pop_front()
    }

    /// Number of buffers currently idle
    pub fn idle_len(&self) -> usize {
        self.idle.lock().len()
    }

    /// Store an inbound buffer in a fixed slot
    ///
    /// Returns the buffer when all slots are occupied.
    pub fn store_inbound(
        &self,
        buffer: TransferBuffer,
    ) -> core::result::Result<(), TransferBuffer> {
        self.inbound.lock().push(buffer)
    }

    /// Take one inbound buffer out of its slot
    pub fn take_inbound(&self) -> Option<TransferBuffer> {
        self.inbound.lock().pop()
    }

    /// Number of occupied inbound slots
    pub fn inbound_len(&self) -> usize {
        self.inbound.lock().len()
    }

    /// True when neither queue holds a buffer
    pub fn is_empty(&self) -> bool {
        self.idle_len() == 0 && self.inbound_len() == 0
    }
}

impl Default for TransferQueue {
    fn default() -> Self {
        Self::new()
    }
}
