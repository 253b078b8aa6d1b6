//! Fixed-size transfer buffer pool
//!
//! Backing memory for bulk transfers lives in a const-generic pool; the
//! function core holds [`TransferBuffer`] handles and moves them between the
//! idle queue and the inbound slots. Slot claims are atomic, so `allocate`
//! and `release` take `&self` and never touch buffer contents.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Result, UsbError};
use crate::gadget::EndpointHandle;

/// Size of every bulk transfer buffer in bytes
pub const BULK_BUFFER_SIZE: usize = 16384;

/// Handle to one pool slot, bound to the endpoint it was allocated for
///
/// The handle is linear: it lives in exactly one queue at a time and
/// releasing it consumes it, so a buffer cannot be freed twice.
#[derive(Debug)]
pub struct TransferBuffer {
    slot: u16,
    endpoint: EndpointHandle,
    capacity: usize,
}

impl TransferBuffer {
    /// Endpoint this buffer was allocated for
    pub fn endpoint(&self) -> EndpointHandle {
        self.endpoint
    }

    /// Usable capacity in bytes
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Pool of `N` fixed-size transfer buffers
pub struct BufferPool<const N: usize> {
    claimed: [AtomicBool; N],
    storage: [[u8; BULK_BUFFER_SIZE]; N],
}

impl<const N: usize> BufferPool<N> {
    /// Create an empty pool (const-compatible, usable in statics)
    pub const fn new() -> Self {
        const UNCLAIMED: AtomicBool = AtomicBool::new(false);
        Self {
            claimed: [UNCLAIMED; N],
            storage: [[0; BULK_BUFFER_SIZE]; N],
        }
    }

    /// Allocate a buffer for `endpoint`
    ///
    /// Fails with `BufferOverflow` when `size` exceeds the fixed buffer size
    /// and `AllocationFailed` on exhaustion. Failure leaves no partial state.
    pub fn allocate(&self, endpoint: EndpointHandle, size: usize) -> Result<TransferBuffer> {
        if size > BULK_BUFFER_SIZE {
            return Err(UsbError::BufferOverflow);
        }

        for (slot, claimed) in self.claimed.iter().enumerate() {
            if !claimed.swap(true, Ordering::Acquire) {
                return Ok(TransferBuffer {
                    slot: slot as u16,
                    endpoint,
                    capacity: size,
                });
            }
        }

        #[cfg(feature = "defmt")]
        defmt::error!("transfer buffer pool exhausted (capacity {})", N);
        Err(UsbError::AllocationFailed)
    }

    /// Return a buffer to the pool
    ///
    /// Handles are scoped to the pool that allocated them; one from another
    /// pool is ignored.
    pub fn release(&self, buffer: TransferBuffer) {
        let slot = buffer.slot as usize;
        if slot < N {
            self.claimed[slot].store(false, Ordering::Release);
        }
    }

    /// Buffer contents; empty for a handle from another pool
    pub fn bytes(&self, buffer: &TransferBuffer) -> &[u8] {
        match self.storage.get(buffer.slot as usize) {
            Some(region) => &region[..buffer.capacity],
            None => &[],
        }
    }

    /// Mutable buffer contents; empty for a handle from another pool
    pub fn bytes_mut(&mut self, buffer: &TransferBuffer) -> &mut [u8] {
        match self.storage.get_mut(buffer.slot as usize) {
            Some(region) => &mut region[..buffer.capacity],
            None => Default::default(),
        }
    }

    /// Number of slots currently claimed
    pub fn in_use(&self) -> usize {
        self.claimed
            .iter()
            .filter(|claimed| claimed.load(Ordering::Relaxed))
            .count()
    }

    /// Total number of slots
    pub const fn capacity(&self) -> usize {
        N
    }
}
