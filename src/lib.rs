#![no_std]
#![warn(missing_docs)]

//! Peripheral-side USB bulk function core
//!
//! Implements the control and data-path logic of a "gadget" function with
//! one vendor-specific interface carrying a bulk-IN/bulk-OUT endpoint pair:
//! per-speed descriptor negotiation, reusable transfer buffer pools, and the
//! bind / configure / disable / unbind lifecycle an external composite
//! framework drives in response to bus events.
//!
//! # Core components
//!
//! - [`descriptor`] - wire-format descriptors and the speed-parameterized
//!   function template
//! - [`buffer`] - fixed-size transfer buffer pool
//! - [`queue`] - idle-buffer FIFO and inbound slots, interrupt-context safe
//! - [`function`] - the lifecycle state machine ([`Device`])
//! - [`instance`] - named instances and their registry
//! - [`gadget`] - the [`GadgetOps`](gadget::GadgetOps) boundary to the
//!   external framework
//! - [`channel`] - the `usbmode` command channel glue
//! - [`error`] - error taxonomy
//!
//! The crate has no internal threads and never blocks: lifecycle entry
//! points are serialized by the framework, and completion callbacks only
//! take the short spin-locked queue critical section, so they are safe from
//! interrupt context.

pub mod buffer;
pub mod channel;
pub mod descriptor;
pub mod error;
pub mod function;
pub mod gadget;
pub mod instance;
pub mod queue;

pub use buffer::{BufferPool, TransferBuffer, BULK_BUFFER_SIZE};
pub use descriptor::{Direction, Speed, SpeedCaps};
pub use error::{Result, UsbError};
pub use function::{Device, FunctionState};
pub use gadget::{ClaimedEndpoint, EndpointHandle, GadgetOps, SetupPacket};
pub use instance::{FunctionInstance, FunctionRegistry, MAX_INST_NAME_LEN};
pub use queue::{TransferQueue, RX_CONCURRENCY, TX_QUEUE_DEPTH};
