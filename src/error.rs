//! USB gadget function error types

use core::fmt;

/// Gadget function operation result type
pub type Result<T> = core::result::Result<T, UsbError>;

/// Gadget function error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsbError {
    /// Endpoint auto-configuration exhausted, no endpoint could be claimed
    NoEndpointAvailable,
    /// Transfer buffer pool exhausted
    AllocationFailed,
    /// Endpoint could not be enabled for the selected speed
    EndpointEnableFailed,
    /// Instance name exceeds the maximum length
    NameTooLong,
    /// Operation not valid in the current lifecycle state
    InvalidState,
    /// Invalid parameter
    InvalidParameter,
    /// Requested transfer size exceeds the fixed buffer size
    BufferOverflow,
    /// Idle queue is full
    QueueFull,
    /// Unsupported control request
    Unsupported,
}

impl fmt::Display for UsbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoEndpointAvailable => write!(f, "No endpoint available"),
            Self::AllocationFailed => write!(f, "Buffer allocation failed"),
            Self::EndpointEnableFailed => write!(f, "Endpoint enable failed"),
            Self::NameTooLong => write!(f, "Instance name too long"),
            Self::InvalidState => write!(f, "Invalid state"),
            Self::InvalidParameter => write!(f, "Invalid parameter"),
            Self::BufferOverflow => write!(f, "Buffer overflow"),
            Self::QueueFull => write!(f, "Idle queue full"),
            Self::Unsupported => write!(f, "Unsupported request"),
        }
    }
}
