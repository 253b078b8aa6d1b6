//! Boundary to the external composite framework and endpoint hardware
//!
//! The framework owns endpoint existence, interface and string id
//! assignment, and speed negotiation. The function core reaches it only
//! through [`GadgetOps`]; tests substitute a mock.

use crate::descriptor::{Direction, EndpointAssignment, EndpointDescriptor, Speed, SpeedCaps};
use crate::error::Result;

/// Opaque reference to a framework-owned endpoint
///
/// Valid only between a successful claim and the unbind that follows; the
/// framework may invalidate it at unbind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EndpointHandle(u8);

impl EndpointHandle {
    /// Wrap a raw framework endpoint id
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    /// Raw framework endpoint id
    pub const fn raw(self) -> u8 {
        self.0
    }
}

/// Result of a successful endpoint claim
#[derive(Debug, Clone, Copy)]
pub struct ClaimedEndpoint {
    /// Framework endpoint reference
    pub handle: EndpointHandle,
    /// Address and full-speed packet size picked by auto-configuration
    pub assignment: EndpointAssignment,
}

/// USB control request, as delivered by the framework's setup dispatch
#[repr(C)]
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SetupPacket {
    /// bmRequestType
    pub request_type: u8,
    /// bRequest
    pub request: u8,
    /// wValue
    pub value: u16,
    /// wIndex
    pub index: u16,
    /// wLength
    pub length: u16,
}

/// Operations the function core requires from the composite framework
///
/// All methods are invoked from bind/configure paths (process context); the
/// framework serializes them per function instance.
pub trait GadgetOps {
    /// Assign an interface number for this function
    fn request_interface_number(&mut self) -> Result<u8>;

    /// Assign a string descriptor id for this function
    fn request_string_id(&mut self) -> Result<u8>;

    /// Speeds the underlying controller supports
    fn speed_caps(&self) -> SpeedCaps;

    /// Speed negotiated on the bus right now
    fn current_speed(&self) -> Speed;

    /// Claim an endpoint via auto-configuration
    ///
    /// Returns `None` when no matching endpoint remains; the claim sticks
    /// until unbind.
    fn claim_endpoint(&mut self, direction: Direction, caps: SpeedCaps) -> Option<ClaimedEndpoint>;

    /// Enable an endpoint with the given speed-specific descriptor
    fn enable_endpoint(
        &mut self,
        endpoint: EndpointHandle,
        descriptor: &EndpointDescriptor,
    ) -> Result<()>;

    /// Disable an endpoint; disabling an already-disabled endpoint is a no-op
    fn disable_endpoint(&mut self, endpoint: EndpointHandle);
}
