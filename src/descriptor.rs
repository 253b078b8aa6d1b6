//! USB descriptor wire formats and the speed-parameterized function template
//!
//! The interface carries one bulk-OUT and one bulk-IN endpoint. Endpoint
//! addresses are assigned by the framework's auto-configuration at bind time
//! and are identical at both speeds; only the wire-format packet size differs
//! (fixed 512 bytes at high speed, auto-assigned at full speed). Both
//! per-speed tables are generated from a single [`FunctionTemplate`], so the
//! tables cannot disagree on endpoint addresses.

use bitflags::bitflags;

/// Interface descriptor type (bDescriptorType)
pub const USB_DT_INTERFACE: u8 = 0x04;
/// Endpoint descriptor type (bDescriptorType)
pub const USB_DT_ENDPOINT: u8 = 0x05;
/// Interface descriptor length in bytes
pub const USB_DT_INTERFACE_SIZE: u8 = 9;
/// Endpoint descriptor length in bytes
pub const USB_DT_ENDPOINT_SIZE: u8 = 7;
/// Direction bit in bEndpointAddress (device-to-host)
pub const USB_DIR_IN: u8 = 0x80;
/// Direction bit in bEndpointAddress (host-to-device)
pub const USB_DIR_OUT: u8 = 0x00;
/// Vendor-specific interface class
pub const USB_CLASS_VENDOR_SPEC: u8 = 0xFF;
/// Bulk transfer type in bmAttributes
pub const USB_ENDPOINT_XFER_BULK: u8 = 0x02;

/// Fixed interface subclass for this function
pub const INTERFACE_SUBCLASS: u8 = 254;
/// Fixed interface protocol version
pub const INTERFACE_PROTOCOL: u8 = 2;
/// Bulk endpoint max packet size at high speed (bytes)
pub const HS_BULK_MAX_PACKET: u16 = 512;
/// String descriptor language id (en-US)
pub const STRING_LANGUAGE_EN_US: u16 = 0x0409;
/// Fixed product string reported in the interface string descriptor
pub const PRODUCT_STRING: &str = "Apple USB Multiplexor";
/// Index of the interface string in the string table
pub const INTERFACE_STRING_INDEX: usize = 0;

/// Transfer direction, seen from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Device-to-host
    In,
    /// Host-to-device
    Out,
}

impl Direction {
    /// Direction bit for bEndpointAddress
    pub const fn address_bit(self) -> u8 {
        match self {
            Direction::In => USB_DIR_IN,
            Direction::Out => USB_DIR_OUT,
        }
    }
}

/// Negotiated bus speed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Speed {
    /// USB 1.1 full speed (12 Mbit/s)
    Full,
    /// USB 2.0 high speed (480 Mbit/s)
    High,
}

bitflags! {
    /// Speeds an endpoint claim must support
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SpeedCaps: u8 {
        /// Full-speed operation
        const FULL_SPEED = 1 << 0;
        /// High-speed operation
        const HIGH_SPEED = 1 << 1;
    }
}

/// USB interface descriptor (9 bytes on the wire)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy)]
pub struct InterfaceDescriptor {
    /// Descriptor length
    pub b_length: u8,
    /// Descriptor type (USB_DT_INTERFACE)
    pub b_descriptor_type: u8,
    /// Interface number assigned by the framework
    pub b_interface_number: u8,
    /// Alternate setting
    pub b_alternate_setting: u8,
    /// Number of endpoints
    pub b_num_endpoints: u8,
    /// Interface class
    pub b_interface_class: u8,
    /// Interface subclass
    pub b_interface_sub_class: u8,
    /// Interface protocol
    pub b_interface_protocol: u8,
    /// Interface string descriptor id
    pub i_interface: u8,
}

impl InterfaceDescriptor {
    /// Serialize to wire format
    pub fn as_bytes(&self) -> [u8; 9] {
        [
            self.b_length,
            self.b_descriptor_type,
            self.b_interface_number,
            self.b_alternate_setting,
            self.b_num_endpoints,
            self.b_interface_class,
            self.b_interface_sub_class,
            self.b_interface_protocol,
            self.i_interface,
        ]
    }
}

/// USB endpoint descriptor (7 bytes on the wire)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy)]
pub struct EndpointDescriptor {
    /// Descriptor length
    pub b_length: u8,
    /// Descriptor type (USB_DT_ENDPOINT)
    pub b_descriptor_type: u8,
    /// Endpoint address: number plus direction bit
    pub b_endpoint_address: u8,
    /// Transfer type attributes
    pub bm_attributes: u8,
    /// Max packet size, little-endian on the wire
    pub w_max_packet_size: u16,
    /// Polling interval (unused for bulk)
    pub b_interval: u8,
}

impl EndpointDescriptor {
    /// Serialize to wire format
    pub fn as_bytes(&self) -> [u8; 7] {
        let mps = self.w_max_packet_size;
        let mps = mps.to_le_bytes();
        [
            self.b_length,
            self.b_descriptor_type,
            self.b_endpoint_address,
            self.bm_attributes,
            mps[0],
            mps[1],
            self.b_interval,
        ]
    }

    /// Direction encoded in the endpoint address
    pub fn direction(&self) -> Direction {
        if self.b_endpoint_address & USB_DIR_IN != 0 {
            Direction::In
        } else {
            Direction::Out
        }
    }

    /// Max packet size as a host-order value
    pub fn max_packet_size(&self) -> u16 {
        self.w_max_packet_size
    }
}

/// Endpoint parameters produced by the framework's auto-configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointAssignment {
    /// Concrete endpoint address (number plus direction bit)
    pub address: u8,
    /// Max packet size assigned for full-speed operation
    pub fs_max_packet_size: u16,
}

/// Per-speed descriptor table: interface first, then the bulk endpoints
///
/// Serialization order matches the original table layout (interface, OUT
/// endpoint, IN endpoint). The table is generated, never hand-edited.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorTable {
    /// Interface descriptor
    pub interface: InterfaceDescriptor,
    /// Bulk-OUT endpoint descriptor
    pub endpoint_out: EndpointDescriptor,
    /// Bulk-IN endpoint descriptor
    pub endpoint_in: EndpointDescriptor,
}

impl DescriptorTable {
    /// Serialize the whole table to wire format
    pub fn as_bytes(&self) -> [u8; 23] {
        let mut out = [0u8; 23];
        out[..9].copy_from_slice(&self.interface.as_bytes());
        out[9..16].copy_from_slice(&self.endpoint_out.as_bytes());
        out[16..23].copy_from_slice(&self.endpoint_in.as_bytes());
        out
    }

    /// Endpoint descriptor for the given direction
    pub fn endpoint(&self, direction: Direction) -> &EndpointDescriptor {
        match direction {
            Direction::In => &self.endpoint_in,
            Direction::Out => &self.endpoint_out,
        }
    }
}

/// One entry of the gadget string table
#[derive(Debug, Clone, Copy)]
pub struct GadgetString {
    /// String descriptor id, assigned by the framework at bind
    pub id: u8,
    /// String text
    pub text: &'static str,
}

/// Gadget string table for one language
#[derive(Debug, Clone, Copy)]
pub struct StringTable {
    /// Language id
    pub language: u16,
    /// String entries
    pub strings: [GadgetString; 1],
}

/// Single source of truth for the function's descriptors
///
/// Built once at instance allocation with the fixed class constants; the
/// interface number and string id are filled in at bind, and the per-speed
/// tables are generated from the endpoint assignment.
#[derive(Debug, Clone, Copy)]
pub struct FunctionTemplate {
    interface: InterfaceDescriptor,
    strings: StringTable,
}

impl FunctionTemplate {
    /// Build the template with the fixed field values
    pub const fn new() -> Self {
        Self {
            interface: InterfaceDescriptor {
                b_length: USB_DT_INTERFACE_SIZE,
                b_descriptor_type: USB_DT_INTERFACE,
                b_interface_number: 0,
                b_alternate_setting: 0,
                b_num_endpoints: 2,
                b_interface_class: USB_CLASS_VENDOR_SPEC,
                b_interface_sub_class: INTERFACE_SUBCLASS,
                b_interface_protocol: INTERFACE_PROTOCOL,
                i_interface: 0,
            },
            strings: StringTable {
                language: STRING_LANGUAGE_EN_US,
                strings: [GadgetString {
                    id: 0,
                    text: PRODUCT_STRING,
                }],
            },
        }
    }

    /// Interface descriptor as currently templated
    pub fn interface(&self) -> &InterfaceDescriptor {
        &self.interface
    }

    /// String table for enumeration
    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    /// String id assigned by the framework, if any
    pub fn string_id(&self) -> Option<u8> {
        let id = self.strings.strings[INTERFACE_STRING_INDEX].id;
        (id != 0).then_some(id)
    }

    /// Record the framework-assigned interface number
    pub fn set_interface_number(&mut self, number: u8) {
        self.interface.b_interface_number = number;
    }

    /// Record the framework-assigned string descriptor id
    pub fn assign_string_id(&mut self, id: u8) {
        self.strings.strings[INTERFACE_STRING_INDEX].id = id;
        self.interface.i_interface = id;
    }

    /// Generate the descriptor table for one speed from the endpoint
    /// assignment
    pub fn table_for(
        &self,
        speed: Speed,
        out: EndpointAssignment,
        inbound: EndpointAssignment,
    ) -> DescriptorTable {
        DescriptorTable {
            interface: self.interface,
            endpoint_out: Self::bulk_endpoint(speed, out),
            endpoint_in: Self::bulk_endpoint(speed, inbound),
        }
    }

    fn bulk_endpoint(speed: Speed, assignment: EndpointAssignment) -> EndpointDescriptor {
        EndpointDescriptor {
            b_length: USB_DT_ENDPOINT_SIZE,
            b_descriptor_type: USB_DT_ENDPOINT,
            b_endpoint_address: assignment.address,
            bm_attributes: USB_ENDPOINT_XFER_BULK,
            w_max_packet_size: match speed {
                Speed::High => HS_BULK_MAX_PACKET,
                Speed::Full => assignment.fs_max_packet_size,
            },
            b_interval: 0,
        }
    }
}

impl Default for FunctionTemplate {
    fn default() -> Self {
        Self::new()
    }
}
