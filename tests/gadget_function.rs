//! Full-lifecycle tests for the bulk function core against a mock composite
//! framework
//!
//! The mock stands in for endpoint auto-configuration, endpoint
//! enable/disable, and speed negotiation; the tests drive the same call
//! sequences the real framework issues around bus events.

use usbg_mux::buffer::{BufferPool, BULK_BUFFER_SIZE};
use usbg_mux::descriptor::{EndpointAssignment, HS_BULK_MAX_PACKET};
use usbg_mux::function::{Device, FunctionState};
use usbg_mux::gadget::{ClaimedEndpoint, EndpointHandle, GadgetOps, SetupPacket};
use usbg_mux::queue::{RX_CONCURRENCY, TX_QUEUE_DEPTH};
use usbg_mux::{Direction, Speed, SpeedCaps, UsbError};

const FS_MAX_PACKET: u16 = 64;
const POOL_CAPACITY: usize = TX_QUEUE_DEPTH + RX_CONCURRENCY;

/// Mock composite framework and endpoint hardware
struct MockGadget {
    speed: Speed,
    caps: SpeedCaps,
    next_interface: u8,
    next_string_id: u8,
    next_endpoint: u8,
    claims_remaining: usize,
    fail_enable_out: bool,
    enabled: Vec<(EndpointHandle, Direction, u16)>,
}

impl MockGadget {
    fn new(speed: Speed) -> Self {
        Self {
            speed,
            caps: SpeedCaps::FULL_SPEED | SpeedCaps::HIGH_SPEED,
            next_interface: 0,
            next_string_id: 1,
            next_endpoint: 1,
            claims_remaining: usize::MAX,
            fail_enable_out: false,
            enabled: Vec::new(),
        }
    }

    fn enabled_count(&self) -> usize {
        self.enabled.len()
    }

    fn enabled_packet_sizes(&self) -> Vec<u16> {
        self.enabled.iter().map(|(_, _, mps)| *mps).collect()
    }

    fn enabled_directions(&self) -> Vec<Direction> {
        self.enabled.iter().map(|(_, dir, _)| *dir).collect()
    }
}

impl GadgetOps for MockGadget {
    fn request_interface_number(&mut self) -> usbg_mux::Result<u8> {
        let id = self.next_interface;
        self.next_interface += 1;
        Ok(id)
    }

    fn request_string_id(&mut self) -> usbg_mux::Result<u8> {
        let id = self.next_string_id;
        self.next_string_id += 1;
        Ok(id)
    }

    fn speed_caps(&self) -> SpeedCaps {
        self.caps
    }

    fn current_speed(&self) -> Speed {
        self.speed
    }

    fn claim_endpoint(&mut self, direction: Direction, _caps: SpeedCaps) -> Option<ClaimedEndpoint> {
        if self.claims_remaining == 0 {
            return None;
        }
        self.claims_remaining -= 1;

        let number = self.next_endpoint;
        self.next_endpoint += 1;
        Some(ClaimedEndpoint {
            handle: EndpointHandle::new(number),
            assignment: EndpointAssignment {
                address: number | direction.address_bit(),
                fs_max_packet_size: FS_MAX_PACKET,
            },
        })
    }

    fn enable_endpoint(
        &mut self,
        endpoint: EndpointHandle,
        descriptor: &usbg_mux::descriptor::EndpointDescriptor,
    ) -> usbg_mux::Result<()> {
        if self.fail_enable_out && descriptor.direction() == Direction::Out {
            return Err(UsbError::EndpointEnableFailed);
        }
        self.enabled
            .push((endpoint, descriptor.direction(), descriptor.max_packet_size()));
        Ok(())
    }

    fn disable_endpoint(&mut self, endpoint: EndpointHandle) {
        self.enabled.retain(|(handle, _, _)| *handle != endpoint);
    }
}

#[test]
fn test_bind_fills_queues() {
    let mut gadget = MockGadget::new(Speed::High);
    let pool: BufferPool<POOL_CAPACITY> = BufferPool::new();
    let mut device = Device::new();

    device.bind(&mut gadget, &pool).unwrap();

    assert_eq!(device.state(), FunctionState::Bound);
    assert_eq!(device.queue().idle_len(), TX_QUEUE_DEPTH);
    assert_eq!(device.queue().inbound_len(), RX_CONCURRENCY);
    assert_eq!(pool.in_use(), POOL_CAPACITY);

    // every idle buffer carries the full bulk buffer size
    let buffer = device.pop_idle().unwrap();
    assert_eq!(buffer.capacity(), BULK_BUFFER_SIZE);
    device.complete_in(buffer, Ok(0));
    assert_eq!(device.queue().idle_len(), TX_QUEUE_DEPTH);
}

#[test]
fn test_bind_then_unbind_releases_everything() {
    let mut gadget = MockGadget::new(Speed::High);
    let pool: BufferPool<POOL_CAPACITY> = BufferPool::new();
    let mut device = Device::new();

    device.bind(&mut gadget, &pool).unwrap();

    // cycle buffers through the completion path before teardown
    let first = device.pop_idle().unwrap();
    let second = device.pop_idle().unwrap();
    device.complete_in(second, Err(UsbError::Unsupported));
    device.complete_in(first, Ok(512));
    device.complete_out(Ok(128));

    device.unbind(&pool);
    assert_eq!(device.state(), FunctionState::Unbound);
    assert!(device.queue().is_empty());
    assert_eq!(pool.in_use(), 0);
    assert!(device.descriptor_table(Speed::Full).is_none());

    // unbind is idempotent
    device.unbind(&pool);
    assert_eq!(pool.in_use(), 0);
}

#[test]
fn test_rebind_after_unbind() {
    let mut gadget = MockGadget::new(Speed::High);
    let pool: BufferPool<POOL_CAPACITY> = BufferPool::new();
    let mut device = Device::new();

    device.bind(&mut gadget, &pool).unwrap();
    device.unbind(&pool);
    device.bind(&mut gadget, &pool).unwrap();
    assert_eq!(pool.in_use(), POOL_CAPACITY);
    assert_eq!(device.queue().idle_len(), TX_QUEUE_DEPTH);
}

#[test]
fn test_double_bind_rejected() {
    let mut gadget = MockGadget::new(Speed::High);
    let pool: BufferPool<POOL_CAPACITY> = BufferPool::new();
    let mut device = Device::new();

    device.bind(&mut gadget, &pool).unwrap();
    assert_eq!(
        device.bind(&mut gadget, &pool).unwrap_err(),
        UsbError::InvalidState
    );
    assert_eq!(pool.in_use(), POOL_CAPACITY);
}

fn bind_with_starved_pool<const N: usize>() {
    let mut gadget = MockGadget::new(Speed::High);
    let pool: BufferPool<N> = BufferPool::new();
    let mut device = Device::new();

    assert_eq!(
        device.bind(&mut gadget, &pool).unwrap_err(),
        UsbError::AllocationFailed
    );
    // full rollback: zero net buffers held
    assert_eq!(pool.in_use(), 0);
    assert!(device.queue().is_empty());
    assert_eq!(device.state(), FunctionState::Unbound);

    // framework-driven cleanup after the failed bind stays safe
    device.unbind(&pool);
    assert_eq!(pool.in_use(), 0);
}

#[test]
fn test_allocation_failure_rolls_back_at_every_slot() {
    bind_with_starved_pool::<0>();
    bind_with_starved_pool::<1>();
    bind_with_starved_pool::<2>();
    bind_with_starved_pool::<3>();
    bind_with_starved_pool::<4>();
    bind_with_starved_pool::<5>();
}

#[test]
fn test_endpoint_exhaustion_fails_bind() {
    let mut gadget = MockGadget::new(Speed::High);
    gadget.claims_remaining = 1; // IN claim succeeds, OUT claim fails
    let pool: BufferPool<POOL_CAPACITY> = BufferPool::new();
    let mut device = Device::new();

    assert_eq!(
        device.bind(&mut gadget, &pool).unwrap_err(),
        UsbError::NoEndpointAvailable
    );
    assert_eq!(pool.in_use(), 0);
    assert_eq!(device.state(), FunctionState::Unbound);
}

#[test]
fn test_configure_at_high_speed_uses_512() {
    let mut gadget = MockGadget::new(Speed::High);
    let pool: BufferPool<POOL_CAPACITY> = BufferPool::new();
    let mut device = Device::new();

    device.bind(&mut gadget, &pool).unwrap();
    device.set_alt(&mut gadget, 0, 0).unwrap();

    assert_eq!(device.state(), FunctionState::Configured);
    assert_eq!(gadget.enabled_count(), 2);
    assert_eq!(gadget.enabled_packet_sizes(), vec![HS_BULK_MAX_PACKET; 2]);
    // IN endpoint is brought up before OUT
    assert_eq!(
        gadget.enabled_directions(),
        vec![Direction::In, Direction::Out]
    );
}

#[test]
fn test_configure_at_full_speed_uses_assigned_size() {
    let mut gadget = MockGadget::new(Speed::Full);
    let pool: BufferPool<POOL_CAPACITY> = BufferPool::new();
    let mut device = Device::new();

    device.bind(&mut gadget, &pool).unwrap();
    device.set_alt(&mut gadget, 0, 0).unwrap();

    assert_eq!(gadget.enabled_packet_sizes(), vec![FS_MAX_PACKET; 2]);
}

#[test]
fn test_out_enable_failure_disables_in_again() {
    let mut gadget = MockGadget::new(Speed::High);
    gadget.fail_enable_out = true;
    let pool: BufferPool<POOL_CAPACITY> = BufferPool::new();
    let mut device = Device::new();

    device.bind(&mut gadget, &pool).unwrap();
    assert_eq!(
        device.set_alt(&mut gadget, 0, 0).unwrap_err(),
        UsbError::EndpointEnableFailed
    );
    // the already-enabled IN endpoint was rolled back too
    assert_eq!(gadget.enabled_count(), 0);
    assert_ne!(device.state(), FunctionState::Configured);
}

#[test]
fn test_set_alt_before_bind_rejected() {
    let mut gadget = MockGadget::new(Speed::High);
    let mut device = Device::new();
    assert_eq!(
        device.set_alt(&mut gadget, 0, 0).unwrap_err(),
        UsbError::InvalidState
    );
}

#[test]
fn test_disable_clears_endpoints() {
    let mut gadget = MockGadget::new(Speed::High);
    let pool: BufferPool<POOL_CAPACITY> = BufferPool::new();
    let mut device = Device::new();

    device.bind(&mut gadget, &pool).unwrap();
    device.set_alt(&mut gadget, 0, 0).unwrap();
    device.disable(&mut gadget);

    assert_eq!(gadget.enabled_count(), 0);
    assert_eq!(device.state(), FunctionState::Disabled);

    // disabling again is non-fatal
    device.disable(&mut gadget);
    assert_eq!(gadget.enabled_count(), 0);
}

#[test]
fn test_speed_tables_share_addresses() {
    let mut gadget = MockGadget::new(Speed::High);
    gadget.next_endpoint = 5; // arbitrary auto-configuration outcome
    let pool: BufferPool<POOL_CAPACITY> = BufferPool::new();
    let mut device = Device::new();

    device.bind(&mut gadget, &pool).unwrap();

    let fs = device.descriptor_table(Speed::Full).unwrap();
    let hs = device.descriptor_table(Speed::High).unwrap();
    let fs_in = fs.endpoint_in.b_endpoint_address;
    let hs_in = hs.endpoint_in.b_endpoint_address;
    let fs_out = fs.endpoint_out.b_endpoint_address;
    let hs_out = hs.endpoint_out.b_endpoint_address;
    assert_eq!(fs_in, hs_in);
    assert_eq!(fs_out, hs_out);
    assert_ne!(fs_in, fs_out);

    let fs_mps = fs.endpoint_in.max_packet_size();
    let hs_mps = hs.endpoint_in.max_packet_size();
    assert_eq!(fs_mps, FS_MAX_PACKET);
    assert_eq!(hs_mps, HS_BULK_MAX_PACKET);
}

#[test]
fn test_full_speed_only_controller_has_no_hs_table() {
    let mut gadget = MockGadget::new(Speed::Full);
    gadget.caps = SpeedCaps::FULL_SPEED;
    let pool: BufferPool<POOL_CAPACITY> = BufferPool::new();
    let mut device = Device::new();

    device.bind(&mut gadget, &pool).unwrap();
    assert!(device.descriptor_table(Speed::Full).is_some());
    assert!(device.descriptor_table(Speed::High).is_none());
}

#[test]
fn test_bind_assigns_interface_and_string_ids() {
    let mut gadget = MockGadget::new(Speed::High);
    gadget.next_interface = 3;
    gadget.next_string_id = 9;
    let pool: BufferPool<POOL_CAPACITY> = BufferPool::new();
    let mut device = Device::new();

    device.bind(&mut gadget, &pool).unwrap();

    assert_eq!(device.interface_number(), Some(3));
    assert_eq!(device.template().string_id(), Some(9));
    let table = device.descriptor_table(Speed::High).unwrap();
    let interface_number = table.interface.b_interface_number;
    let i_interface = table.interface.i_interface;
    assert_eq!(interface_number, 3);
    assert_eq!(i_interface, 9);
}

#[test]
fn test_setup_reports_unsupported() {
    let mut device = Device::new();
    let request = SetupPacket {
        request_type: 0xC0,
        request: 51,
        value: 0,
        index: 0,
        length: 2,
    };
    assert_eq!(device.setup(&request).unwrap_err(), UsbError::Unsupported);
}
