//! Function lifecycle state machine
//!
//! Drives bind, configure (set-alt), disable, and unbind for one bulk
//! function. All lifecycle entry points take `&mut self` and are serialized
//! by the framework; completion callbacks take `&self` and only touch the
//! spin-locked queues, so they are safe from interrupt context and never
//! race endpoint teardown.
//!
//! Resources are acquired in bind order (interface id, string id, endpoint
//! claims, buffers) and released in strict reverse order at unbind. A failed
//! bind rolls back every buffer allocated so far; unbind is idempotent and
//! safe after a partial bind.

use crate::buffer::{BufferPool, TransferBuffer, BULK_BUFFER_SIZE};
use crate::descriptor::{DescriptorTable, Direction, FunctionTemplate, Speed, SpeedCaps};
use crate::error::{Result, UsbError};
use crate::gadget::{ClaimedEndpoint, GadgetOps, SetupPacket};
use crate::queue::{TransferQueue, RX_CONCURRENCY, TX_QUEUE_DEPTH};

/// Lifecycle states, driven by the external framework
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FunctionState {
    /// No endpoints claimed, no buffers held
    Unbound,
    /// Endpoints claimed and buffers allocated, endpoints not yet enabled
    Bound,
    /// Endpoints enabled, transfers may flow
    Configured,
    /// Endpoints disabled after a configured phase
    Disabled,
}

/// Live state of one bound function
pub struct Device {
    state: FunctionState,
    template: FunctionTemplate,
    interface_number: Option<u8>,
    ep_in: Option<ClaimedEndpoint>,
    ep_out: Option<ClaimedEndpoint>,
    fs_table: Option<DescriptorTable>,
    hs_table: Option<DescriptorTable>,
    queue: TransferQueue,
}

impl Device {
    /// Create an unbound device with the descriptor template pre-populated
    pub const fn new() -> Self {
        Self {
            state: FunctionState::Unbound,
            template: FunctionTemplate::new(),
            interface_number: None,
            ep_in: None,
            ep_out: None,
            fs_table: None,
            hs_table: None,
            queue: TransferQueue::new(),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> FunctionState {
        self.state
    }

    /// Interface number assigned at bind
    pub fn interface_number(&self) -> Option<u8> {
        self.interface_number
    }

    /// Descriptor template (strings, interface constants)
    pub fn template(&self) -> &FunctionTemplate {
        &self.template
    }

    /// Transfer queues (idle outbound FIFO and inbound slots)
    pub fn queue(&self) -> &TransferQueue {
        &self.queue
    }

    /// Generated descriptor table for `speed`, present only while bound
    ///
    /// The high-speed table exists only when the controller is dual-speed.
    pub fn descriptor_table(&self, speed: Speed) -> Option<&DescriptorTable> {
        match speed {
            Speed::Full => self.fs_table.as_ref(),
            Speed::High => self.hs_table.as_ref(),
        }
    }

    /// Bind the function into a configuration
    ///
    /// Claims one bulk-IN and one bulk-OUT endpoint through the framework's
    /// auto-configuration, allocates the outbound idle buffers and inbound
    /// slot buffers from `pool`, and generates the per-speed descriptor
    /// tables. On any failure every buffer allocated so far is returned to
    /// the pool and the device stays unbound.
    pub fn bind<G: GadgetOps, const N: usize>(
        &mut self,
        ops: &mut G,
        pool: &BufferPool<N>,
    ) -> Result<()> {
        if self.state != FunctionState::Unbound {
            return Err(UsbError::InvalidState);
        }

        if self.template.string_id().is_none() {
            let id = ops.request_string_id()?;
            self.template.assign_string_id(id);
        }

        let interface = ops.request_interface_number()?;
        self.template.set_interface_number(interface);

        let caps = ops.speed_caps();
        let ep_in = ops
            .claim_endpoint(Direction::In, caps)
            .ok_or(UsbError::NoEndpointAvailable)?;
        let ep_out = ops
            .claim_endpoint(Direction::Out, caps)
            .ok_or(UsbError::NoEndpointAvailable)?;

        if let Err(err) = self.allocate_buffers(pool, &ep_in, &ep_out) {
            self.release_buffers(pool);
            #[cfg(feature = "defmt")]
            defmt::error!("bind: buffer allocation failed, rolled back");
            return Err(err);
        }

        self.fs_table = Some(
            self.template
                .table_for(Speed::Full, ep_out.assignment, ep_in.assignment),
        );
        self.hs_table = caps.contains(SpeedCaps::HIGH_SPEED).then(|| {
            self.template
                .table_for(Speed::High, ep_out.assignment, ep_in.assignment)
        });

        self.interface_number = Some(interface);
        self.ep_in = Some(ep_in);
        self.ep_out = Some(ep_out);
        self.state = FunctionState::Bound;

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "bind: interface {} IN {:#x} OUT {:#x}",
            interface,
            ep_in.assignment.address,
            ep_out.assignment.address,
        );
        Ok(())
    }

    fn allocate_buffers<const N: usize>(
        &mut self,
        pool: &BufferPool<N>,
        ep_in: &ClaimedEndpoint,
        ep_out: &ClaimedEndpoint,
    ) -> Result<()> {
        for _ in 0..TX_QUEUE_DEPTH {
            let buffer = pool.allocate(ep_in.handle, BULK_BUFFER_SIZE)?;
            if let Err(buffer) = self.queue.push_idle(buffer) {
                pool.release(buffer);
                return Err(UsbError::QueueFull);
            }
        }
        for _ in 0..RX_CONCURRENCY {
            let buffer = pool.allocate(ep_out.handle, BULK_BUFFER_SIZE)?;
            if let Err(buffer) = self.queue.store_inbound(buffer) {
                pool.release(buffer);
                return Err(UsbError::QueueFull);
            }
        }
        Ok(())
    }

    fn release_buffers<const N: usize>(&mut self, pool: &BufferPool<N>) {
        while let Some(buffer) = self.queue.pop_idle() {
            pool.release(buffer);
        }
        while let Some(buffer) = self.queue.take_inbound() {
            pool.release(buffer);
        }
    }

    /// Tear the function down, releasing buffers in reverse order of bind
    ///
    /// Callable from any state, including after a failed bind, and safe to
    /// call more than once. The framework guarantees no transfers are in
    /// flight by the time it invokes unbind.
    pub fn unbind<const N: usize>(&mut self, pool: &BufferPool<N>) {
        self.release_buffers(pool);
        self.fs_table = None;
        self.hs_table = None;
        self.ep_in = None;
        self.ep_out = None;
        self.interface_number = None;
        self.state = FunctionState::Unbound;

        #[cfg(feature = "defmt")]
        defmt::debug!("unbind complete");
    }

    /// Handle set-configuration / set-alternate-setting from the host
    ///
    /// Enables both endpoints with the descriptor matching the negotiated
    /// speed, bulk-IN first. If the OUT endpoint fails after the IN endpoint
    /// was enabled, the IN endpoint is disabled again; no endpoint stays
    /// enabled on a failed transition.
    pub fn set_alt<G: GadgetOps>(&mut self, ops: &mut G, _interface: u8, _alt: u8) -> Result<()> {
        let (ep_in, ep_out) = match (self.ep_in, self.ep_out) {
            (Some(ep_in), Some(ep_out)) => (ep_in, ep_out),
            _ => return Err(UsbError::InvalidState),
        };

        let speed = ops.current_speed();
        let table = self
            .descriptor_table(speed)
            .ok_or(UsbError::InvalidState)?;
        let (out_desc, in_desc) = (table.endpoint_out, table.endpoint_in);

        ops.enable_endpoint(ep_in.handle, &in_desc)?;
        if let Err(err) = ops.enable_endpoint(ep_out.handle, &out_desc) {
            ops.disable_endpoint(ep_in.handle);
            #[cfg(feature = "defmt")]
            defmt::error!("set_alt: OUT enable failed, IN disabled again");
            return Err(err);
        }

        self.state = FunctionState::Configured;

        #[cfg(feature = "defmt")]
        defmt::debug!("set_alt: configured at {}", speed);
        Ok(())
    }

    /// Disable both endpoints
    ///
    /// Non-fatal if an endpoint was already disabled.
    pub fn disable<G: GadgetOps>(&mut self, ops: &mut G) {
        if let Some(ep) = self.ep_in {
            ops.disable_endpoint(ep.handle);
        }
        if let Some(ep) = self.ep_out {
            ops.disable_endpoint(ep.handle);
        }
        if self.state == FunctionState::Configured {
            self.state = FunctionState::Disabled;
        }
    }

    /// Handle a function-specific control request
    ///
    /// Stub surface for protocol extension; every request is reported as
    /// unsupported.
    pub fn setup(&mut self, _request: &SetupPacket) -> Result<usize> {
        Err(UsbError::Unsupported)
    }

    /// Outbound (IN) transfer completion, success or error alike
    ///
    /// Interrupt-context safe: the buffer goes back to the idle queue and
    /// nothing else is touched. Errors are not retried here; the submission
    /// layer observes completion status independently.
    pub fn complete_in(&self, buffer: TransferBuffer, _status: Result<usize>) {
        if self.queue.push_idle(buffer).is_err() {
            // only reachable with a buffer that did not come from this
            // device's bind allocation
            #[cfg(feature = "defmt")]
            defmt::error!("complete_in: idle queue full, buffer dropped");
        }
    }

    /// Inbound (OUT) transfer completion
    ///
    /// Intentionally does nothing: inbound buffers stay in their fixed slots
    /// and resubmission belongs to the external submission layer.
    pub fn complete_out(&self, _status: Result<usize>) {}

    /// Take an idle outbound buffer for submission, non-blocking
    pub fn pop_idle(&self) -> Option<TransferBuffer> {
        self.queue.pop_idle()
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::new()
    }
}
