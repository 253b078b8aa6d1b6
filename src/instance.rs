//! Named function instances and the registry exposed to the configuration
//! layer
//!
//! Each instance owns exactly one [`Device`]; the device's descriptor
//! template is pre-populated at allocation time. Instance names are set at
//! most once.

use heapless::{String, Vec};

use crate::error::{Result, UsbError};
use crate::function::Device;

/// Maximum instance name length in characters
pub const MAX_INST_NAME_LEN: usize = 40;

/// One named function instance owning its device
pub struct FunctionInstance {
    name: Option<String<MAX_INST_NAME_LEN>>,
    device: Device,
}

impl FunctionInstance {
    /// Allocate an unnamed instance with a fresh device
    pub const fn new() -> Self {
        Self {
            name: None,
            device: Device::new(),
        }
    }

    /// Set the instance name, at most once
    ///
    /// Fails with `NameTooLong` past the length limit and `InvalidState`
    /// when a name is already set.
    pub fn set_name(&mut self, name: &str) -> Result<()> {
        if self.name.is_some() {
            return Err(UsbError::InvalidState);
        }
        if name.len() > MAX_INST_NAME_LEN {
            return Err(UsbError::NameTooLong);
        }
        let mut stored = String::new();
        stored.push_str(name).map_err(|_| UsbError::NameTooLong)?;
        self.name = Some(stored);
        Ok(())
    }

    /// Instance name, if set
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Owned device
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Owned device, mutable
    pub fn device_mut(&mut self) -> &mut Device {
        &mut self.device
    }
}

impl Default for FunctionInstance {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry of up to `N` named instances
///
/// Stands in for the external configuration registry's item lifecycle:
/// creating an instance allocates its device, destroying it releases both.
pub struct FunctionRegistry<const N: usize> {
    instances: Vec<FunctionInstance, N>,
}

impl<const N: usize> FunctionRegistry<N> {
    /// Create an empty registry
    pub const fn new() -> Self {
        Self {
            instances: Vec::new(),
        }
    }

    /// Create a named instance
    ///
    /// The name is validated before anything is allocated, so a failed
    /// creation registers no partial instance. Duplicate names are rejected.
    pub fn create_instance(&mut self, name: &str) -> Result<&mut FunctionInstance> {
        if name.len() > MAX_INST_NAME_LEN {
            return Err(UsbError::NameTooLong);
        }
        if self.find(name).is_some() {
            return Err(UsbError::InvalidParameter);
        }

        let mut instance = FunctionInstance::new();
        instance.set_name(name)?;
        if self.instances.push(instance).is_err() {
            return Err(UsbError::AllocationFailed);
        }
        self.instances.last_mut().ok_or(UsbError::InvalidState)
    }

    /// Destroy an instance, releasing its device
    pub fn destroy_instance(&mut self, name: &str) -> Result<()> {
        let index = self
            .instances
            .iter()
            .position(|instance| instance.name() == Some(name))
            .ok_or(UsbError::InvalidParameter)?;
        self.instances.swap_remove(index);
        Ok(())
    }

    /// Look up an instance by name
    pub fn find(&self, name: &str) -> Option<&FunctionInstance> {
        self.instances
            .iter()
            .find(|instance| instance.name() == Some(name))
    }

    /// Look up an instance by name, mutable
    pub fn find_mut(&mut self, name: &str) -> Option<&mut FunctionInstance> {
        self.instances
            .iter_mut()
            .find(|instance| instance.name() == Some(name))
    }

    /// Number of live instances
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// True when no instance is registered
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl<const N: usize> Default for FunctionRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}
