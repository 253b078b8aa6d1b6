//! Command channel: line-oriented glue between a character device and the
//! USB mode switch
//!
//! Accepts batches of `command,param_type,param` lines. The only recognized
//! command is `usbmode` with an integer parameter, forwarded to the owned
//! [`ModeSwitch`]. Malformed lines are skipped without aborting the rest of
//! the batch. All channel state lives in one [`CommandChannel`] value; there
//! are no module-level statics.

use crate::error::{Result, UsbError};

/// Integer parameter type tag
pub const PARAM_TYPE_INT: i32 = 1;
/// String parameter type tag
pub const PARAM_TYPE_STRING: i32 = 2;

/// USB controller role selected through the command channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsbMode {
    /// No role active
    None,
    /// Peripheral (device) role
    Device,
    /// Host role
    Host,
}

impl UsbMode {
    /// Decode the wire integer; unknown values yield `None`
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::None),
            1 => Some(Self::Device),
            2 => Some(Self::Host),
            _ => None,
        }
    }

    /// Wire integer for this mode
    pub const fn as_raw(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Device => 1,
            Self::Host => 2,
        }
    }
}

/// External mode-toggle hook the channel drives
pub trait ModeSwitch {
    /// Current mode
    fn mode(&self) -> UsbMode;

    /// Switch to `mode`
    fn toggle(&mut self, mode: UsbMode);
}

/// Owned command channel context
pub struct CommandChannel<S: ModeSwitch> {
    switch: S,
}

impl<S: ModeSwitch> CommandChannel<S> {
    /// Create a channel driving `switch`
    pub const fn new(switch: S) -> Self {
        Self { switch }
    }

    /// Current mode, as reported to readers of the channel
    pub fn mode(&self) -> UsbMode {
        self.switch.mode()
    }

    /// Process a batch of command lines, returning how many were applied
    pub fn write(&mut self, text: &str) -> usize {
        let mut applied = 0;
        for line in text.split('\n') {
            if self.process_line(line.trim()).is_ok() {
                applied += 1;
            }
        }
        applied
    }

    fn process_line(&mut self, line: &str) -> Result<()> {
        if line.is_empty() {
            return Err(UsbError::InvalidParameter);
        }

        let mut fields = line.split(',');
        let (Some(command), Some(param_type), Some(param)) =
            (fields.next(), fields.next(), fields.next())
        else {
            #[cfg(feature = "defmt")]
            defmt::error!("command line missing fields");
            return Err(UsbError::InvalidParameter);
        };

        let param_type: i32 = param_type
            .parse()
            .map_err(|_| UsbError::InvalidParameter)?;

        match command {
            "usbmode" => {
                if param_type != PARAM_TYPE_INT {
                    #[cfg(feature = "defmt")]
                    defmt::error!("usbmode expects an integer parameter");
                    return Err(UsbError::InvalidParameter);
                }
                let raw: i32 = param.parse().map_err(|_| UsbError::InvalidParameter)?;
                let mode = UsbMode::from_raw(raw).ok_or(UsbError::InvalidParameter)?;
                self.switch.toggle(mode);
                Ok(())
            }
            _ => Err(UsbError::Unsupported),
        }
    }

    /// Tear the channel down, recovering the switch
    pub fn into_inner(self) -> S {
        self.switch
    }
}
