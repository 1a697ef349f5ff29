//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (API service
//! calls, serial console) that the
//! [`ChirpService`](super::service::ChirpService) interprets and acts upon.

use crate::sensors::DeviceName;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// Give the device at `address` a persistent display name.
    /// An empty label restores the configured name.
    SetLabel { address: u8, label: DeviceName },

    /// Reprogram a device's I2C address.
    SetAddress { from: u8, to: u8 },

    /// Run a poll cycle on the next tick instead of waiting for the interval.
    PollNow,
}
