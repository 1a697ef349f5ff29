//! Outbound application events.
//!
//! The [`ChirpService`](super::service::ChirpService) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, publish a sensor
//! state, forward over MQTT.

use crate::error::DriverError;
use crate::sensors::{DeviceName, MeasurementKind, SensorAddress};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Setup finished; polling will begin on the next tick.
    Started { devices: usize },

    /// A device answered the identity probe.
    DeviceFound { address: SensorAddress, version: u8 },

    /// A poll cycle began.
    CycleStarted { cycle: u64 },

    /// One physical value for one enabled output.
    Reading(Reading),

    /// A device produced no reading this cycle.
    ReadingMissed {
        address: SensorAddress,
        error: DriverError,
    },

    /// A poll cycle finished.
    CycleCompleted {
        cycle: u64,
        polled: usize,
        missed: usize,
    },

    /// A device's display name changed.
    LabelChanged {
        address: SensorAddress,
        label: DeviceName,
    },

    /// A device was moved to a new bus address.
    AddressChanged {
        from: SensorAddress,
        to: SensorAddress,
    },

    /// The component was torn down.
    Stopped,
}

/// A single published measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub address: SensorAddress,
    pub name: DeviceName,
    pub kind: MeasurementKind,
    pub value: f32,
    pub timestamp_ms: u64,
}
