//! Component configuration
//!
//! The configuration surface the host framework hands to the core:
//! device selection, polling cadence, enabled outputs and calibration.
//! Arrives as JSON from the framework or as a postcard blob from NVS, and
//! is validated into an immutable [`PollPlan`] before any bus traffic.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sensors::convert::Calibration;
use crate::sensors::{
    AddressRange, DeviceName, DeviceSelector, MeasurementSet, SensorAddress, device_name,
};

/// Inclusive scan window as written in the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRangeConfig {
    pub start: u8,
    pub end: u8,
}

/// Raw component configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChirpConfig {
    // --- Device selection (exactly one) ---
    /// Single fixed I2C address.
    pub address: Option<u8>,
    /// Inclusive range to scan for devices at startup.
    pub address_range: Option<AddressRangeConfig>,

    /// Label attached to every published reading.
    pub device_name: DeviceName,

    // --- Timing ---
    /// Seconds between poll cycles (minimum 1).
    pub scan_interval_secs: u32,
    /// Budget for a conversion to finish, per device and cycle.
    pub ready_timeout_ms: u32,
    /// Spacing between busy-register polls.
    pub ready_poll_interval_ms: u32,

    // --- Outputs ---
    pub measurements: MeasurementSet,

    // --- Calibration ---
    pub calibration: Calibration,
}

impl Default for ChirpConfig {
    fn default() -> Self {
        Self {
            address: None,
            address_range: Some(AddressRangeConfig {
                start: 0x01,
                end: 0x7F,
            }),
            device_name: device_name("chirp"),

            scan_interval_secs: 60,
            ready_timeout_ms: 3000,
            ready_poll_interval_ms: 20,

            measurements: MeasurementSet::ALL,

            calibration: Calibration::default(),
        }
    }
}

/// Polling parameters, fixed for the lifetime of the component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub scan_interval_ms: u32,
    pub enabled: MeasurementSet,
    pub ready_timeout_ms: u32,
    pub ready_poll_interval_ms: u32,
}

/// Validated configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPlan {
    pub selector: DeviceSelector,
    pub poll: PollConfig,
    pub device_name: DeviceName,
    pub calibration: Calibration,
}

impl ChirpConfig {
    /// Parse a JSON document; missing keys take their defaults, except
    /// that device selection never falls back to the default range once
    /// `address` is given.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|_| ConfigError::Corrupted)?;
        let mut cfg: Self = serde_json::from_value(value.clone()).map_err(|_| ConfigError::Corrupted)?;
        if value.get("address_range").is_none() && value.get("address").is_some() {
            cfg.address_range = None;
        }
        Ok(cfg)
    }

    /// Check every invariant and resolve device selection.
    pub fn validate(&self) -> Result<PollPlan, ConfigError> {
        let selector = match (self.address, self.address_range) {
            (Some(_), Some(_)) => return Err(ConfigError::AddressAndRange),
            (None, None) => return Err(ConfigError::NoAddress),
            (Some(a), None) => DeviceSelector::Fixed(SensorAddress::new(a)?),
            (None, Some(r)) => DeviceSelector::Range(AddressRange::new(r.start, r.end)?),
        };

        if self.device_name.is_empty() {
            return Err(ConfigError::Invalid("device_name must not be empty"));
        }
        if self.scan_interval_secs < 1 {
            return Err(ConfigError::ScanIntervalTooShort(self.scan_interval_secs));
        }
        if !(20..=30_000).contains(&self.ready_timeout_ms) {
            return Err(ConfigError::Invalid("ready_timeout_ms must be 20–30000"));
        }
        if !(1..=1000).contains(&self.ready_poll_interval_ms) {
            return Err(ConfigError::Invalid("ready_poll_interval_ms must be 1–1000"));
        }
        let scan_interval_ms = self
            .scan_interval_secs
            .checked_mul(1000)
            .ok_or(ConfigError::Invalid("scan_interval_secs is too large"))?;
        if self.ready_timeout_ms >= scan_interval_ms {
            return Err(ConfigError::Invalid(
                "ready_timeout_ms must be shorter than scan_interval",
            ));
        }
        if self.calibration.moisture_wet <= self.calibration.moisture_dry {
            return Err(ConfigError::Invalid(
                "calibration.moisture_wet must be above moisture_dry",
            ));
        }

        Ok(PollPlan {
            selector,
            poll: PollConfig {
                scan_interval_ms,
                enabled: self.measurements,
                ready_timeout_ms: self.ready_timeout_ms,
                ready_poll_interval_ms: self.ready_poll_interval_ms,
            },
            device_name: self.device_name.clone(),
            calibration: self.calibration,
        })
    }
}
