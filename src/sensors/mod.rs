//! Sensor subsystem: the Chirp protocol driver, unit conversion, and the
//! value types shared by discovery, scheduling and publishing.
//!
//! Addresses are validated once, at construction, so every
//! [`SensorAddress`] held anywhere in the firmware is a legal 7-bit address.

pub mod chirp;
pub mod convert;

use core::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Maximum length of a device name or label.
pub const NAME_CAP: usize = 32;

/// Bounded device name / label.
pub type DeviceName = heapless::String<NAME_CAP>;

/// Build a [`DeviceName`], truncating on a char boundary if needed.
pub fn device_name(s: &str) -> DeviceName {
    let mut end = s.len().min(NAME_CAP);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    let mut name = DeviceName::new();
    let _ = name.push_str(&s[..end]);
    name
}

// ───────────────────────────────────────────────────────────────
// Addresses
// ───────────────────────────────────────────────────────────────

/// A 7-bit I2C address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SensorAddress(u8);

impl SensorAddress {
    pub const MAX: u8 = 0x7F;

    pub const fn new(raw: u8) -> Result<Self, ConfigError> {
        if raw > Self::MAX {
            return Err(ConfigError::AddressOutOfRange(raw));
        }
        Ok(Self(raw))
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for SensorAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

/// Inclusive, ascending scan window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressRange {
    start: SensorAddress,
    end: SensorAddress,
}

impl AddressRange {
    pub fn new(start: u8, end: u8) -> Result<Self, ConfigError> {
        let start = SensorAddress::new(start)?;
        let end = SensorAddress::new(end)?;
        if start > end {
            return Err(ConfigError::InvertedRange {
                start: start.get(),
                end: end.get(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> SensorAddress {
        self.start
    }

    pub fn end(&self) -> SensorAddress {
        self.end
    }

    pub fn contains(&self, address: SensorAddress) -> bool {
        address >= self.start && address <= self.end
    }

    pub fn len(&self) -> usize {
        (self.end.get() - self.start.get()) as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Addresses in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = SensorAddress> + use<> {
        (self.start.get()..=self.end.get()).map(SensorAddress)
    }
}

/// How the set of devices is chosen; resolved once at setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSelector {
    Fixed(SensorAddress),
    Range(AddressRange),
}

// ───────────────────────────────────────────────────────────────
// Devices
// ───────────────────────────────────────────────────────────────

/// A device the scheduler polls: its address and the name results carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHandle {
    address: SensorAddress,
    name: DeviceName,
}

impl DeviceHandle {
    pub fn new(address: SensorAddress, name: DeviceName) -> Self {
        Self { address, name }
    }

    /// Name for a device found by a range scan: `"<base> 0xNN"`.
    pub fn scanned(address: SensorAddress, base: &str) -> Self {
        let mut name = DeviceName::new();
        if write!(name, "{} {}", base, address).is_err() {
            name = device_name(base);
        }
        Self { address, name }
    }

    pub fn address(&self) -> SensorAddress {
        self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: DeviceName) {
        self.name = name;
    }
}

// ───────────────────────────────────────────────────────────────
// Measurements
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementKind {
    Moisture,
    Temperature,
    Light,
}

impl MeasurementKind {
    pub const ALL: [Self; 3] = [Self::Moisture, Self::Temperature, Self::Light];

    pub const fn unit(self) -> &'static str {
        match self {
            Self::Moisture => "%",
            Self::Temperature => "\u{00b0}C",
            Self::Light => "lx",
        }
    }

    /// Decimal places a front end should display.
    pub const fn accuracy_decimals(self) -> usize {
        match self {
            Self::Moisture | Self::Light => 0,
            Self::Temperature => 1,
        }
    }
}

/// Which outputs are configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasurementSet {
    pub moisture: bool,
    pub temperature: bool,
    pub light: bool,
}

impl MeasurementSet {
    pub const ALL: Self = Self {
        moisture: true,
        temperature: true,
        light: true,
    };

    pub const NONE: Self = Self {
        moisture: false,
        temperature: false,
        light: false,
    };

    pub fn contains(&self, kind: MeasurementKind) -> bool {
        match kind {
            MeasurementKind::Moisture => self.moisture,
            MeasurementKind::Temperature => self.temperature,
            MeasurementKind::Light => self.light,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.moisture || self.temperature || self.light)
    }

    pub fn iter(self) -> impl Iterator<Item = MeasurementKind> {
        MeasurementKind::ALL
            .into_iter()
            .filter(move |k| self.contains(*k))
    }
}

impl Default for MeasurementSet {
    fn default() -> Self {
        Self::ALL
    }
}

/// One device's readings for one cycle. Published, then dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementResult {
    pub address: SensorAddress,
    pub moisture_percent: Option<f32>,
    pub temperature_celsius: Option<f32>,
    pub light_lux: Option<f32>,
    pub timestamp_ms: u64,
}

impl MeasurementResult {
    pub fn empty(address: SensorAddress, timestamp_ms: u64) -> Self {
        Self {
            address,
            moisture_percent: None,
            temperature_celsius: None,
            light_lux: None,
            timestamp_ms,
        }
    }

    pub fn get(&self, kind: MeasurementKind) -> Option<f32> {
        match kind {
            MeasurementKind::Moisture => self.moisture_percent,
            MeasurementKind::Temperature => self.temperature_celsius,
            MeasurementKind::Light => self.light_lux,
        }
    }

    pub(crate) fn set(&mut self, kind: MeasurementKind, value: f32) {
        match kind {
            MeasurementKind::Moisture => self.moisture_percent = Some(value),
            MeasurementKind::Temperature => self.temperature_celsius = Some(value),
            MeasurementKind::Light => self.light_lux = Some(value),
        }
    }

    /// Present fields, in [`MeasurementKind::ALL`] order.
    pub fn values(&self) -> impl Iterator<Item = (MeasurementKind, f32)> + '_ {
        MeasurementKind::ALL
            .into_iter()
            .filter_map(|k| self.get(k).map(|v| (k, v)))
    }
}
