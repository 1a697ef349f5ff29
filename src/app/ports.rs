//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ChirpService (domain)
//! ```
//!
//! Driven adapters (I2C bus, clock, event sinks, storage) implement these
//! traits.  The [`ChirpService`](super::service::ChirpService) consumes them
//! via generics, so the domain core never touches hardware directly.

use crate::config::ChirpConfig;
use crate::error::{ConfigError, DriverError, TransportError};
use crate::scheduler::CycleReport;
use crate::sensors::{DeviceHandle, MeasurementResult, SensorAddress};

// ───────────────────────────────────────────────────────────────
// Register bus port (driven adapter: domain ↔ I2C)
// ───────────────────────────────────────────────────────────────

/// Register-level access to devices on one physical bus.
///
/// Methods take `&self`: implementations serialize transactions
/// internally so every device handle can share the same bus.  No retries
/// happen at this layer.
pub trait RegisterBus {
    /// Point at `register`, then read `buf.len()` bytes back.
    fn read_register(
        &self,
        address: SensorAddress,
        register: u8,
        buf: &mut [u8],
    ) -> Result<(), TransportError>;

    /// Write `register` followed by `data` in one transaction.
    fn write_register(
        &self,
        address: SensorAddress,
        register: u8,
        data: &[u8],
    ) -> Result<(), TransportError>;
}

impl<T: RegisterBus + ?Sized> RegisterBus for &T {
    fn read_register(
        &self,
        address: SensorAddress,
        register: u8,
        buf: &mut [u8],
    ) -> Result<(), TransportError> {
        (**self).read_register(address, register, buf)
    }

    fn write_register(
        &self,
        address: SensorAddress,
        register: u8,
        data: &[u8],
    ) -> Result<(), TransportError> {
        (**self).write_register(address, register, data)
    }
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time source.
pub trait Clock {
    /// Milliseconds since boot.
    fn uptime_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / publishing)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, a
/// sensor entity in the host framework, MQTT, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Poll delegate (decouples scheduler from driver and sink)
// ───────────────────────────────────────────────────────────────

/// Callbacks the [`PollScheduler`](crate::scheduler::PollScheduler) drives
/// for each device during a cycle.
///
/// The scheduler owns ordering and timing only; how a device is read and
/// where results go is up to the implementor.
pub trait PollDelegate {
    /// Called before the first device of cycle number `cycle` (1-based).
    fn on_cycle_started(&mut self, _cycle: u64) {}

    /// Run one full measurement sequence against `device`.
    fn poll_device(&mut self, device: &DeviceHandle) -> Result<MeasurementResult, DriverError>;

    /// Called with every successful result.
    fn on_result(&mut self, device: &DeviceHandle, result: &MeasurementResult);

    /// Called when `device` produced no reading this cycle.
    fn on_missed(&mut self, device: &DeviceHandle, error: DriverError);

    /// Called once every device of the cycle has been visited.
    fn on_cycle_finished(&mut self, _report: &CycleReport) {}
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the component configuration.
///
/// Implementations MUST validate before persisting and reject invalid
/// values with [`ConfigError`] rather than clamping them.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`ChirpConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<ChirpConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &ChirpConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage for labels and configuration blobs.
///
/// Keys are namespaced to prevent collisions between subsystems.  Write
/// operations MUST be atomic: no partial writes on power loss.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
