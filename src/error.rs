//! Unified error types for the Chirp firmware.
//!
//! One small `Copy` enum per layer (transport, driver, configuration,
//! runtime commands) and a top-level [`Error`] every layer converts into,
//! so the main loop handles failures uniformly without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A raw bus transaction failed.
    Transport(TransportError),
    /// A Chirp protocol step failed.
    Driver(DriverError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// A runtime command was rejected.
    Command(CommandError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Driver(e) => write!(f, "driver: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Command(e) => write!(f, "command: {e}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// Errors reported by a [`RegisterBus`](crate::app::ports::RegisterBus).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The bus did not complete the transaction in time.
    Timeout,
    /// No device acknowledged the address or a data byte.
    NoAck,
    /// Arbitration loss, bus fault, overrun or a bus already in use.
    BusError,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "bus timeout"),
            Self::NoAck => write!(f, "no acknowledge"),
            Self::BusError => write!(f, "bus error"),
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Driver errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    /// The device did not answer on the bus.
    DeviceUnreachable(TransportError),
    /// The conversion was still running when the ready budget ran out.
    Timeout,
    /// The device answered but reported an unknown firmware version.
    UnknownDevice(u8),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceUnreachable(e) => write!(f, "device unreachable ({e})"),
            Self::Timeout => write!(f, "conversion not ready in time"),
            Self::UnknownDevice(v) => write!(f, "unknown device (version 0x{v:02X})"),
        }
    }
}

impl From<TransportError> for DriverError {
    fn from(e: TransportError) -> Self {
        Self::DeviceUnreachable(e)
    }
}

impl From<DriverError> for Error {
    fn from(e: DriverError) -> Self {
        Self::Driver(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Configuration errors are fatal at setup: the component does not start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Both `address` and `address_range` were given.
    AddressAndRange,
    /// Neither `address` nor `address_range` was given.
    NoAddress,
    /// Address does not fit in 7 bits.
    AddressOutOfRange(u8),
    /// Range start is above range end.
    InvertedRange { start: u8, end: u8 },
    /// Scan interval below one second.
    ScanIntervalTooShort(u32),
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    Invalid(&'static str),
    /// Stored config failed deserialization.
    Corrupted,
    /// Storage backend I/O failure.
    Io,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddressAndRange => write!(f, "address and address_range are mutually exclusive"),
            Self::NoAddress => write!(f, "one of address or address_range is required"),
            Self::AddressOutOfRange(a) => write!(f, "address 0x{a:02X} is not a 7-bit address"),
            Self::InvertedRange { start, end } => {
                write!(f, "address_range start 0x{start:02X} > end 0x{end:02X}")
            }
            Self::ScanIntervalTooShort(s) => write!(f, "scan_interval {s}s is below 1s"),
            Self::Invalid(msg) => write!(f, "validation failed: {msg}"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::Io => write!(f, "I/O error"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Command errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// No discovered device at this address.
    UnknownDevice(u8),
    /// Another device already uses this address, or it is not a valid target.
    AddressInUse(u8),
    /// The target address lies outside the configured scan range.
    AddressOutsideRange(u8),
    /// The label could not be persisted.
    Storage,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownDevice(a) => write!(f, "no device at 0x{a:02X}"),
            Self::AddressInUse(a) => write!(f, "address 0x{a:02X} unavailable"),
            Self::AddressOutsideRange(a) => write!(f, "address 0x{a:02X} outside scan range"),
            Self::Storage => write!(f, "label storage failed"),
        }
    }
}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Self::Command(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
