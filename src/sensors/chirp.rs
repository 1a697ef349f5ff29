//! Chirp capacitive soil-moisture sensor, I2C register protocol.
//!
//! The Chirp runs a software I2C slave on an ATtiny.  Every value register
//! is read by writing the register number, waiting for the firmware to
//! load the answer (the bus adapter's settle delay), then reading 1 or 2
//! bytes MSB first.
//!
//! A measurement cycle is:
//!
//! ```text
//! trigger (0x03) ──▶ poll busy (0x09) every 20 ms ──▶ read 0x00 / 0x05 / 0x04
//! ```
//!
//! Light conversion is the slow one (up to seconds in darkness); moisture
//! and temperature registers always hold the latest completed sample.

use embedded_hal::delay::DelayNs;
use log::{debug, info};

use super::convert::{self, Calibration};
use super::{DeviceHandle, MeasurementKind, MeasurementResult, MeasurementSet, SensorAddress};
use crate::app::ports::{Clock, RegisterBus};
use crate::error::DriverError;

/// Register map.
pub mod reg {
    pub const CAPACITANCE: u8 = 0x00;
    pub const SET_ADDRESS: u8 = 0x01;
    pub const GET_ADDRESS: u8 = 0x02;
    pub const MEASURE_LIGHT: u8 = 0x03;
    pub const LIGHT: u8 = 0x04;
    pub const TEMPERATURE: u8 = 0x05;
    pub const RESET: u8 = 0x06;
    pub const VERSION: u8 = 0x07;
    pub const BUSY: u8 = 0x09;
}

/// Firmware versions that identify a Chirp.
pub const KNOWN_VERSIONS: core::ops::RangeInclusive<u8> = 0x22..=0x26;

/// Default spacing between busy-register reads.
pub const DEFAULT_POLL_INTERVAL_MS: u32 = 20;

/// Time the firmware needs to come back after a reset.
const RESET_SETTLE_MS: u32 = 50;

impl MeasurementKind {
    /// Register holding the latest raw value of this kind.
    pub const fn register(self) -> u8 {
        match self {
            Self::Moisture => reg::CAPACITANCE,
            Self::Temperature => reg::TEMPERATURE,
            Self::Light => reg::LIGHT,
        }
    }
}

/// Protocol driver for every Chirp on one bus.
pub struct ChirpDriver<B, D> {
    bus: B,
    delay: D,
    calibration: Calibration,
    poll_interval_ms: u32,
}

impl<B: RegisterBus, D: DelayNs> ChirpDriver<B, D> {
    pub fn new(bus: B, delay: D, calibration: Calibration) -> Self {
        Self {
            bus,
            delay,
            calibration,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }

    /// Override the busy-register poll spacing (clamped to at least 1 ms).
    pub fn with_poll_interval(mut self, ms: u32) -> Self {
        self.poll_interval_ms = ms.max(1);
        self
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    // ── Measurement sequence ─────────────────────────────────

    /// Write the start-conversion command.
    pub fn trigger_measurement(&mut self, handle: &DeviceHandle) -> Result<(), DriverError> {
        self.bus
            .write_register(handle.address(), reg::MEASURE_LIGHT, &[])?;
        Ok(())
    }

    /// Poll the busy flag until the device is idle or `timeout_ms` has
    /// passed on `clock`.
    ///
    /// Makes `ceil(timeout_ms / poll_interval)` reads at most, and always at
    /// least one.  Each read is priced at what the previous one took (the
    /// bus adapter's settle delay included) and the sleep before it is cut
    /// short so it still ends inside the budget.  A timeout ends this cycle
    /// only.
    pub fn await_ready(
        &mut self,
        handle: &DeviceHandle,
        timeout_ms: u32,
        clock: &impl Clock,
    ) -> Result<(), DriverError> {
        let attempts = timeout_ms.div_ceil(self.poll_interval_ms).max(1);
        let deadline = clock.uptime_ms() + u64::from(timeout_ms);
        let mut reads = 0;
        loop {
            let before = clock.uptime_ms();
            reads += 1;
            if !self.is_busy(handle.address())? {
                return Ok(());
            }
            let now = clock.uptime_ms();
            let read_cost = now.saturating_sub(before);
            let left = deadline.saturating_sub(now).saturating_sub(read_cost);
            if reads >= attempts || left == 0 {
                break;
            }
            let sleep = u32::try_from(left)
                .map_or(self.poll_interval_ms, |l| l.min(self.poll_interval_ms));
            self.delay.delay_ms(sleep);
        }
        debug!(
            "chirp {}: still busy after {} polls ({} ms)",
            handle.address(),
            reads,
            timeout_ms
        );
        Err(DriverError::Timeout)
    }

    /// Read the raw register value for `kind`.
    pub fn read_measurement(
        &mut self,
        handle: &DeviceHandle,
        kind: MeasurementKind,
    ) -> Result<u16, DriverError> {
        self.read_u16(handle.address(), kind.register())
    }

    /// Raw value to physical unit, using this driver's calibration.
    pub fn convert(&self, raw: u16, kind: MeasurementKind) -> f32 {
        convert::convert(raw, kind, &self.calibration)
    }

    /// Full cycle for one device: trigger, wait, read and convert every
    /// enabled kind.  The first failing step aborts the device.  The result
    /// is stamped with the clock reading at the trigger.
    pub fn poll(
        &mut self,
        handle: &DeviceHandle,
        enabled: MeasurementSet,
        timeout_ms: u32,
        clock: &impl Clock,
    ) -> Result<MeasurementResult, DriverError> {
        let timestamp_ms = clock.uptime_ms();
        self.trigger_measurement(handle)?;
        self.await_ready(handle, timeout_ms, clock)?;

        let mut result = MeasurementResult::empty(handle.address(), timestamp_ms);
        for kind in enabled.iter() {
            let raw = self.read_measurement(handle, kind)?;
            let value = self.convert(raw, kind);
            debug!(
                "chirp '{}': {:?} raw={} -> {:.1}{}",
                handle.name(),
                kind,
                raw,
                value,
                kind.unit()
            );
            result.set(kind, value);
        }
        Ok(result)
    }

    // ── Identity and maintenance ─────────────────────────────

    /// Read the firmware version and check it is a Chirp.
    pub fn identify(&mut self, address: SensorAddress) -> Result<u8, DriverError> {
        let version = self.read_u8(address, reg::VERSION)?;
        if !KNOWN_VERSIONS.contains(&version) {
            return Err(DriverError::UnknownDevice(version));
        }
        Ok(version)
    }

    /// Address the device reports for itself.
    pub fn read_address(&mut self, address: SensorAddress) -> Result<u8, DriverError> {
        self.read_u8(address, reg::GET_ADDRESS)
    }

    /// Soft-reset the device and wait for it to come back.
    pub fn reset(&mut self, handle: &DeviceHandle) -> Result<(), DriverError> {
        self.bus.write_register(handle.address(), reg::RESET, &[])?;
        self.delay.delay_ms(RESET_SETTLE_MS);
        Ok(())
    }

    /// Store a new address in the device and reset it so it takes effect.
    ///
    /// The caller is responsible for checking the target is free.
    pub fn change_address(
        &mut self,
        handle: &DeviceHandle,
        new_address: SensorAddress,
    ) -> Result<(), DriverError> {
        info!(
            "chirp '{}': changing address {} -> {}",
            handle.name(),
            handle.address(),
            new_address
        );
        self.bus
            .write_register(handle.address(), reg::SET_ADDRESS, &[new_address.get()])?;
        self.reset(handle)
    }

    /// Block for `ms` using the driver's delay provider.
    pub fn pause_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    /// Give the bus back (teardown).
    pub fn release(self) -> B {
        self.bus
    }

    // ── Internal ──────────────────────────────────────────────

    fn is_busy(&mut self, address: SensorAddress) -> Result<bool, DriverError> {
        Ok(self.read_u8(address, reg::BUSY)? != 0)
    }

    fn read_u8(&mut self, address: SensorAddress, register: u8) -> Result<u8, DriverError> {
        let mut buf = [0u8; 1];
        self.bus.read_register(address, register, &mut buf)?;
        Ok(buf[0])
    }

    fn read_u16(&mut self, address: SensorAddress, register: u8) -> Result<u16, DriverError> {
        let mut buf = [0u8; 2];
        self.bus.read_register(address, register, &mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }
}
