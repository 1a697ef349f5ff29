//! Shared I2C bus adapter.
//!
//! Implements [`RegisterBus`] on top of any `embedded_hal::i2c::I2c`
//! master.  Every register transaction takes the bus lock for exactly one
//! write/settle/read sequence, so several Chirps (and anything else that
//! shares the bus) interleave at transaction granularity and a failed
//! transaction never leaves the bus locked.
//!
//! The Chirp firmware is a software slave: after the register byte is
//! written it needs a few milliseconds before the answer can be clocked
//! out, which is why reads are not a single `write_read`.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorKind, I2c};
use log::trace;

use crate::app::ports::RegisterBus;
use crate::error::TransportError;
use crate::sensors::SensorAddress;

/// Wait between the register write and the read-back.
pub const DEFAULT_SETTLE_US: u32 = 5_000;

/// Longest payload after the register byte.
const MAX_WRITE_LEN: usize = 8;

struct BusInner<I2C, D> {
    i2c: I2C,
    delay: D,
}

/// One physical I2C bus, shared by every device handle on it.
pub struct SharedBus<M: RawMutex, I2C, D> {
    inner: Mutex<M, RefCell<BusInner<I2C, D>>>,
    settle_us: u32,
}

impl<M: RawMutex, I2C: I2c, D: DelayNs> SharedBus<M, I2C, D> {
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(BusInner { i2c, delay })),
            settle_us: DEFAULT_SETTLE_US,
        }
    }

    pub fn with_settle_us(mut self, settle_us: u32) -> Self {
        self.settle_us = settle_us;
        self
    }

    /// Take the peripheral and delay back.
    pub fn into_inner(self) -> (I2C, D) {
        let inner = self.inner.into_inner().into_inner();
        (inner.i2c, inner.delay)
    }

    fn with_bus<R>(
        &self,
        f: impl FnOnce(&mut BusInner<I2C, D>) -> Result<R, TransportError>,
    ) -> Result<R, TransportError> {
        self.inner.lock(|cell| {
            // Re-entry from inside a transaction means a caller bug, not a
            // device fault; report it instead of panicking.
            let mut bus = cell.try_borrow_mut().map_err(|_| TransportError::BusError)?;
            f(&mut *bus)
        })
    }
}

fn transport_error(e: &impl embedded_hal::i2c::Error) -> TransportError {
    match e.kind() {
        ErrorKind::NoAcknowledge(_) => TransportError::NoAck,
        _ => TransportError::BusError,
    }
}

impl<M: RawMutex, I2C: I2c, D: DelayNs> RegisterBus for SharedBus<M, I2C, D> {
    fn read_register(
        &self,
        address: SensorAddress,
        register: u8,
        buf: &mut [u8],
    ) -> Result<(), TransportError> {
        let settle_us = self.settle_us;
        self.with_bus(|bus| {
            bus.i2c
                .write(address.get(), &[register])
                .map_err(|e| transport_error(&e))?;
            bus.delay.delay_us(settle_us);
            bus.i2c.read(address.get(), buf).map_err(|e| transport_error(&e))?;
            trace!("i2c {}: read 0x{:02X} -> {:02X?}", address, register, buf);
            Ok(())
        })
    }

    fn write_register(
        &self,
        address: SensorAddress,
        register: u8,
        data: &[u8],
    ) -> Result<(), TransportError> {
        let mut frame: heapless::Vec<u8, { MAX_WRITE_LEN + 1 }> = heapless::Vec::new();
        frame.push(register).map_err(|_| TransportError::BusError)?;
        frame
            .extend_from_slice(data)
            .map_err(|()| TransportError::BusError)?;

        self.with_bus(|bus| {
            bus.i2c.write(address.get(), &frame).map_err(|e| transport_error(&e))?;
            trace!("i2c {}: write {:02X?}", address, frame.as_slice());
            Ok(())
        })
    }
}
