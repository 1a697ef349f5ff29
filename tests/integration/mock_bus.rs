//! Mock adapters for integration tests.
//!
//! `SimBus` is a register-level simulation of several Chirps on one bus.
//! Every transaction is recorded with the virtual time it happened at, so
//! tests can assert on the full bus history.  `MockDelay` and `MockClock`
//! share that virtual time: sleeping in the driver moves the clock the
//! scheduler sees.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use chirp::app::events::{AppEvent, Reading};
use chirp::app::ports::{Clock, EventSink, RegisterBus, StorageError, StoragePort};
use chirp::error::TransportError;
use chirp::sensors::SensorAddress;
use chirp::sensors::chirp::reg;
use embedded_hal::delay::DelayNs;

/// Virtual time every transaction costs.
pub const TRANSACTION_MS: u64 = 1;

// ── Virtual time ──────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct VirtualTime(Rc<Cell<u64>>);

impl VirtualTime {
    pub fn now_ms(&self) -> u64 {
        self.0.get() / 1_000_000
    }

    pub fn advance_ns(&self, ns: u64) {
        self.0.set(self.0.get() + ns);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance_ns(ms * 1_000_000);
    }
}

pub struct MockDelay(pub VirtualTime);

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.advance_ns(u64::from(ns));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.0.advance_ms(u64::from(ms));
    }
}

pub struct MockClock(pub VirtualTime);

impl Clock for MockClock {
    fn uptime_ms(&self) -> u64 {
        self.0.now_ms()
    }
}

// ── Simulated Chirp ───────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SimChirp {
    pub version: u8,
    pub capacitance: u16,
    pub temperature: i16,
    pub light: u16,
    /// Busy-register reads answered with 1 after each trigger.
    pub busy_polls: u32,
    /// Never finishes a conversion.
    pub stuck: bool,
    pub(crate) busy_left: u32,
    pub(crate) pending_address: Option<u8>,
}

impl SimChirp {
    pub fn new() -> Self {
        Self {
            version: 0x26,
            capacitance: 362,
            temperature: 215,
            light: 800,
            busy_polls: 2,
            stuck: false,
            busy_left: 0,
            pending_address: None,
        }
    }

    pub fn stuck() -> Self {
        Self {
            stuck: true,
            ..Self::new()
        }
    }

    pub fn with_version(version: u8) -> Self {
        Self {
            version,
            ..Self::new()
        }
    }
}

impl Default for SimChirp {
    fn default() -> Self {
        Self::new()
    }
}

// ── Bus trace ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Read(u8),
    Write(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trace {
    pub t_ms: u64,
    pub address: u8,
    pub op: Op,
    pub acked: bool,
}

// ── SimBus ────────────────────────────────────────────────────

pub struct SimBus {
    devices: RefCell<BTreeMap<u8, SimChirp>>,
    trace: RefCell<Vec<Trace>>,
    time: VirtualTime,
}

impl SimBus {
    pub fn new(time: &VirtualTime) -> Self {
        Self {
            devices: RefCell::new(BTreeMap::new()),
            trace: RefCell::new(Vec::new()),
            time: time.clone(),
        }
    }

    pub fn with(self, address: u8, chirp: SimChirp) -> Self {
        self.devices.borrow_mut().insert(address, chirp);
        self
    }

    pub fn device(&self, address: u8) -> Option<SimChirp> {
        self.devices.borrow().get(&address).cloned()
    }

    pub fn addresses(&self) -> Vec<u8> {
        self.devices.borrow().keys().copied().collect()
    }

    pub fn trace(&self) -> Vec<Trace> {
        self.trace.borrow().clone()
    }

    /// Total transactions attempted, acknowledged or not.
    pub fn calls(&self) -> usize {
        self.trace.borrow().len()
    }

    /// Addresses that saw a read of `register`, in order.
    pub fn reads_of(&self, register: u8) -> Vec<u8> {
        self.trace
            .borrow()
            .iter()
            .filter(|t| t.op == Op::Read(register))
            .map(|t| t.address)
            .collect()
    }

    /// Addresses that saw a write of `register`, in order.
    pub fn writes_of(&self, register: u8) -> Vec<u8> {
        self.trace
            .borrow()
            .iter()
            .filter(|t| t.op == Op::Write(register))
            .map(|t| t.address)
            .collect()
    }

    fn record(&self, address: u8, op: Op, acked: bool) {
        self.time.advance_ms(TRANSACTION_MS);
        self.trace.borrow_mut().push(Trace {
            t_ms: self.time.now_ms(),
            address,
            op,
            acked,
        });
    }
}

impl RegisterBus for SimBus {
    fn read_register(
        &self,
        address: SensorAddress,
        register: u8,
        buf: &mut [u8],
    ) -> Result<(), TransportError> {
        let addr = address.get();
        let mut devices = self.devices.borrow_mut();
        let Some(chirp) = devices.get_mut(&addr) else {
            self.record(addr, Op::Read(register), false);
            return Err(TransportError::NoAck);
        };
        self.record(addr, Op::Read(register), true);

        let value: u16 = match register {
            reg::VERSION => u16::from(chirp.version),
            reg::GET_ADDRESS => u16::from(addr),
            reg::BUSY => {
                if chirp.stuck {
                    1
                } else if chirp.busy_left > 0 {
                    chirp.busy_left -= 1;
                    1
                } else {
                    0
                }
            }
            reg::CAPACITANCE => chirp.capacitance,
            reg::TEMPERATURE => chirp.temperature as u16,
            reg::LIGHT => chirp.light,
            _ => 0,
        };
        match buf.len() {
            1 => buf[0] = value as u8,
            2 => buf.copy_from_slice(&value.to_be_bytes()),
            _ => buf.fill(0),
        }
        Ok(())
    }

    fn write_register(
        &self,
        address: SensorAddress,
        register: u8,
        data: &[u8],
    ) -> Result<(), TransportError> {
        let addr = address.get();
        let mut devices = self.devices.borrow_mut();
        let Some(chirp) = devices.get_mut(&addr) else {
            self.record(addr, Op::Write(register), false);
            return Err(TransportError::NoAck);
        };
        self.record(addr, Op::Write(register), true);

        match register {
            reg::MEASURE_LIGHT => chirp.busy_left = chirp.busy_polls,
            reg::SET_ADDRESS => chirp.pending_address = data.first().copied(),
            reg::RESET => {
                if let Some(new) = chirp.pending_address.take() {
                    if let Some(moved) = devices.remove(&addr) {
                        devices.insert(new, moved);
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn readings(&self) -> Vec<&Reading> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::Reading(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    pub fn missed(&self) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::ReadingMissed { address, .. } => Some(address.get()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── MemStore ──────────────────────────────────────────────────

/// In-memory `StoragePort` that can be told to fail writes.
#[derive(Default)]
pub struct MemStore {
    data: HashMap<String, Vec<u8>>,
    pub fail_writes: bool,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(namespace: &str, key: &str) -> String {
        format!("{namespace}::{key}")
    }
}

impl StoragePort for MemStore {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let data = self
            .data
            .get(&Self::key(namespace, key))
            .ok_or(StorageError::NotFound)?;
        let len = data.len().min(buf.len());
        buf[..len].copy_from_slice(&data[..len]);
        Ok(len)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::IoError);
        }
        self.data.insert(Self::key(namespace, key), data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.data.remove(&Self::key(namespace, key));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.data.contains_key(&Self::key(namespace, key))
    }
}
