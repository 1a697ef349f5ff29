//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the component lifecycle for the Chirp sensors:
//! setup, discovery, per-tick polling and runtime commands.  All
//! interaction with hardware happens through **port traits** defined in
//! [`ports`], keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
