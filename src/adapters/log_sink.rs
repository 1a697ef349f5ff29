//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! A sensor-entity or MQTT publisher would implement the same trait.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Reading(r) => {
                info!(
                    "READ  | {} '{}' | {:?}={:.prec$}{} | t={}ms",
                    r.address,
                    r.name,
                    r.kind,
                    r.value,
                    r.kind.unit(),
                    r.timestamp_ms,
                    prec = r.kind.accuracy_decimals(),
                );
            }
            AppEvent::ReadingMissed { address, error } => {
                warn!("MISS  | {} | {}", address, error);
            }
            AppEvent::CycleStarted { cycle } => {
                info!("CYCLE | #{} start", cycle);
            }
            AppEvent::CycleCompleted {
                cycle,
                polled,
                missed,
            } => {
                info!("CYCLE | #{} done | ok={} missed={}", cycle, polled, missed);
            }
            AppEvent::DeviceFound { address, version } => {
                info!("FOUND | {} | fw=0x{:02X}", address, version);
            }
            AppEvent::LabelChanged { address, label } => {
                info!("LABEL | {} -> '{}'", address, label);
            }
            AppEvent::AddressChanged { from, to } => {
                info!("ADDR  | {} -> {}", from, to);
            }
            AppEvent::Started { devices } => {
                info!("START | devices={}", devices);
            }
            AppEvent::Stopped => {
                info!("STOP");
            }
        }
    }
}
