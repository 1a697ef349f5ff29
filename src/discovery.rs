//! Startup device discovery.
//!
//! Turns a [`DeviceSelector`] into the ordered list of devices the
//! scheduler polls.  Runs once, synchronously, before the first cycle;
//! the result never changes afterwards.

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, RegisterBus};
use crate::sensors::chirp::ChirpDriver;
use crate::sensors::{AddressRange, DeviceHandle, DeviceSelector, SensorAddress, device_name};

/// Pause between identity probes.
const PROBE_SPACING_MS: u32 = 10;

/// Probe every address in `range`, ascending, and keep those that
/// identify as a Chirp.  Silent addresses are not errors.
pub fn scan<B: RegisterBus, D: DelayNs>(
    driver: &mut ChirpDriver<B, D>,
    range: AddressRange,
    base_name: &str,
    sink: &mut impl EventSink,
) -> Vec<DeviceHandle> {
    info!(
        "discovery: scanning {} - {} for Chirp devices",
        range.start(),
        range.end()
    );

    let mut found = Vec::new();
    for (i, address) in range.iter().enumerate() {
        if i > 0 {
            driver.pause_ms(PROBE_SPACING_MS);
        }
        match driver.identify(address) {
            Ok(version) => {
                info!("discovery: Chirp at {} (firmware 0x{:02X})", address, version);
                sink.emit(&AppEvent::DeviceFound { address, version });
                found.push(DeviceHandle::scanned(address, base_name));
            }
            Err(e) => debug!("discovery: skip {} ({})", address, e),
        }
    }

    info!("discovery: {} device(s) found", found.len());
    found
}

/// Resolve the selector into device handles.
///
/// A fixed address is kept even when it does not answer: it is the
/// configured device, and missed readings are reported every cycle.
pub fn resolve<B: RegisterBus, D: DelayNs>(
    driver: &mut ChirpDriver<B, D>,
    selector: DeviceSelector,
    base_name: &str,
    sink: &mut impl EventSink,
) -> Vec<DeviceHandle> {
    match selector {
        DeviceSelector::Fixed(address) => {
            probe_fixed(driver, address, sink);
            vec![DeviceHandle::new(address, device_name(base_name))]
        }
        DeviceSelector::Range(range) => scan(driver, range, base_name, sink),
    }
}

fn probe_fixed<B: RegisterBus, D: DelayNs>(
    driver: &mut ChirpDriver<B, D>,
    address: SensorAddress,
    sink: &mut impl EventSink,
) {
    match driver.identify(address) {
        Ok(version) => {
            info!("discovery: Chirp at {} (firmware 0x{:02X})", address, version);
            sink.emit(&AppEvent::DeviceFound { address, version });
        }
        Err(e) => warn!(
            "discovery: configured device at {} did not identify ({}), polling anyway",
            address, e
        ),
    }
}
