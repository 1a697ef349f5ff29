//! Discovery against the simulated bus: range scans and fixed addresses.

use chirp::app::events::AppEvent;
use chirp::discovery;
use chirp::sensors::chirp::{ChirpDriver, reg};
use chirp::sensors::convert::Calibration;
use chirp::sensors::{AddressRange, DeviceSelector, SensorAddress};

use crate::mock_bus::{MockDelay, RecordingSink, SimBus, SimChirp, VirtualTime};

fn driver<'a>(bus: &'a SimBus, time: &VirtualTime) -> ChirpDriver<&'a SimBus, MockDelay> {
    ChirpDriver::new(bus, MockDelay(time.clone()), Calibration::default())
}

fn addrs(handles: &[chirp::sensors::DeviceHandle]) -> Vec<u8> {
    handles.iter().map(|h| h.address().get()).collect()
}

#[test]
fn scan_returns_exactly_the_present_devices() {
    let time = VirtualTime::default();
    let bus = SimBus::new(&time)
        .with(0x20, SimChirp::new())
        .with(0x22, SimChirp::new());
    let mut sink = RecordingSink::new();

    let found = discovery::scan(
        &mut driver(&bus, &time),
        AddressRange::new(0x20, 0x22).unwrap(),
        "chirp",
        &mut sink,
    );

    assert_eq!(addrs(&found), vec![0x20, 0x22]);
    assert_eq!(found[0].name(), "chirp 0x20");
    assert_eq!(found[1].name(), "chirp 0x22");
}

#[test]
fn every_address_probed_once_in_ascending_order() {
    let time = VirtualTime::default();
    let bus = SimBus::new(&time).with(0x21, SimChirp::new());
    let mut sink = RecordingSink::new();

    discovery::scan(
        &mut driver(&bus, &time),
        AddressRange::new(0x1E, 0x23).unwrap(),
        "chirp",
        &mut sink,
    );

    assert_eq!(
        bus.reads_of(reg::VERSION),
        vec![0x1E, 0x1F, 0x20, 0x21, 0x22, 0x23]
    );
}

#[test]
fn probes_are_spaced() {
    let time = VirtualTime::default();
    let bus = SimBus::new(&time);
    let mut sink = RecordingSink::new();

    discovery::scan(
        &mut driver(&bus, &time),
        AddressRange::new(0x20, 0x22).unwrap(),
        "chirp",
        &mut sink,
    );

    let trace = bus.trace();
    for pair in trace.windows(2) {
        assert!(pair[1].t_ms - pair[0].t_ms >= 10, "probes too close: {pair:?}");
    }
}

#[test]
fn unknown_firmware_is_skipped() {
    let time = VirtualTime::default();
    let bus = SimBus::new(&time)
        .with(0x20, SimChirp::new())
        .with(0x21, SimChirp::with_version(0x10));
    let mut sink = RecordingSink::new();

    let found = discovery::scan(
        &mut driver(&bus, &time),
        AddressRange::new(0x20, 0x21).unwrap(),
        "chirp",
        &mut sink,
    );

    assert_eq!(addrs(&found), vec![0x20]);
}

#[test]
fn empty_bus_finds_nothing() {
    let time = VirtualTime::default();
    let bus = SimBus::new(&time);
    let mut sink = RecordingSink::new();

    let found = discovery::scan(
        &mut driver(&bus, &time),
        AddressRange::new(0x01, 0x7F).unwrap(),
        "chirp",
        &mut sink,
    );

    assert!(found.is_empty());
    assert_eq!(bus.calls(), 127);
    assert!(sink.events.is_empty());
}

#[test]
fn found_devices_are_announced() {
    let time = VirtualTime::default();
    let bus = SimBus::new(&time).with(0x20, SimChirp::with_version(0x23));
    let mut sink = RecordingSink::new();

    discovery::scan(
        &mut driver(&bus, &time),
        AddressRange::new(0x20, 0x20).unwrap(),
        "chirp",
        &mut sink,
    );

    assert_eq!(
        sink.events,
        vec![AppEvent::DeviceFound {
            address: SensorAddress::new(0x20).unwrap(),
            version: 0x23,
        }]
    );
}

#[test]
fn fixed_address_kept_even_when_silent() {
    let time = VirtualTime::default();
    let bus = SimBus::new(&time);
    let mut sink = RecordingSink::new();

    let devices = discovery::resolve(
        &mut driver(&bus, &time),
        DeviceSelector::Fixed(SensorAddress::new(0x20).unwrap()),
        "bed",
        &mut sink,
    );

    assert_eq!(addrs(&devices), vec![0x20]);
    assert_eq!(devices[0].name(), "bed");
    assert_eq!(bus.reads_of(reg::VERSION), vec![0x20]);
}
