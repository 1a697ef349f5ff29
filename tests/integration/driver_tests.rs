//! Protocol driver against the simulated bus.

use chirp::adapters::i2c_bus::SharedBus;
use chirp::error::{DriverError, TransportError};
use chirp::sensors::chirp::{ChirpDriver, reg};
use chirp::sensors::convert::Calibration;
use chirp::sensors::{DeviceHandle, MeasurementKind, MeasurementSet, SensorAddress, device_name};

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation};

use crate::mock_bus::{MockClock, MockDelay, Op, SimBus, SimChirp, VirtualTime};

fn handle(addr: u8) -> DeviceHandle {
    DeviceHandle::new(SensorAddress::new(addr).unwrap(), device_name("bed"))
}

fn driver<'a>(bus: &'a SimBus, time: &VirtualTime) -> ChirpDriver<&'a SimBus, MockDelay> {
    ChirpDriver::new(bus, MockDelay(time.clone()), Calibration::default())
}

#[test]
fn full_poll_converts_every_enabled_value() {
    let time = VirtualTime::default();
    let bus = SimBus::new(&time).with(0x20, SimChirp::new());
    time.advance_ms(42);

    let result = driver(&bus, &time)
        .poll(&handle(0x20), MeasurementSet::ALL, 3000, &MockClock(time.clone()))
        .unwrap();

    assert!((result.moisture_percent.unwrap() - 45.0).abs() <= 0.5);
    assert!((result.temperature_celsius.unwrap() - 21.5).abs() < 1e-4);
    assert_eq!(result.light_lux, Some(800.0));
    assert_eq!(result.timestamp_ms, 42);
}

#[test]
fn trigger_precedes_busy_polls_precede_reads() {
    let time = VirtualTime::default();
    let bus = SimBus::new(&time).with(0x20, SimChirp::new());

    driver(&bus, &time)
        .poll(&handle(0x20), MeasurementSet::ALL, 3000, &MockClock(time.clone()))
        .unwrap();

    let ops: Vec<Op> = bus.trace().iter().map(|t| t.op).collect();
    assert_eq!(
        ops,
        vec![
            Op::Write(reg::MEASURE_LIGHT),
            Op::Read(reg::BUSY),
            Op::Read(reg::BUSY),
            Op::Read(reg::BUSY),
            Op::Read(reg::CAPACITANCE),
            Op::Read(reg::TEMPERATURE),
            Op::Read(reg::LIGHT),
        ]
    );
}

#[test]
fn disabled_kinds_are_not_read() {
    let time = VirtualTime::default();
    let bus = SimBus::new(&time).with(0x20, SimChirp::new());
    let only_moisture = MeasurementSet {
        moisture: true,
        temperature: false,
        light: false,
    };

    let result = driver(&bus, &time)
        .poll(&handle(0x20), only_moisture, 3000, &MockClock(time.clone()))
        .unwrap();

    assert!(result.moisture_percent.is_some());
    assert_eq!(result.temperature_celsius, None);
    assert_eq!(result.light_lux, None);
    assert!(bus.reads_of(reg::TEMPERATURE).is_empty());
    assert!(bus.reads_of(reg::LIGHT).is_empty());
}

#[test]
fn sub_zero_temperature() {
    let time = VirtualTime::default();
    let bus = SimBus::new(&time).with(
        0x20,
        SimChirp {
            temperature: -55,
            ..SimChirp::new()
        },
    );

    let raw = driver(&bus, &time)
        .read_measurement(&handle(0x20), MeasurementKind::Temperature)
        .unwrap();
    let celsius = driver(&bus, &time).convert(raw, MeasurementKind::Temperature);
    assert!((celsius - -5.5).abs() < 1e-4);
}

#[test]
fn stuck_device_times_out_after_bounded_polls() {
    let time = VirtualTime::default();
    let bus = SimBus::new(&time).with(0x20, SimChirp::stuck());

    let clock = MockClock(time.clone());
    let result = driver(&bus, &time).poll(&handle(0x20), MeasurementSet::ALL, 100, &clock);

    assert_eq!(result, Err(DriverError::Timeout));
    // 100 ms budget at 20 ms spacing
    assert_eq!(bus.reads_of(reg::BUSY).len(), 5);
    assert!(bus.reads_of(reg::CAPACITANCE).is_empty());
}

/// I2C master for a Chirp whose conversion never finishes.
struct AlwaysBusy;

impl ErrorType for AlwaysBusy {
    type Error = ErrorKind;
}

impl I2c for AlwaysBusy {
    fn transaction(
        &mut self,
        _address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), ErrorKind> {
        for op in operations {
            if let Operation::Read(buf) = op {
                buf.fill(1);
            }
        }
        Ok(())
    }
}

#[test]
fn ready_wait_counts_bus_settle_time() {
    for timeout in [100u32, 900, 3000] {
        let time = VirtualTime::default();
        let bus: SharedBus<NoopRawMutex, _, _> =
            SharedBus::new(AlwaysBusy, MockDelay(time.clone()));
        let mut drv = ChirpDriver::new(&bus, MockDelay(time.clone()), Calibration::default());

        assert_eq!(
            drv.await_ready(&handle(0x20), timeout, &MockClock(time.clone())),
            Err(DriverError::Timeout)
        );
        let blocked = time.now_ms();
        assert!(
            blocked <= u64::from(timeout),
            "await_ready({timeout}) blocked {blocked} ms"
        );
        assert!(
            blocked + 25 >= u64::from(timeout),
            "await_ready({timeout}) gave up after {blocked} ms"
        );
    }
}

#[test]
fn custom_poll_interval_changes_attempt_count() {
    let time = VirtualTime::default();
    let bus = SimBus::new(&time).with(0x20, SimChirp::stuck());

    let mut drv = driver(&bus, &time).with_poll_interval(50);
    assert_eq!(
        drv.await_ready(&handle(0x20), 120, &MockClock(time.clone())),
        Err(DriverError::Timeout)
    );
    assert_eq!(bus.reads_of(reg::BUSY).len(), 3);
}

#[test]
fn absent_device_is_unreachable() {
    let time = VirtualTime::default();
    let bus = SimBus::new(&time);

    let clock = MockClock(time.clone());
    let result = driver(&bus, &time).poll(&handle(0x20), MeasurementSet::ALL, 3000, &clock);
    assert_eq!(
        result,
        Err(DriverError::DeviceUnreachable(TransportError::NoAck))
    );
    assert_eq!(bus.calls(), 1);
}

#[test]
fn identify_rejects_unknown_firmware() {
    let time = VirtualTime::default();
    let bus = SimBus::new(&time).with(0x20, SimChirp::with_version(0x99));

    assert_eq!(
        driver(&bus, &time).identify(SensorAddress::new(0x20).unwrap()),
        Err(DriverError::UnknownDevice(0x99))
    );
}

#[test]
fn change_address_moves_the_device() {
    let time = VirtualTime::default();
    let bus = SimBus::new(&time).with(0x20, SimChirp::new());
    let mut drv = driver(&bus, &time);

    drv.change_address(&handle(0x20), SensorAddress::new(0x30).unwrap())
        .unwrap();

    assert_eq!(bus.addresses(), vec![0x30]);
    assert_eq!(
        drv.read_address(SensorAddress::new(0x30).unwrap()),
        Ok(0x30)
    );
}

#[test]
fn reset_waits_for_the_firmware() {
    let time = VirtualTime::default();
    let bus = SimBus::new(&time).with(0x20, SimChirp::new());

    let before = time.now_ms();
    driver(&bus, &time).reset(&handle(0x20)).unwrap();
    assert!(time.now_ms() - before >= 50);
    assert_eq!(bus.writes_of(reg::RESET), vec![0x20]);
}
