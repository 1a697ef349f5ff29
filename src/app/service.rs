//! Application service, the hexagonal core.
//!
//! [`ChirpService`] owns the protocol driver, the discovered device list
//! and the poll scheduler.  It exposes the component lifecycle (setup,
//! tick, commands, teardown) to the host framework.  All I/O flows through
//! port traits injected at call sites, making the entire service testable
//! with mock adapters.
//!
//! ```text
//!  RegisterBus ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                  │         ChirpService          │
//!  StoragePort ◀──▶│ Driver · Discovery · Scheduler│ ◀── Clock
//!                  └──────────────────────────────┘
//! ```

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::config::{ChirpConfig, PollConfig, PollPlan};
use crate::discovery;
use crate::error::{CommandError, DriverError, Error};
use crate::labels::LabelStore;
use crate::scheduler::{CycleReport, PollScheduler, PollState};
use crate::sensors::chirp::ChirpDriver;
use crate::sensors::{
    DeviceHandle, DeviceName, DeviceSelector, MeasurementResult, SensorAddress, device_name,
};

use super::commands::AppCommand;
use super::events::{AppEvent, Reading};
use super::ports::{Clock, EventSink, PollDelegate, RegisterBus, StoragePort};

// ───────────────────────────────────────────────────────────────
// ChirpService
// ───────────────────────────────────────────────────────────────

/// One component instance: one bus, one device selection.
pub struct ChirpService<B, D> {
    driver: ChirpDriver<B, D>,
    devices: Vec<DeviceHandle>,
    scheduler: PollScheduler,
    plan: PollPlan,
}

impl<B: RegisterBus, D: DelayNs> ChirpService<B, D> {
    // ── Lifecycle ─────────────────────────────────────────────

    /// Validate the configuration, find the devices and prepare them.
    ///
    /// An invalid configuration fails before the bus is touched.  Devices
    /// that do not answer the reset are still polled; they will show up
    /// as missed readings.
    pub fn setup(
        config: &ChirpConfig,
        bus: B,
        delay: D,
        storage: &impl StoragePort,
        sink: &mut impl EventSink,
    ) -> Result<Self, Error> {
        let plan = config.validate()?;

        let mut driver = ChirpDriver::new(bus, delay, plan.calibration)
            .with_poll_interval(plan.poll.ready_poll_interval_ms);

        let mut devices = discovery::resolve(&mut driver, plan.selector, &plan.device_name, sink);

        for device in &mut devices {
            if let Some(label) = LabelStore::load(storage, device.address()) {
                device.set_name(label);
            }
            if let Err(e) = driver.reset(device) {
                warn!("chirp '{}': reset failed ({})", device.name(), e);
            }
        }

        let service = Self {
            driver,
            devices,
            scheduler: PollScheduler::new(plan.poll.scan_interval_ms),
            plan,
        };
        service.dump_config();
        sink.emit(&AppEvent::Started {
            devices: service.devices.len(),
        });
        Ok(service)
    }

    /// Destroy every device handle and hand the bus back.
    pub fn teardown(self, sink: &mut impl EventSink) -> B {
        info!("ChirpService: stopping ({} device(s))", self.devices.len());
        sink.emit(&AppEvent::Stopped);
        self.driver.release()
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run a poll cycle if one is due.
    pub fn tick(&mut self, clock: &impl Clock, sink: &mut impl EventSink) -> Option<CycleReport> {
        let mut runner = CycleRunner {
            driver: &mut self.driver,
            poll: self.plan.poll,
            clock,
            sink,
        };
        self.scheduler.tick(clock, &self.devices, &mut runner)
    }

    /// Run a poll cycle immediately.
    pub fn poll_now(&mut self, clock: &impl Clock, sink: &mut impl EventSink) -> CycleReport {
        let mut runner = CycleRunner {
            driver: &mut self.driver,
            poll: self.plan.poll,
            clock,
            sink,
        };
        self.scheduler.run_cycle(clock, &self.devices, &mut runner)
    }

    // ── Command handling ──────────────────────────────────────

    /// Process a runtime command (API service call, console, etc.).
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        storage: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) -> Result<(), Error> {
        match cmd {
            AppCommand::PollNow => {
                self.scheduler.expedite();
                Ok(())
            }
            AppCommand::SetLabel { address, label } => self.set_label(address, label, storage, sink),
            AppCommand::SetAddress { from, to } => self.set_address(from, to, storage, sink),
        }
    }

    fn set_label(
        &mut self,
        address: u8,
        label: DeviceName,
        storage: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) -> Result<(), Error> {
        let index = self
            .index_of(address)
            .ok_or(CommandError::UnknownDevice(address))?;
        let addr = self.devices[index].address();

        let name = if label.is_empty() {
            LabelStore::remove(storage, addr).map_err(|_| CommandError::Storage)?;
            self.default_name(addr)
        } else {
            LabelStore::save(storage, addr, &label).map_err(|_| CommandError::Storage)?;
            label
        };

        info!("chirp {}: label is now '{}'", addr, name);
        self.devices[index].set_name(name.clone());
        sink.emit(&AppEvent::LabelChanged {
            address: addr,
            label: name,
        });
        Ok(())
    }

    fn set_address(
        &mut self,
        from: u8,
        to: u8,
        storage: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) -> Result<(), Error> {
        let index = self
            .index_of(from)
            .ok_or(CommandError::UnknownDevice(from))?;
        let target = match SensorAddress::new(to) {
            Ok(a) if a.get() != 0 => a,
            _ => return Err(CommandError::AddressInUse(to).into()),
        };
        if self.index_of(to).is_some() {
            return Err(CommandError::AddressInUse(to).into());
        }
        if let DeviceSelector::Range(range) = self.plan.selector {
            if !range.contains(target) {
                return Err(CommandError::AddressOutsideRange(to).into());
            }
        }

        let old = self.devices[index].clone();
        self.driver.change_address(&old, target)?;
        match self.driver.read_address(target) {
            Ok(reported) if reported == target.get() => {}
            Ok(reported) => warn!(
                "chirp {}: device reports address 0x{:02X} after the change",
                target, reported
            ),
            Err(e) => warn!("chirp {}: not answering after the change ({})", target, e),
        }

        let label = LabelStore::load(&*storage, old.address());
        let name = match &label {
            Some(label) => {
                if LabelStore::save(storage, target, label)
                    .and_then(|()| LabelStore::remove(storage, old.address()))
                    .is_err()
                {
                    warn!("chirp {}: could not move label to {}", old.address(), target);
                }
                label.clone()
            }
            None => self.default_name(target),
        };

        self.devices[index] = DeviceHandle::new(target, name);
        self.devices.sort_by_key(DeviceHandle::address);
        if let DeviceSelector::Fixed(_) = self.plan.selector {
            self.plan.selector = DeviceSelector::Fixed(target);
            warn!(
                "chirp: device moved to {}; update `address` in the configuration",
                target
            );
        }

        sink.emit(&AppEvent::AddressChanged {
            from: old.address(),
            to: target,
        });
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    /// Devices in poll order.
    pub fn devices(&self) -> &[DeviceHandle] {
        &self.devices
    }

    pub fn state(&self) -> PollState {
        self.scheduler.state()
    }

    pub fn cycle_count(&self) -> u64 {
        self.scheduler.cycles()
    }

    pub fn plan(&self) -> &PollPlan {
        &self.plan
    }

    // ── Internal ──────────────────────────────────────────────

    fn index_of(&self, address: u8) -> Option<usize> {
        self.devices
            .iter()
            .position(|d| d.address().get() == address)
    }

    /// Name a device has when no label is stored.
    fn default_name(&self, address: SensorAddress) -> DeviceName {
        match self.plan.selector {
            DeviceSelector::Fixed(_) => self.plan.device_name.clone(),
            DeviceSelector::Range(_) => {
                device_name(DeviceHandle::scanned(address, &self.plan.device_name).name())
            }
        }
    }

    fn dump_config(&self) {
        let poll = &self.plan.poll;
        info!("Chirp:");
        match self.plan.selector {
            DeviceSelector::Fixed(a) => info!("  Address: {}", a),
            DeviceSelector::Range(r) => info!("  Address range: {} - {}", r.start(), r.end()),
        }
        info!("  Update interval: {} ms", poll.scan_interval_ms);
        info!(
            "  Ready timeout: {} ms (poll every {} ms)",
            poll.ready_timeout_ms, poll.ready_poll_interval_ms
        );
        info!(
            "  Outputs: moisture={} temperature={} light={}",
            poll.enabled.moisture, poll.enabled.temperature, poll.enabled.light
        );
        let cal = self.driver.calibration();
        info!(
            "  Calibration: dry={} wet={}",
            cal.moisture_dry, cal.moisture_wet
        );
        for device in &self.devices {
            info!("  Device {} '{}'", device.address(), device.name());
        }
        if self.devices.is_empty() {
            warn!("  No devices found");
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Cycle runner (scheduler delegate)
// ───────────────────────────────────────────────────────────────

/// Bridges the scheduler to the driver and the event sink for one cycle.
struct CycleRunner<'a, B, D, C, S> {
    driver: &'a mut ChirpDriver<B, D>,
    poll: PollConfig,
    clock: &'a C,
    sink: &'a mut S,
}

impl<B, D, C, S> PollDelegate for CycleRunner<'_, B, D, C, S>
where
    B: RegisterBus,
    D: DelayNs,
    C: Clock,
    S: EventSink,
{
    fn on_cycle_started(&mut self, cycle: u64) {
        self.sink.emit(&AppEvent::CycleStarted { cycle });
    }

    fn poll_device(&mut self, device: &DeviceHandle) -> Result<MeasurementResult, DriverError> {
        self.driver.poll(
            device,
            self.poll.enabled,
            self.poll.ready_timeout_ms,
            self.clock,
        )
    }

    fn on_result(&mut self, device: &DeviceHandle, result: &MeasurementResult) {
        for (kind, value) in result.values() {
            self.sink.emit(&AppEvent::Reading(Reading {
                address: device.address(),
                name: device_name(device.name()),
                kind,
                value,
                timestamp_ms: result.timestamp_ms,
            }));
        }
    }

    fn on_missed(&mut self, device: &DeviceHandle, error: DriverError) {
        warn!(
            "chirp '{}' at {}: no reading this cycle ({})",
            device.name(),
            device.address(),
            error
        );
        self.sink.emit(&AppEvent::ReadingMissed {
            address: device.address(),
            error,
        });
    }

    fn on_cycle_finished(&mut self, report: &CycleReport) {
        self.sink.emit(&AppEvent::CycleCompleted {
            cycle: report.cycle,
            polled: report.polled,
            missed: report.missed,
        });
    }
}
