//! Poll scheduler.
//!
//! Decides *when* a poll cycle runs and walks the device list in order.
//! *What* happens per device is delegated to a [`PollDelegate`], so the
//! scheduler knows nothing about registers, conversion or publishing.
//!
//! ```text
//!          tick(now) ── not due ──▶ (nothing)
//!              │
//!             due
//!              ▼
//!   Idle ──▶ Polling(0) ──▶ Polling(1) ──▶ … ──▶ Polling(n-1) ──▶ Idle
//!              │                 │                    │
//!              ▼                 ▼                    ▼
//!        poll_device ─ ok ──▶ on_result      err ──▶ on_missed
//! ```
//!
//! A cycle always runs to completion inside one `tick` call, so cycles can
//! never overlap.  The next cycle is due one interval after the previous
//! one *started*, or immediately after it finished if it overran.

use log::{debug, warn};

use crate::app::ports::{Clock, PollDelegate};
use crate::sensors::DeviceHandle;

// ═══════════════════════════════════════════════════════════════
//  State
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    /// Working on the device at this index of the device list.
    Polling(usize),
}

/// Outcome of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// 1-based cycle number.
    pub cycle: u64,
    /// Devices that produced a result.
    pub polled: usize,
    /// Devices that produced no reading.
    pub missed: usize,
    pub started_ms: u64,
    pub finished_ms: u64,
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

pub struct PollScheduler {
    interval_ms: u64,
    /// `None` until the first cycle: the first tick polls immediately.
    next_due_ms: Option<u64>,
    state: PollState,
    cycles: u64,
}

impl PollScheduler {
    pub fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms: u64::from(interval_ms),
            next_due_ms: None,
            state: PollState::Idle,
            cycles: 0,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    /// Completed cycles since setup.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn next_due_ms(&self) -> Option<u64> {
        self.next_due_ms
    }

    /// Make the next `tick` run a cycle regardless of the interval.
    pub fn expedite(&mut self) {
        self.next_due_ms = None;
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        self.next_due_ms.is_none_or(|due| now_ms >= due)
    }

    /// Run a cycle if one is due.  Call as often as convenient.
    pub fn tick(
        &mut self,
        clock: &impl Clock,
        devices: &[DeviceHandle],
        delegate: &mut impl PollDelegate,
    ) -> Option<CycleReport> {
        if !self.is_due(clock.uptime_ms()) {
            return None;
        }
        Some(self.run_cycle(clock, devices, delegate))
    }

    /// Run a cycle now, regardless of the interval.
    pub fn run_cycle(
        &mut self,
        clock: &impl Clock,
        devices: &[DeviceHandle],
        delegate: &mut impl PollDelegate,
    ) -> CycleReport {
        let started_ms = clock.uptime_ms();
        let cycle = self.cycles + 1;
        let mut polled = 0;
        let mut missed = 0;

        delegate.on_cycle_started(cycle);
        for (index, device) in devices.iter().enumerate() {
            self.state = PollState::Polling(index);
            match delegate.poll_device(device) {
                Ok(result) => {
                    delegate.on_result(device, &result);
                    polled += 1;
                }
                Err(e) => {
                    delegate.on_missed(device, e);
                    missed += 1;
                }
            }
        }
        self.state = PollState::Idle;

        let finished_ms = clock.uptime_ms();
        let planned = started_ms + self.interval_ms;
        if finished_ms > planned {
            warn!(
                "scheduler: cycle {} took {} ms, longer than the {} ms interval",
                cycle,
                finished_ms - started_ms,
                self.interval_ms
            );
        }
        self.next_due_ms = Some(planned.max(finished_ms));
        self.cycles = cycle;

        debug!(
            "scheduler: cycle {} done ({} ok, {} missed) in {} ms",
            cycle,
            polled,
            missed,
            finished_ms - started_ms
        );

        let report = CycleReport {
            cycle,
            polled,
            missed,
            started_ms,
            finished_ms,
        };
        delegate.on_cycle_finished(&report);
        report
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
