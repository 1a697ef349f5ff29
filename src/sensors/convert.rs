//! Raw register values to physical units.
//!
//! Pure functions, no I/O. Moisture uses a two-point linear calibration
//! between the capacitance of the probe in dry air and in water.

use serde::{Deserialize, Serialize};

use super::MeasurementKind;

/// Capacitance counts at 0 % and 100 % moisture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calibration {
    pub moisture_dry: u16,
    pub moisture_wet: u16,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            moisture_dry: 263,
            moisture_wet: 483,
        }
    }
}

/// Convert a raw register value of `kind` to its physical unit.
pub fn convert(raw: u16, kind: MeasurementKind, cal: &Calibration) -> f32 {
    match kind {
        MeasurementKind::Moisture => capacitance_to_percent(raw, cal),
        MeasurementKind::Temperature => raw_to_celsius(raw),
        MeasurementKind::Light => f32::from(raw),
    }
}

/// Linear map onto 0..=100 %, clamped.
pub fn capacitance_to_percent(raw: u16, cal: &Calibration) -> f32 {
    let dry = f32::from(cal.moisture_dry);
    let span = f32::from(cal.moisture_wet) - dry;
    if span <= 0.0 {
        return 0.0;
    }
    ((f32::from(raw) - dry) / span * 100.0).clamp(0.0, 100.0)
}

/// Temperature register holds signed tenths of a degree.
pub fn raw_to_celsius(raw: u16) -> f32 {
    f32::from(raw as i16) / 10.0
}
