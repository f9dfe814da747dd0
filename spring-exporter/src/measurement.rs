//! Measurements produced by a scrape cycle and the sinks that receive them.

use crate::mapping::ValueKind;

/// A single sample handed to a [`MeasurementSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// Fully qualified metric name.
    pub name: String,
    /// Help text. For payload values this is the original, unsanitized key.
    pub help: String,
    /// Sample value.
    pub value: f64,
    /// Kind announced on the `# TYPE` line.
    pub kind: ValueKind,
}

impl Measurement {
    /// Create a gauge measurement.
    pub fn gauge(name: impl Into<String>, help: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            value,
            kind: ValueKind::Gauge,
        }
    }

    /// Create an untyped measurement.
    pub fn untyped(name: impl Into<String>, help: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            value,
            kind: ValueKind::Untyped,
        }
    }
}

/// Consumer of measurements, fed one at a time as the cycle produces them.
pub trait MeasurementSink {
    fn emit(&mut self, measurement: Measurement);
}

impl MeasurementSink for Vec<Measurement> {
    fn emit(&mut self, measurement: Measurement) {
        self.push(measurement);
    }
}
