//! Prometheus text exposition format (version 0.0.4).

use std::fmt::Write;

use crate::measurement::{Measurement, MeasurementSink};

/// Content type served with the exposition.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Sink that renders each measurement as soon as it is emitted.
#[derive(Debug, Default)]
pub struct ExpositionWriter {
    output: String,
    samples: usize,
}

impl ExpositionWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of samples written so far.
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Consume the writer and return the rendered text.
    pub fn finish(self) -> String {
        self.output
    }
}

impl MeasurementSink for ExpositionWriter {
    fn emit(&mut self, m: Measurement) {
        writeln!(self.output, "# HELP {} {}", m.name, escape_help(&m.help)).ok();
        writeln!(self.output, "# TYPE {} {}", m.name, m.kind.as_str()).ok();
        writeln!(self.output, "{} {}", m.name, format_value(m.value)).ok();
        self.samples += 1;
    }
}

/// Escape backslashes and newlines in HELP text.
fn escape_help(help: &str) -> String {
    let mut result = String::with_capacity(help.len());
    for c in help.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

/// Format a floating point value for Prometheus.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}
