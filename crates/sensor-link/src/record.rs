use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One decoded, timestamped sensor sample.
///
/// The timestamp is injected at decode time (host clock, epoch seconds),
/// not reported by the sensor itself. Records are immutable once built and
/// owned by the rolling buffer they are pushed into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorRecord {
    pub timestamp: f64,
    pub fields: HashMap<String, f64>,
}

impl SensorRecord {
    pub fn new(timestamp: f64, fields: HashMap<String, f64>) -> Self {
        Self { timestamp, fields }
    }

    /// Value of a named field, if the sensor reported it in this sample.
    pub fn get(&self, field: &str) -> Option<f64> {
        self.fields.get(field).copied()
    }
}
