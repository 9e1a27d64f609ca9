//! Sensor and reading models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sensor attached to a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub id: i64,
    pub device_id: i64,
    #[serde(rename = "type")]
    pub sensor_type: String,
    pub unit: Option<String>,
}

/// Latest reading for one device sensor
///
/// `time` is the instant the reading was observed at the source. Bulk list
/// responses may omit it; consumers fall back to the time the record was
/// obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub device_sensor_id: i64,
    #[serde(rename = "type")]
    pub sensor_type: Option<String>,
    pub unit: Option<String>,
    pub value: f64,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
}

impl SensorReading {
    /// Observation instant in Unix millis, if the source reported one
    pub fn time_millis(&self) -> Option<i64> {
        self.time.map(|t| t.timestamp_millis())
    }
}
