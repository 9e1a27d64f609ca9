//! Device Model

use serde::{Deserialize, Serialize};

/// Device entity as returned by the data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub name: String,
    /// Device class, e.g. "thermostat", "gateway"
    #[serde(rename = "type")]
    pub device_type: String,
}
