//! Resource identity and value types tracked by the engine

use serde_json::Value;
use std::fmt;

use shared::{Device, SensorReading};

/// Stable key distinguishing one trackable entity.
///
/// Unique within a session; never reused for a different logical entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKey {
    Device(i64),
    DeviceSensor(i64),
}

impl ResourceKey {
    pub fn id(&self) -> i64 {
        match self {
            ResourceKey::Device(id) => *id,
            ResourceKey::DeviceSensor(id) => *id,
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKey::Device(id) => write!(f, "device:{}", id),
            ResourceKey::DeviceSensor(id) => write!(f, "device-sensor:{}", id),
        }
    }
}

/// Descriptive attributes carried alongside a value
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResourceAttributes {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub unit: Option<String>,
}

/// Latest known value for one resource
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceValue {
    pub key: ResourceKey,
    pub attributes: ResourceAttributes,
    pub value: Value,
    /// Observation instant (Unix millis). Defaults to the time the value was
    /// obtained when the source omits it.
    pub observed_at: Option<i64>,
}

impl ResourceValue {
    /// Build a device row. `has_data` marks devices with at least one sensor.
    pub fn from_device(device: &Device, has_data: bool, obtained_at: i64) -> Self {
        Self {
            key: ResourceKey::Device(device.id),
            attributes: ResourceAttributes {
                name: Some(device.name.clone()),
                kind: Some(device.device_type.clone()),
                unit: None,
            },
            value: serde_json::json!({ "has_data": has_data }),
            observed_at: Some(obtained_at),
        }
    }

    /// Build a reading row from a pull response or bulk push
    pub fn from_reading(reading: &SensorReading, obtained_at: i64) -> Self {
        Self {
            key: ResourceKey::DeviceSensor(reading.device_sensor_id),
            attributes: ResourceAttributes {
                name: None,
                kind: reading.sensor_type.clone(),
                unit: reading.unit.clone(),
            },
            value: serde_json::json!(reading.value),
            observed_at: Some(reading.time_millis().unwrap_or(obtained_at)),
        }
    }

    /// Device activity flag, if this is a device row
    pub fn has_data(&self) -> bool {
        self.value
            .get("has_data")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Numeric reading, if this is a reading row
    pub fn number(&self) -> Option<f64> {
        self.value.as_f64()
    }
}

/// One tracked resource family: the device list, or one device's readings.
///
/// A family supplies its session's push topics, its fallback-timer key, and
/// the key-membership predicate used for bulk merges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceFamily {
    Devices,
    DeviceSensors(i64),
}

impl ResourceFamily {
    /// Push topics this family subscribes to
    pub fn topics(&self) -> Vec<String> {
        match self {
            ResourceFamily::Devices => vec!["devices".to_string()],
            ResourceFamily::DeviceSensors(device_id) => {
                vec![format!("device-id-{}", device_id)]
            }
        }
    }

    /// Fallback timer key for this family
    pub fn timer_key(&self) -> String {
        match self {
            ResourceFamily::Devices => "device-update".to_string(),
            ResourceFamily::DeviceSensors(device_id) => format!("sensor-update-{}", device_id),
        }
    }

    /// Whether a key belongs to this family
    pub fn contains(&self, key: &ResourceKey) -> bool {
        match (self, key) {
            (ResourceFamily::Devices, ResourceKey::Device(_)) => true,
            (ResourceFamily::DeviceSensors(_), ResourceKey::DeviceSensor(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ResourceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceFamily::Devices => write!(f, "devices"),
            ResourceFamily::DeviceSensors(device_id) => write!(f, "device-sensors:{}", device_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display() {
        assert_eq!(ResourceKey::Device(3).to_string(), "device:3");
        assert_eq!(ResourceKey::DeviceSensor(9).to_string(), "device-sensor:9");
    }

    #[test]
    fn test_family_membership() {
        let devices = ResourceFamily::Devices;
        let sensors = ResourceFamily::DeviceSensors(5);

        assert!(devices.contains(&ResourceKey::Device(1)));
        assert!(!devices.contains(&ResourceKey::DeviceSensor(1)));
        assert!(sensors.contains(&ResourceKey::DeviceSensor(1)));
        assert!(!sensors.contains(&ResourceKey::Device(1)));
    }

    #[test]
    fn test_family_topics() {
        assert_eq!(ResourceFamily::Devices.topics(), vec!["devices"]);
        assert_eq!(
            ResourceFamily::DeviceSensors(42).topics(),
            vec!["device-id-42"]
        );
        assert_eq!(
            ResourceFamily::DeviceSensors(42).timer_key(),
            "sensor-update-42"
        );
    }

    #[test]
    fn test_reading_defaults_observed_at_to_obtained_time() {
        let reading = SensorReading {
            device_sensor_id: 1,
            sensor_type: Some("temperature".to_string()),
            unit: Some("C".to_string()),
            value: 21.0,
            time: None,
        };
        let value = ResourceValue::from_reading(&reading, 1_000);
        assert_eq!(value.observed_at, Some(1_000));
        assert_eq!(value.number(), Some(21.0));
    }
}
