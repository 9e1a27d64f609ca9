//! Canonical resource-update events
//!
//! The push broker delivers loosely-shaped JSON payloads whose field names
//! drifted across server revisions (`device_id` vs `parentResourceId`,
//! `readings` vs `data`). Everything is normalized into one tagged enum at
//! the transport boundary so the core only ever handles a single canonical
//! shape per event kind.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{SyncError, SyncResult};
use shared::{Device, SensorReading};

// ==================== Event names on the wire ====================

pub const EVENT_DEVICE_CREATED: &str = "device-created";
pub const EVENT_DEVICE_DELETED: &str = "device-deleted";
pub const EVENT_SENSORS_UPDATE: &str = "sensors-update";
pub const EVENT_SENSOR_UPDATE: &str = "sensor-update";

/// A push event after normalization
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceUpdateEvent {
    /// A device appeared
    DeviceCreated(Device),
    /// A device was removed
    DeviceDeleted { id: i64 },
    /// Full set of latest readings for one device
    SensorsBulkUpdate {
        device_id: i64,
        readings: Vec<SensorReading>,
    },
    /// Single-sensor reading update
    SensorUpdate {
        device_sensor_id: i64,
        value: f64,
        time: Option<DateTime<Utc>>,
    },
}

impl ResourceUpdateEvent {
    /// Normalize a named push payload into canonical form.
    ///
    /// Returns `Ok(None)` for event names this client does not track, and
    /// `Err(SyncError::MalformedEvent)` when a known event is missing
    /// required fields. Malformed events never reach the store.
    pub fn normalize(event: &str, data: &Value) -> SyncResult<Option<Self>> {
        match event {
            EVENT_DEVICE_CREATED => {
                let device: Device = serde_json::from_value(data.clone()).map_err(|e| {
                    SyncError::MalformedEvent(format!("{}: {}", EVENT_DEVICE_CREATED, e))
                })?;
                Ok(Some(ResourceUpdateEvent::DeviceCreated(device)))
            }
            EVENT_DEVICE_DELETED => {
                let id = data.get("id").and_then(Value::as_i64).ok_or_else(|| {
                    SyncError::MalformedEvent(format!("{}: missing id", EVENT_DEVICE_DELETED))
                })?;
                Ok(Some(ResourceUpdateEvent::DeviceDeleted { id }))
            }
            EVENT_SENSORS_UPDATE => {
                // Older server revisions used `parentResourceId` and `data`
                let device_id = data
                    .get("device_id")
                    .or_else(|| data.get("parentResourceId"))
                    .and_then(Value::as_i64)
                    .ok_or_else(|| {
                        SyncError::MalformedEvent(format!(
                            "{}: missing device_id",
                            EVENT_SENSORS_UPDATE
                        ))
                    })?;
                let readings_raw = data
                    .get("readings")
                    .or_else(|| data.get("data"))
                    .cloned()
                    .ok_or_else(|| {
                        SyncError::MalformedEvent(format!(
                            "{}: missing readings",
                            EVENT_SENSORS_UPDATE
                        ))
                    })?;
                let readings: Vec<SensorReading> =
                    serde_json::from_value(readings_raw).map_err(|e| {
                        SyncError::MalformedEvent(format!("{}: {}", EVENT_SENSORS_UPDATE, e))
                    })?;
                Ok(Some(ResourceUpdateEvent::SensorsBulkUpdate {
                    device_id,
                    readings,
                }))
            }
            EVENT_SENSOR_UPDATE => {
                let device_sensor_id = data
                    .get("device_sensor_id")
                    .and_then(Value::as_i64)
                    .ok_or_else(|| {
                        SyncError::MalformedEvent(format!(
                            "{}: missing device_sensor_id",
                            EVENT_SENSOR_UPDATE
                        ))
                    })?;
                let value = data.get("value").and_then(Value::as_f64).ok_or_else(|| {
                    SyncError::MalformedEvent(format!("{}: missing value", EVENT_SENSOR_UPDATE))
                })?;
                let time = data
                    .get("time")
                    .and_then(Value::as_str)
                    .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                    .map(|t| t.with_timezone(&Utc));
                Ok(Some(ResourceUpdateEvent::SensorUpdate {
                    device_sensor_id,
                    value,
                    time,
                }))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_device_created() {
        let data = json!({"id": 3, "name": "Greenhouse", "type": "gateway"});
        let event = ResourceUpdateEvent::normalize(EVENT_DEVICE_CREATED, &data)
            .unwrap()
            .unwrap();
        match event {
            ResourceUpdateEvent::DeviceCreated(device) => {
                assert_eq!(device.id, 3);
                assert_eq!(device.name, "Greenhouse");
            }
            other => panic!("Expected DeviceCreated, got {:?}", other),
        }
    }

    #[test]
    fn test_normalize_sensors_update_field_aliases() {
        // Both server generations produce the same canonical event
        let modern = json!({
            "device_id": 5,
            "readings": [{"device_sensor_id": 9, "type": "temp", "unit": "C", "value": 20.5}]
        });
        let legacy = json!({
            "parentResourceId": 5,
            "data": [{"device_sensor_id": 9, "type": "temp", "unit": "C", "value": 20.5}]
        });

        let a = ResourceUpdateEvent::normalize(EVENT_SENSORS_UPDATE, &modern)
            .unwrap()
            .unwrap();
        let b = ResourceUpdateEvent::normalize(EVENT_SENSORS_UPDATE, &legacy)
            .unwrap()
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_normalize_sensor_update_with_time() {
        let data = json!({
            "device_sensor_id": 9,
            "value": 12.0,
            "time": "2026-01-29T10:15:00Z"
        });
        let event = ResourceUpdateEvent::normalize(EVENT_SENSOR_UPDATE, &data)
            .unwrap()
            .unwrap();
        match event {
            ResourceUpdateEvent::SensorUpdate {
                device_sensor_id,
                value,
                time,
            } => {
                assert_eq!(device_sensor_id, 9);
                assert_eq!(value, 12.0);
                assert!(time.is_some());
            }
            other => panic!("Expected SensorUpdate, got {:?}", other),
        }
    }

    #[test]
    fn test_normalize_rejects_missing_required_fields() {
        // sensor-update without device_sensor_id must not become a mutation
        let data = json!({"value": 5});
        let err = ResourceUpdateEvent::normalize(EVENT_SENSOR_UPDATE, &data).unwrap_err();
        assert!(matches!(err, SyncError::MalformedEvent(_)));

        let data = json!({"device_sensor_id": 1});
        let err = ResourceUpdateEvent::normalize(EVENT_SENSOR_UPDATE, &data).unwrap_err();
        assert!(matches!(err, SyncError::MalformedEvent(_)));
    }

    #[test]
    fn test_normalize_ignores_unknown_events() {
        let result = ResourceUpdateEvent::normalize("heartbeat", &json!({})).unwrap();
        assert!(result.is_none());
    }
}
