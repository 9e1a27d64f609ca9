//! Shared types for the sensor dashboard
//!
//! Domain records (devices, sensors, readings) and push-channel wire types,
//! shared between the sync engine and any embedding application.

pub mod message;
pub mod models;
pub mod util;

pub use models::{Device, Sensor, SensorReading};
