//! Data models
//!
//! Shared between the sync engine and the view layer (via API).
//! All IDs are `i64` (the data source hands out integer primary keys).

pub mod device;
pub mod sensor;

// Re-exports
pub use device::*;
pub use sensor::*;
