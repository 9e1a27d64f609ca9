//! Sync Client - hybrid push/pull synchronization engine
//!
//! Keeps an in-memory table of devices and their latest sensor readings
//! current from two sources: a streaming push channel for near-real-time
//! updates, and a timer-based fallback pull that guarantees eventual
//! consistency when events are dropped, delayed, or never sent.

pub mod api;
pub mod config;
pub mod error;
pub mod message;
pub mod sync;

pub use api::{DataSource, HttpClient};
pub use config::{LogLevel, SyncConfig};
pub use error::{SyncError, SyncResult};
pub use message::{EventClient, ResourceUpdateEvent};
pub use sync::{
    FallbackScheduler, ResourceFamily, ResourceKey, ResourceStore, ResourceValue, SessionState,
    SubscriptionManager, SyncSession,
};
