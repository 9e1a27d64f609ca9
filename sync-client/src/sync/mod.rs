//! Synchronization engine core
//!
//! Leaves first: the staleness clock decides which of two readings is newer;
//! the fallback scheduler keeps one debounced watchdog timer per key; the
//! resource store merges values from pull and push through the staleness
//! clock; the subscription manager tracks topic interest; the sync session
//! orchestrates all of it for one resource family.

pub mod resource;
pub mod scheduler;
pub mod session;
pub mod staleness;
pub mod store;
pub mod subscription;

pub use resource::{ResourceAttributes, ResourceFamily, ResourceKey, ResourceValue};
pub use scheduler::FallbackScheduler;
pub use session::{SessionState, SyncSession};
pub use staleness::is_newer;
pub use store::ResourceStore;
pub use subscription::SubscriptionManager;
