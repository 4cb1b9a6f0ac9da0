//! Snapshot cache
//!
//! Short-lived read-through cache over the REST markets endpoint. Payloads
//! are stored compressed through [`crate::codec`] in a small key/value store.

mod snapshot;
mod store;

pub use snapshot::{SnapshotCache, SnapshotOrigin, DEFAULT_FRESHNESS};
pub use store::{
    CacheEntry, CacheStore, Clock, FileStore, ManualClock, MemoryStore, StoreError, SystemClock,
};
