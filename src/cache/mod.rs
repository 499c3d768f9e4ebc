//! Snapshot cache for flight sets
//!
//! This module persists each (kind, airport, date) flight set as one JSON file and
//! decides whether a request can be served from that file or has to go upstream.
//! The cache has no TTL and no eviction: a snapshot is written once, on the first
//! miss for its key, and is never updated or deleted afterwards.

mod key;
mod locks;
mod resolver;
mod store;

pub use key::{check_airport, KeyError, SnapshotKey, SnapshotKind};
pub use locks::{KeyGuard, KeyedLocks};
pub use resolver::{CacheResolver, Origin, ResolveError, Resolved, DEFAULT_FETCH_TIMEOUT};
pub use store::{DiskStore, MemoryStore, SnapshotStore, StoreError, DEFAULT_DATA_DIR};
