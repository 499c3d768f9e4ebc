//! Fetch-or-reuse resolution of snapshot keys
//!
//! `CacheResolver` decides, per key, whether the stored snapshot can be served or
//! the upstream API has to be asked. Snapshots never expire: once a key has been
//! written it is served from the store forever.
//!
//! A miss is handled under the key's lock from [`KeyedLocks`], and the store is
//! read again after the lock is taken. Concurrent requests for the same unseen
//! key therefore cause exactly one upstream fetch; the others find the snapshot
//! the first one wrote.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::{KeyedLocks, SnapshotKey, SnapshotKind, SnapshotStore, StoreError};
use crate::data::{AirportDaySet, ArrivalsInfo, DeparturesInfo, FlightSource, SourceError};

/// Default upper bound on one upstream fetch
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur when resolving a snapshot key
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The upstream API failed or answered with a non-200 status
    #[error("fetching {key} failed: {source}")]
    FetchFailed {
        key: SnapshotKey,
        #[source]
        source: SourceError,
    },

    /// The store could not be read for a reason other than absence
    #[error("snapshot store unavailable for {key}: {source}")]
    StoreUnavailable {
        key: SnapshotKey,
        #[source]
        source: StoreError,
    },

    /// A stored snapshot exists but does not parse
    #[error("corrupt snapshot for {key}: {source}")]
    CorruptSnapshot {
        key: SnapshotKey,
        #[source]
        source: serde_json::Error,
    },
}

/// How a resolved set was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Served from an existing snapshot
    Snapshot,
    /// Fetched from the upstream API during this call
    Fetched,
}

/// Result of a successful resolve
#[derive(Debug)]
pub struct Resolved<T> {
    pub set: T,
    pub origin: Origin,
    /// Set when a fetched set could not be persisted; the set is still valid
    pub persist_error: Option<StoreError>,
}

impl<T> Resolved<T> {
    fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolved<U> {
        Resolved {
            set: f(self.set),
            origin: self.origin,
            persist_error: self.persist_error,
        }
    }
}

/// Returns stored snapshots, fetching and persisting them on a miss
pub struct CacheResolver {
    store: Arc<dyn SnapshotStore>,
    source: Arc<dyn FlightSource>,
    locks: KeyedLocks,
    fetch_timeout: Duration,
    fetches: AtomicU64,
}

impl CacheResolver {
    /// Creates a resolver over the given store and upstream source
    pub fn new(store: Arc<dyn SnapshotStore>, source: Arc<dyn FlightSource>) -> Self {
        Self {
            store,
            source,
            locks: KeyedLocks::new(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            fetches: AtomicU64::new(0),
        }
    }

    /// Overrides the upstream fetch timeout
    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    /// Number of upstream fetches started by this resolver
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Resolves a key to its flight set
    ///
    /// # Behavior
    /// - Existing snapshot: parsed and returned, upstream is not contacted
    /// - Missing snapshot: fetched under the key lock, written atomically, returned
    /// - Unreadable store or unparsable snapshot (including a zero-byte file):
    ///   error, never treated as a miss
    /// - Failed write after a successful fetch: the set is returned with
    ///   `persist_error` set
    pub async fn resolve(&self, key: &SnapshotKey) -> Result<Resolved<AirportDaySet>, ResolveError> {
        // Check store first
        if let Some(set) = self.load(key).await? {
            debug!(%key, "snapshot hit");
            return Ok(Resolved {
                set,
                origin: Origin::Snapshot,
                persist_error: None,
            });
        }

        let _guard = self.locks.lock(key).await;

        // Whoever held the lock before us may have written it
        if let Some(set) = self.load(key).await? {
            debug!(%key, "snapshot written by concurrent request");
            return Ok(Resolved {
                set,
                origin: Origin::Snapshot,
                persist_error: None,
            });
        }

        let set = self.fetch(key).await?;
        let persist_error = self.persist(key, &set).await.err();

        Ok(Resolved {
            set,
            origin: Origin::Fetched,
            persist_error,
        })
    }

    /// Resolves an arrivals snapshot
    ///
    /// The key is treated as an arrivals key whatever kind it was built with.
    pub async fn resolve_arrivals(
        &self,
        key: &SnapshotKey,
    ) -> Result<Resolved<ArrivalsInfo>, ResolveError> {
        let resolved = self.resolve(&key.with_kind(SnapshotKind::Arrivals)).await?;
        Ok(resolved.map(|set| match set {
            AirportDaySet::Arrivals(arrivals) => arrivals,
            AirportDaySet::Departures(_) => unreachable!("arrivals key resolved to departures"),
        }))
    }

    /// Resolves a departures snapshot
    ///
    /// The key is treated as a departures key whatever kind it was built with.
    pub async fn resolve_departures(
        &self,
        key: &SnapshotKey,
    ) -> Result<Resolved<DeparturesInfo>, ResolveError> {
        let resolved = self.resolve(&key.with_kind(SnapshotKind::Departures)).await?;
        Ok(resolved.map(|set| match set {
            AirportDaySet::Departures(departures) => departures,
            AirportDaySet::Arrivals(_) => unreachable!("departures key resolved to arrivals"),
        }))
    }

    /// Reads and parses the snapshot, `None` on a clean miss
    async fn load(&self, key: &SnapshotKey) -> Result<Option<AirportDaySet>, ResolveError> {
        let bytes = match self.store.read(key).await {
            Ok(bytes) => bytes,
            Err(StoreError::NotFound(_)) => return Ok(None),
            Err(source) => {
                return Err(ResolveError::StoreUnavailable {
                    key: key.clone(),
                    source,
                })
            }
        };

        AirportDaySet::from_json(key.kind(), &bytes)
            .map(Some)
            .map_err(|source| ResolveError::CorruptSnapshot {
                key: key.clone(),
                source,
            })
    }

    /// Fetches the set from upstream, bounded by the fetch timeout
    async fn fetch(&self, key: &SnapshotKey) -> Result<AirportDaySet, ResolveError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        info!(%key, "snapshot miss, fetching from upstream");

        let airport = key.airport();
        let date = key.date();
        let fetch = async {
            match key.kind() {
                SnapshotKind::Arrivals => self
                    .source
                    .fetch_arrivals(airport, date)
                    .await
                    .map(AirportDaySet::Arrivals),
                SnapshotKind::Departures => self
                    .source
                    .fetch_departures(airport, date)
                    .await
                    .map(AirportDaySet::Departures),
            }
        };

        let result = match tokio::time::timeout(self.fetch_timeout, fetch).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Timeout(self.fetch_timeout)),
        };

        result.map_err(|source| {
            warn!(%key, error = %source, "upstream fetch failed");
            ResolveError::FetchFailed {
                key: key.clone(),
                source,
            }
        })
    }

    /// Writes a freshly fetched set, logging rather than failing on error
    async fn persist(&self, key: &SnapshotKey, set: &AirportDaySet) -> Result<(), StoreError> {
        let bytes = match set.to_json() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(%key, error = %e, "could not serialize fetched set");
                return Err(StoreError::Io {
                    path: key.file_name().into(),
                    source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
                });
            }
        };

        match self.store.write_atomic(key, &bytes).await {
            Ok(()) => {
                info!(%key, flights = set.flight_count(), "snapshot stored");
                Ok(())
            }
            Err(e) => {
                warn!(%key, error = %e, "snapshot write failed, serving fetched data anyway");
                Err(e)
            }
        }
    }
}
