//! Cache-aside adapter over the shared key-value store.
//!
//! All cache and idempotency traffic goes through [`CacheStore`]. Store
//! failures never escape this module: reads degrade to a miss, writes are
//! swallowed and logged, and idempotency claims degrade to always-run. Every
//! Redis round-trip is bounded by the configured operation timeout so a slow
//! store cannot stall the request path.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use deadpool_redis::Pool;
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// An entry in the in-process store mode, with TTL support.
#[derive(Clone, Debug)]
pub struct StoredEntry {
    pub data: Vec<u8>,
    pub stored_at: Instant,
    pub ttl: Duration,
}

impl StoredEntry {
    pub fn new(data: Vec<u8>, ttl: Duration) -> Self {
        Self {
            data,
            stored_at: Instant::now(),
            ttl,
        }
    }

    /// Check if this entry has expired.
    pub fn is_expired(&self) -> bool {
        self.stored_at.elapsed() > self.ttl
    }
}

/// Store backend modes.
///
/// - **Memory**: per-instance DashMap; stands in for the shared store in
///   tests and single-instance deployments.
/// - **Redis**: the shared store for multi-instance deployments.
#[derive(Clone)]
pub enum StoreBackend {
    Memory(Arc<DashMap<String, StoredEntry>>),
    Redis {
        pool: Pool,
        /// Bound on each store round-trip.
        op_timeout: Duration,
    },
}

/// Store statistics for health/debug endpoints.
#[derive(Debug, Clone)]
pub struct StoreStats {
    pub entries: Option<usize>,
    pub mode: &'static str,
    pub cache_enabled: bool,
}

/// Typed get/set/delete plus atomic set-if-absent against the shared store.
///
/// The cache toggle is read once at construction. When off, `get`/`set`/
/// `delete` are no-ops and the system behaves as if no cache existed;
/// `set_if_absent` is unaffected because idempotency claims are not a cache.
#[derive(Clone)]
pub struct CacheStore {
    backend: StoreBackend,
    cache_enabled: bool,
}

impl CacheStore {
    /// Create a store in the in-process memory mode.
    pub fn memory(cache_enabled: bool) -> Self {
        Self {
            backend: StoreBackend::Memory(Arc::new(DashMap::new())),
            cache_enabled,
        }
    }

    /// Create a store backed by a Redis pool.
    pub fn redis(pool: Pool, op_timeout: Duration, cache_enabled: bool) -> Self {
        Self {
            backend: StoreBackend::Redis { pool, op_timeout },
            cache_enabled,
        }
    }

    /// Get a value from the store.
    ///
    /// Fails soft: an unreachable store or a timed-out call is a miss, so
    /// the read path never depends on store availability.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        if !self.cache_enabled {
            return None;
        }
        match &self.backend {
            StoreBackend::Memory(map) => {
                if let Some(entry) = map.get(key) {
                    if !entry.is_expired() {
                        tracing::debug!(key = %key, "cache hit");
                        return Some(entry.data.clone());
                    }
                    drop(entry);
                    map.remove(key);
                }
                tracing::debug!(key = %key, "cache miss");
                None
            }
            StoreBackend::Redis { pool, op_timeout } => {
                let op = async {
                    let mut conn = pool.get().await.map_err(|e| e.to_string())?;
                    conn.get::<_, Option<Vec<u8>>>(key)
                        .await
                        .map_err(|e| e.to_string())
                };
                match tokio::time::timeout(*op_timeout, op).await {
                    Ok(Ok(Some(data))) => {
                        tracing::debug!(key = %key, "cache hit");
                        Some(data)
                    }
                    Ok(Ok(None)) => {
                        tracing::debug!(key = %key, "cache miss");
                        None
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(key = %key, error = %e, "store GET failed, treating as miss");
                        None
                    }
                    Err(_) => {
                        tracing::warn!(key = %key, "store GET timed out, treating as miss");
                        None
                    }
                }
            }
        }
    }

    /// Set a value with TTL.
    ///
    /// Fails soft: the write is an optimization only, failures are logged
    /// and swallowed.
    pub async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        if !self.cache_enabled {
            return;
        }
        match &self.backend {
            StoreBackend::Memory(map) => {
                map.insert(key.to_string(), StoredEntry::new(value, ttl));
            }
            StoreBackend::Redis { pool, op_timeout } => {
                let ttl_secs = ttl.as_secs().max(1);
                let op = async {
                    let mut conn = pool.get().await.map_err(|e| e.to_string())?;
                    conn.set_ex::<_, _, ()>(key, &value, ttl_secs)
                        .await
                        .map_err(|e| e.to_string())
                };
                match tokio::time::timeout(*op_timeout, op).await {
                    Ok(Ok(())) => {
                        tracing::debug!(key = %key, ttl_secs = %ttl_secs, "cache set");
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(key = %key, error = %e, "store SET failed, entry dropped");
                    }
                    Err(_) => {
                        tracing::warn!(key = %key, "store SET timed out, entry dropped");
                    }
                }
            }
        }
    }

    /// Delete a key.
    ///
    /// Fails soft but a failed delete is logged at error level: a missed
    /// invalidation risks serving stale data until the entry's TTL expires.
    pub async fn delete(&self, key: &str) {
        if !self.cache_enabled {
            return;
        }
        match &self.backend {
            StoreBackend::Memory(map) => {
                map.remove(key);
                tracing::debug!(key = %key, "cache invalidated");
            }
            StoreBackend::Redis { pool, op_timeout } => {
                let op = async {
                    let mut conn = pool.get().await.map_err(|e| e.to_string())?;
                    conn.del::<_, ()>(key).await.map_err(|e| e.to_string())
                };
                match tokio::time::timeout(*op_timeout, op).await {
                    Ok(Ok(())) => {
                        tracing::debug!(key = %key, "cache invalidated");
                    }
                    Ok(Err(e)) => {
                        tracing::error!(key = %key, error = %e, "store DEL failed, stale entry may be served until TTL");
                    }
                    Err(_) => {
                        tracing::error!(key = %key, "store DEL timed out, stale entry may be served until TTL");
                    }
                }
            }
        }
    }

    /// Atomic conditional create with TTL. Returns `true` iff this call
    /// created the key, i.e. this caller won the race.
    ///
    /// On Redis this is a single `SET key value NX EX ttl`; concurrent
    /// callers across processes are totally ordered by the store. On store
    /// failure the call returns `true`: idempotency degrades to always-run
    /// rather than silently dropping work.
    ///
    /// Unlike get/set/delete this ignores the cache toggle; claims are a
    /// correctness mechanism, not a cache.
    pub async fn set_if_absent(&self, key: &str, value: Vec<u8>, ttl: Duration) -> bool {
        match &self.backend {
            StoreBackend::Memory(map) => match map.entry(key.to_string()) {
                Entry::Occupied(mut occupied) => {
                    if occupied.get().is_expired() {
                        occupied.insert(StoredEntry::new(value, ttl));
                        true
                    } else {
                        false
                    }
                }
                Entry::Vacant(vacant) => {
                    vacant.insert(StoredEntry::new(value, ttl));
                    true
                }
            },
            StoreBackend::Redis { pool, op_timeout } => {
                let ttl_secs = ttl.as_secs().max(1);
                let op = async {
                    let mut conn = pool.get().await.map_err(|e| e.to_string())?;
                    redis::cmd("SET")
                        .arg(key)
                        .arg(&value)
                        .arg("NX")
                        .arg("EX")
                        .arg(ttl_secs)
                        .query_async::<Option<String>>(&mut conn)
                        .await
                        .map_err(|e| e.to_string())
                };
                match tokio::time::timeout(*op_timeout, op).await {
                    Ok(Ok(reply)) => reply.is_some(),
                    Ok(Err(e)) => {
                        tracing::warn!(key = %key, error = %e, "store SETNX failed, degrading to always-run");
                        true
                    }
                    Err(_) => {
                        tracing::warn!(key = %key, "store SETNX timed out, degrading to always-run");
                        true
                    }
                }
            }
        }
    }

    /// Check if the backing store is reachable (for readiness checks).
    pub async fn is_available(&self) -> bool {
        match &self.backend {
            StoreBackend::Memory(_) => true,
            StoreBackend::Redis { pool, op_timeout } => {
                matches!(tokio::time::timeout(*op_timeout, pool.get()).await, Ok(Ok(_)))
            }
        }
    }

    /// Store statistics.
    pub fn stats(&self) -> StoreStats {
        match &self.backend {
            StoreBackend::Memory(map) => StoreStats {
                entries: Some(map.len()),
                mode: "memory",
                cache_enabled: self.cache_enabled,
            },
            StoreBackend::Redis { .. } => StoreStats {
                entries: None,
                mode: "redis",
                cache_enabled: self.cache_enabled,
            },
        }
    }
}
