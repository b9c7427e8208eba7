//! Course read caching.
//!
//! Cache-aside policy for the two hot read paths: course detail and the
//! public course list. Entries are MessagePack-encoded for compact storage.
//!
//! ## Cache Key Format
//!
//! - Detail: `course:{id}` — e.g. `course:42`
//! - Public list: `courses:list` (single reserved key)
//!
//! Both are disjoint from the `task:` idempotency namespace.
//!
//! ## Invalidation
//!
//! Writes never update the cache; they delete the detail and list keys after
//! the repository commit and let the next read repopulate. The list key is
//! deleted regardless of how the list was filtered when populated; this is
//! sound because only the unfiltered public listing is ever cached.

use std::future::Future;
use std::time::Duration;

use learnhub_core::Course;
use learnhub_storage::StorageError;

use super::store::CacheStore;

/// Fixed key for the public course list.
const LIST_KEY: &str = "courses:list";

/// Course read cache.
#[derive(Clone)]
pub struct CourseCache {
    store: CacheStore,
    detail_ttl: Duration,
    list_ttl: Duration,
}

impl CourseCache {
    /// Create a course cache over the given store with the configured TTLs.
    pub fn new(store: CacheStore, detail_ttl: Duration, list_ttl: Duration) -> Self {
        Self {
            store,
            detail_ttl,
            list_ttl,
        }
    }

    /// Generate the cache key for a course.
    #[inline]
    fn detail_key(id: i64) -> String {
        format!("course:{id}")
    }

    /// Read a course through the cache.
    ///
    /// On a miss the loader (source of truth) is called and a found course is
    /// cached. Concurrent misses may each call the loader; duplicate `set`s
    /// are idempotent so this is extra work, not a correctness issue.
    /// Not-found is never cached.
    pub async fn read_detail<F, Fut>(
        &self,
        id: i64,
        loader: F,
    ) -> Result<Option<Course>, StorageError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<Course>, StorageError>>,
    {
        let key = Self::detail_key(id);
        if let Some(data) = self.store.get(&key).await {
            match rmp_serde::from_slice::<Course>(&data) {
                Ok(course) => return Ok(Some(course)),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "failed to decode cached course, dropping entry");
                    self.store.delete(&key).await;
                }
            }
        }

        let loaded = loader().await?;
        if let Some(ref course) = loaded {
            match rmp_serde::to_vec(course) {
                Ok(data) => self.store.set(&key, data, self.detail_ttl).await,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "failed to encode course for cache");
                }
            }
        }
        Ok(loaded)
    }

    /// Read the public course list through the cache.
    ///
    /// Only the anonymous published listing goes through here; role-filtered
    /// listings are never cached because entries are not partitioned by
    /// caller identity and a shared key would leak data across roles.
    pub async fn read_list<F, Fut>(&self, loader: F) -> Result<Vec<Course>, StorageError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Course>, StorageError>>,
    {
        if let Some(data) = self.store.get(LIST_KEY).await {
            match rmp_serde::from_slice::<Vec<Course>>(&data) {
                Ok(courses) => return Ok(courses),
                Err(e) => {
                    tracing::warn!(key = %LIST_KEY, error = %e, "failed to decode cached course list, dropping entry");
                    self.store.delete(LIST_KEY).await;
                }
            }
        }

        let loaded = loader().await?;
        match rmp_serde::to_vec(&loaded) {
            Ok(data) => self.store.set(LIST_KEY, data, self.list_ttl).await,
            Err(e) => {
                tracing::warn!(key = %LIST_KEY, error = %e, "failed to encode course list for cache");
            }
        }
        Ok(loaded)
    }

    /// Invalidate a course after a write.
    ///
    /// Called synchronously after the repository commit and before the
    /// response is returned, so the next read observes fresh data. Deletes
    /// the detail key and the list key.
    pub async fn invalidate(&self, id: i64) {
        self.store.delete(&Self::detail_key(id)).await;
        self.store.delete(LIST_KEY).await;
    }
}
