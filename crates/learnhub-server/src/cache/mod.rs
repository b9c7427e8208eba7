//! Cache layer over the shared key-value store.
//!
//! ## Architecture
//!
//! - [`store::CacheStore`]: typed get/set/delete plus atomic set-if-absent,
//!   fail-soft against store outages, bounded per-operation timeouts.
//! - [`course::CourseCache`]: cache-aside policy for the course read paths
//!   (detail and public list) and the write-triggered invalidation fan-out.
//!
//! ## Graceful Degradation
//!
//! If the store is unreachable or disabled, reads fall back to the source of
//! truth and writes are skipped; no request ever fails because of the cache.

pub mod course;
pub mod store;

pub use course::CourseCache;
pub use store::{CacheStore, StoreBackend, StoreStats, StoredEntry};
