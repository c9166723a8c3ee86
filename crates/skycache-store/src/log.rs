//! Cache log: the time-indexed record of every successful fetch.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::StoreResult;

/// One successful fetch. Written once, never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheLogEntry {
    /// Normalized city (partition key)
    pub city: String,
    /// Unix seconds of the fetch (sort key)
    pub created_at: i64,
    /// Blob store key holding the `WeatherRecord`
    pub storage_path: String,
}

/// Append-only per-city index over the blob store.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Record a new entry.
    ///
    /// # Errors
    /// `StorageError::Backend` on backend failure.
    async fn insert(&self, entry: &CacheLogEntry) -> StoreResult<()>;

    /// Most recent entry for `city` with `created_at >= cutoff`, if any.
    ///
    /// # Errors
    /// `StorageError::Backend` on backend failure. A miss is `Ok(None)`.
    async fn find_latest(&self, city: &str, cutoff: i64) -> StoreResult<Option<CacheLogEntry>>;
}

/// Process-local log store.
#[derive(Debug, Default)]
pub struct MemoryLogStore {
    entries: Mutex<Vec<CacheLogEntry>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all entries in insertion order.
    pub fn entries(&self) -> Vec<CacheLogEntry> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn insert(&self, entry: &CacheLogEntry) -> StoreResult<()> {
        let mut entries = self.entries.lock();
        // Same (city, created_at) replaces, matching the SQLite backend.
        entries.retain(|e| !(e.city == entry.city && e.created_at == entry.created_at));
        entries.push(entry.clone());
        Ok(())
    }

    async fn find_latest(&self, city: &str, cutoff: i64) -> StoreResult<Option<CacheLogEntry>> {
        Ok(self
            .entries
            .lock()
            .iter()
            .filter(|e| e.city == city && e.created_at >= cutoff)
            .max_by_key(|e| e.created_at)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn entry(city: &str, created_at: i64) -> CacheLogEntry {
        CacheLogEntry {
            city: city.to_string(),
            created_at,
            storage_path: format!("{}_{}.json", city, created_at),
        }
    }

    #[tokio::test]
    async fn test_find_latest_picks_newest_within_cutoff() {
        let store = MemoryLogStore::new();
        store.insert(&entry("tokyo", 100)).await.unwrap();
        store.insert(&entry("tokyo", 300)).await.unwrap();
        store.insert(&entry("tokyo", 200)).await.unwrap();
        store.insert(&entry("paris", 400)).await.unwrap();

        let latest = store.find_latest("tokyo", 150).await.unwrap().unwrap();
        assert_eq!(latest.created_at, 300);
        assert_eq!(latest.storage_path, "tokyo_300.json");
    }

    #[tokio::test]
    async fn test_find_latest_cutoff_is_inclusive() {
        let store = MemoryLogStore::new();
        store.insert(&entry("tokyo", 100)).await.unwrap();

        assert!(store.find_latest("tokyo", 100).await.unwrap().is_some());
        assert!(store.find_latest("tokyo", 101).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_latest_other_city_is_miss() {
        let store = MemoryLogStore::new();
        store.insert(&entry("paris", 100)).await.unwrap();
        assert!(store.find_latest("tokyo", 0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_same_key_replaces() {
        let store = MemoryLogStore::new();
        store.insert(&entry("tokyo", 100)).await.unwrap();
        let mut again = entry("tokyo", 100);
        again.storage_path = "other.json".to_string();
        store.insert(&again).await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.entries()[0].storage_path, "other.json");
    }
}
