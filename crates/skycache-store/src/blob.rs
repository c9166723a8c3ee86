//! Blob store trait and the in-memory backend.

use async_trait::async_trait;
use parking_lot::Mutex;
use skycache_core::StorageError;
use std::collections::HashMap;

use crate::StoreResult;

/// Key to JSON-document store. Whole-document reads and writes only.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `document` under `key`, replacing any previous document.
    ///
    /// # Errors
    /// `StorageError::Malformed` if `document` is not a JSON object,
    /// `StorageError::Backend` on backend failure.
    async fn put(&self, key: &str, document: &serde_json::Value) -> StoreResult<()>;

    /// Load the document stored under `key`.
    ///
    /// # Errors
    /// `StorageError::NotFound` if nothing is stored under `key`,
    /// `StorageError::Malformed` if the stored bytes are not a JSON object.
    async fn get(&self, key: &str) -> StoreResult<serde_json::Value>;
}

/// Serialize a document for storage. Only JSON objects are accepted.
pub(crate) fn encode_document(key: &str, document: &serde_json::Value) -> StoreResult<Vec<u8>> {
    if !document.is_object() {
        return Err(StorageError::malformed(key, "document must be a JSON object"));
    }
    serde_json::to_vec(document).map_err(|e| StorageError::malformed(key, e.to_string()))
}

/// Parse stored bytes back into a JSON object.
pub(crate) fn decode_document(key: &str, bytes: &[u8]) -> StoreResult<serde_json::Value> {
    let document: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| StorageError::malformed(key, e.to_string()))?;
    if !document.is_object() {
        return Err(StorageError::malformed(key, "stored document is not a JSON object"));
    }
    Ok(document)
}

/// Process-local blob store. Keeps serialized bytes so stored content behaves
/// like it would on a real backend.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw bytes without validation.
    pub fn insert_raw(&self, key: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.blobs.lock().insert(key.into(), bytes.into());
    }

    pub fn remove(&self, key: &str) -> bool {
        self.blobs.lock().remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.lock().is_empty()
    }

    /// All stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.blobs.lock().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, document: &serde_json::Value) -> StoreResult<()> {
        let bytes = encode_document(key, document)?;
        self.blobs.lock().insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<serde_json::Value> {
        let bytes = self
            .blobs
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        decode_document(key, &bytes)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_then_get() {
        let store = MemoryBlobStore::new();
        let doc = json!({ "city": "tokyo", "temperature": 18.4 });

        store.put("tokyo_1.json", &doc).await.unwrap();

        assert_eq!(store.get("tokyo_1.json").await.unwrap(), doc);
        assert!(store.contains("tokyo_1.json"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = MemoryBlobStore::new();
        let err = store.get("nope.json").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_put_rejects_non_object() {
        let store = MemoryBlobStore::new();
        let err = store.put("list.json", &json!([1, 2, 3])).await.unwrap_err();
        assert!(matches!(err, StorageError::Malformed { .. }));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_bytes_are_malformed() {
        let store = MemoryBlobStore::new();
        store.insert_raw("bad.json", b"{not json".to_vec());
        let err = store.get("bad.json").await.unwrap_err();
        assert!(matches!(err, StorageError::Malformed { ref key, .. } if key == "bad.json"));
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = MemoryBlobStore::new();
        store.put("k", &json!({ "v": 1 })).await.unwrap();
        store.put("k", &json!({ "v": 2 })).await.unwrap();
        assert_eq!(store.get("k").await.unwrap()["v"], 2);
        assert_eq!(store.keys(), vec!["k".to_string()]);
    }
}
