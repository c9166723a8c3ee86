//! Filesystem-backed blob store.
//!
//! Documents live under `<root>/<region>/<bucket>/`, one file per key.

use async_trait::async_trait;
use skycache_core::StorageError;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::blob::{decode_document, encode_document, BlobStore};
use crate::StoreResult;

/// Blob store writing one JSON file per key inside a bucket directory.
#[derive(Debug)]
pub struct FsBlobStore {
    bucket_dir: PathBuf,
    write_seq: AtomicU64,
}

impl FsBlobStore {
    pub fn new<P: AsRef<Path>>(root: P, region: &str, bucket: &str) -> Self {
        Self {
            bucket_dir: root.as_ref().join(region).join(bucket),
            write_seq: AtomicU64::new(0),
        }
    }

    /// Open the store, creating the bucket directory if it is absent.
    ///
    /// # Errors
    /// `StorageError::Backend` if the directory cannot be created.
    pub async fn open<P: AsRef<Path>>(root: P, region: &str, bucket: &str) -> StoreResult<Self> {
        let store = Self::new(root, region, bucket);
        store.ensure_bucket().await?;
        Ok(store)
    }

    pub async fn ensure_bucket(&self) -> StoreResult<()> {
        tokio::fs::create_dir_all(&self.bucket_dir)
            .await
            .map_err(|e| StorageError::backend(format!("{}: {}", self.bucket_dir.display(), e)))?;
        tracing::info!("Blob bucket ready at {}", self.bucket_dir.display());
        Ok(())
    }

    pub fn bucket_dir(&self) -> &Path {
        &self.bucket_dir
    }

    fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        Ok(self.bucket_dir.join(encode_key(key)?))
    }
}

/// Map an opaque key to a single file name inside the bucket.
///
/// The key is percent-encoded, then a leading `.` is escaped so names never
/// resolve to `.`/`..` or collide with temp files.
fn encode_key(key: &str) -> StoreResult<String> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key must not be empty".into()));
    }

    let encoded = urlencoding::encode(key);
    match encoded.strip_prefix('.') {
        Some(rest) => Ok(format!("%2E{}", rest)),
        None => Ok(encoded.into_owned()),
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, document: &serde_json::Value) -> StoreResult<()> {
        let bytes = encode_document(key, document)?;
        let file_name = encode_key(key)?;
        let path = self.bucket_dir.join(&file_name);
        let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
        let tmp = self
            .bucket_dir
            .join(format!(".{}.{}.{}.tmp", file_name, std::process::id(), seq));

        if let Err(e) = tokio::fs::write(&tmp, &bytes).await {
            tracing::error!("Upload failed for key '{}': {}", key, e);
            return Err(StorageError::backend(format!("{}: {}", key, e)));
        }

        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            tracing::error!("Upload failed for key '{}': {}", key, e);
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StorageError::backend(format!("{}: {}", key, e)));
        }

        tracing::info!("Uploaded JSON to {}", path.display());
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<serde_json::Value> {
        let path = self.path_for(key)?;
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            let err = StorageError::from_io(key, e);
            if !err.is_not_found() {
                tracing::error!("Download failed for key '{}': {}", key, err);
            }
            err
        })?;

        tracing::debug!("Downloaded JSON from {}", path.display());
        decode_document(key, &bytes)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_key_plain() {
        assert_eq!(encode_key("tokyo_1700000000.json").unwrap(), "tokyo_1700000000.json");
        assert_eq!(encode_key("münchen_1.json").unwrap(), "m%C3%BCnchen_1.json");
    }

    #[test]
    fn test_encode_key_escapes_traversal() {
        assert_eq!(encode_key("../etc/passwd").unwrap(), "%2E.%2Fetc%2Fpasswd");
        assert_eq!(encode_key("..").unwrap(), "%2E.");
        assert_eq!(encode_key(".").unwrap(), "%2E");
        assert_eq!(encode_key(".hidden").unwrap(), "%2Ehidden");
        assert_eq!(encode_key("a%2Fb").unwrap(), "a%252Fb");
        assert_eq!(encode_key("a\\b").unwrap(), "a%5Cb");
        assert!(encode_key("").is_err());
    }

    #[tokio::test]
    async fn test_open_creates_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path(), "eu-west-1", "weather").await.unwrap();
        assert!(store.bucket_dir().is_dir());
        assert!(store.bucket_dir().ends_with("eu-west-1/weather"));
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path(), "local", "weather").await.unwrap();
        let doc = json!({ "city": "tokyo", "humidity": 64 });

        store.put("tokyo_1.json", &doc).await.unwrap();

        assert!(store.bucket_dir().join("tokyo_1.json").is_file());
        assert_eq!(store.get("tokyo_1.json").await.unwrap(), doc);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path(), "local", "weather").await.unwrap();
        let err = store.get("absent.json").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path(), "local", "weather").await.unwrap();
        std::fs::write(store.bucket_dir().join("bad.json"), b"not json").unwrap();

        let err = store.get("bad.json").await.unwrap_err();
        assert!(matches!(err, StorageError::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_traversal_key_stays_in_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path(), "local", "weather").await.unwrap();

        store.put("../escape.json", &json!({ "x": 1 })).await.unwrap();

        assert!(!dir.path().join("local").join("escape.json").exists());
        assert_eq!(store.get("../escape.json").await.unwrap()["x"], 1);
    }

    #[tokio::test]
    async fn test_put_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path(), "local", "weather").await.unwrap();
        store.put("a.json", &json!({ "v": 1 })).await.unwrap();
        store.put("a.json", &json!({ "v": 2 })).await.unwrap();

        let names: Vec<String> = std::fs::read_dir(store.bucket_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json".to_string()]);
        assert_eq!(store.get("a.json").await.unwrap()["v"], 2);
    }

    #[tokio::test]
    async fn test_missing_bucket_dir_is_backend_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path(), "local", "never-created");
        let err = store.put("a.json", &json!({ "v": 1 })).await.unwrap_err();
        assert!(matches!(err, StorageError::Backend(_)));
    }
}
