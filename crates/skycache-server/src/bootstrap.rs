//! Composition root: concrete backends from `Config`.

use anyhow::{Context, Result};
use skycache_core::{BlobBackend, Config, LogBackend, StorageConfig};
use skycache_service::{CachePolicy, WeatherCacheService};
use skycache_store::{
    BlobStore, FsBlobStore, LogStore, MemoryBlobStore, MemoryLogStore, SqliteLogStore,
};
use skycache_weather::OpenWeatherMapClient;
use std::sync::Arc;

/// Build the blob backend, creating the bucket directory if needed.
pub async fn build_blob_store(storage: &StorageConfig) -> Result<Arc<dyn BlobStore>> {
    match storage.blob_backend {
        BlobBackend::Filesystem => {
            let store = FsBlobStore::open(&storage.blob_root, &storage.region, &storage.bucket)
                .await
                .context("failed to prepare blob bucket")?;
            Ok(Arc::new(store))
        }
        BlobBackend::Memory => {
            tracing::warn!("Using in-memory blob store, cached data will not survive restarts");
            Ok(Arc::new(MemoryBlobStore::new()))
        }
    }
}

/// Build the log backend, creating the log table if needed.
pub async fn build_log_store(storage: &StorageConfig) -> Result<Arc<dyn LogStore>> {
    match storage.log_backend {
        LogBackend::Sqlite => {
            let path = storage.log_db_path.clone();
            let table = storage.log_table.clone();
            let store = tokio::task::spawn_blocking(move || SqliteLogStore::open(&path, &table))
                .await
                .context("log store setup task failed")?
                .with_context(|| {
                    format!("failed to open log store at {}", storage.log_db_path.display())
                })?;
            Ok(Arc::new(store))
        }
        LogBackend::Memory => {
            tracing::warn!("Using in-memory log store, cached data will not survive restarts");
            Ok(Arc::new(MemoryLogStore::new()))
        }
    }
}

/// Wire provider, stores and policy into a ready service.
pub async fn build_service(config: &Config) -> Result<WeatherCacheService> {
    let provider = OpenWeatherMapClient::new(&config.provider)
        .context("failed to build weather provider client")?;
    let blobs = build_blob_store(&config.storage).await?;
    let logs = build_log_store(&config.storage).await?;
    let policy = CachePolicy::from_config(&config.cache);

    tracing::info!(
        blob_backend = ?config.storage.blob_backend,
        log_backend = ?config.storage.log_backend,
        ttl_minutes = config.cache.ttl_minutes,
        "Weather cache service ready"
    );

    Ok(WeatherCacheService::new(Arc::new(provider), blobs, logs, policy))
}
