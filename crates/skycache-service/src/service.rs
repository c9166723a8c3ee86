//! The weather cache orchestrator.
//!
//! Read path: log store lookup, then blob load. Any failure on the read path
//! is a cache miss. Write path: provider fetch, blob put, log insert.

use skycache_core::{IndexWriteFailure, StorageError};
use skycache_store::{BlobStore, CacheLogEntry, LogStore};
use skycache_weather::{WeatherProvider, WeatherQuery, WeatherRecord};
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

use crate::error::ServiceResult;
use crate::policy::{storage_path, CachePolicy, Clock, SystemClock};

/// Why the cache could not answer a request.
#[derive(Debug, Error)]
pub enum CacheMissReason {
    #[error("no fresh log entry")]
    NoEntry,

    #[error("log store lookup failed: {0}")]
    IndexUnavailable(StorageError),

    #[error("blob '{0}' is missing")]
    BlobMissing(String),

    #[error("blob load failed: {0}")]
    BlobUnreadable(StorageError),

    #[error("blob '{key}' is not a weather record: {message}")]
    Malformed { key: String, message: String },
}

/// Answers weather requests from the two-tier cache, falling back to the
/// provider and writing fresh results through to both tiers.
pub struct WeatherCacheService {
    provider: Arc<dyn WeatherProvider>,
    blobs: Arc<dyn BlobStore>,
    logs: Arc<dyn LogStore>,
    policy: CachePolicy,
    clock: Arc<dyn Clock>,
}

impl WeatherCacheService {
    pub fn new(
        provider: Arc<dyn WeatherProvider>,
        blobs: Arc<dyn BlobStore>,
        logs: Arc<dyn LogStore>,
        policy: CachePolicy,
    ) -> Self {
        Self {
            provider,
            blobs,
            logs,
            policy,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Current weather for `city`, from cache when fresh.
    ///
    /// # Errors
    /// `ServiceError::Validation` for a blank city, `ServiceError::Provider`
    /// when nothing usable is cached and the provider fails,
    /// `ServiceError::Storage` when fresh data cannot be written.
    #[instrument(skip(self), level = "info")]
    pub async fn get_weather(&self, city: &str) -> ServiceResult<WeatherRecord> {
        let query = WeatherQuery::parse(city)?;
        self.get_weather_for(&query).await
    }

    /// Same as [`get_weather`](Self::get_weather) for an already-normalized query.
    pub async fn get_weather_for(&self, query: &WeatherQuery) -> ServiceResult<WeatherRecord> {
        match self.try_load_from_cache(query).await {
            Ok(record) => {
                tracing::debug!("Cache hit for '{}'", query);
                return Ok(record);
            }
            Err(CacheMissReason::NoEntry) => {
                tracing::debug!("Cache miss for '{}'", query);
            }
            Err(reason) => {
                tracing::warn!("Cache load failed for '{}': {}", query, reason);
            }
        }

        self.fetch_and_store(query).await
    }

    async fn try_load_from_cache(
        &self,
        query: &WeatherQuery,
    ) -> Result<WeatherRecord, CacheMissReason> {
        let now = self.clock.now();

        let entry = self
            .logs
            .find_latest(query.as_str(), self.policy.cutoff(now))
            .await
            .map_err(CacheMissReason::IndexUnavailable)?
            .filter(|entry| self.policy.is_fresh(entry.created_at, now))
            .ok_or(CacheMissReason::NoEntry)?;

        let document = self.blobs.get(&entry.storage_path).await.map_err(|e| {
            if e.is_not_found() {
                CacheMissReason::BlobMissing(entry.storage_path.clone())
            } else {
                CacheMissReason::BlobUnreadable(e)
            }
        })?;

        WeatherRecord::from_document(document).map_err(|e| CacheMissReason::Malformed {
            key: entry.storage_path.clone(),
            message: e.to_string(),
        })
    }

    async fn fetch_and_store(&self, query: &WeatherQuery) -> ServiceResult<WeatherRecord> {
        let record = self.provider.fetch(query).await?;

        let timestamp = self.clock.now();
        let storage_path = storage_path(query, timestamp);

        let document = record
            .to_document()
            .map_err(|e| StorageError::malformed(&storage_path, e.to_string()))?;
        self.blobs.put(&storage_path, &document).await?;

        let entry = CacheLogEntry {
            city: query.to_string(),
            created_at: timestamp,
            storage_path,
        };

        if let Err(e) = self.logs.insert(&entry).await {
            match self.policy.index_write_failure {
                IndexWriteFailure::Tolerate => {
                    tracing::error!(
                        "Log write failed for '{}', blob '{}' is orphaned: {}",
                        entry.city,
                        entry.storage_path,
                        e
                    );
                }
                IndexWriteFailure::Fail => {
                    tracing::error!("Log write failed for '{}': {}", entry.city, e);
                    return Err(e.into());
                }
            }
        } else {
            tracing::info!("Cached weather for '{}' at {}", entry.city, entry.storage_path);
        }

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::policy::ManualClock;
    use async_trait::async_trait;
    use skycache_core::ProviderError;
    use skycache_store::{MemoryBlobStore, MemoryLogStore};

    struct EchoProvider;

    #[async_trait]
    impl WeatherProvider for EchoProvider {
        async fn fetch(&self, query: &WeatherQuery) -> Result<WeatherRecord, ProviderError> {
            Ok(WeatherRecord {
                city: query.to_string(),
                country: "XX".to_string(),
                temperature: 1.0,
                feels_like: 0.5,
                description: "clear sky".to_string(),
                humidity: 10,
                pressure: 1000,
                wind_speed: 2.0,
                clouds: 0,
            })
        }
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let logs = Arc::new(MemoryLogStore::new());
        let clock = Arc::new(ManualClock::new(1_000));
        let service = WeatherCacheService::new(
            Arc::new(EchoProvider),
            blobs.clone(),
            logs.clone(),
            CachePolicy::new(5),
        )
        .with_clock(clock.clone());

        let first = service.get_weather("Lima").await.unwrap();
        clock.advance(60);
        let second = service.get_weather(" LIMA ").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(logs.len(), 1);
        assert_eq!(blobs.keys(), vec!["lima_1000.json".to_string()]);
    }

    #[tokio::test]
    async fn test_blank_city_is_validation_error() {
        let service = WeatherCacheService::new(
            Arc::new(EchoProvider),
            Arc::new(MemoryBlobStore::new()),
            Arc::new(MemoryLogStore::new()),
            CachePolicy::new(5),
        );

        let err = service.get_weather("   ").await.unwrap_err();
        assert!(matches!(err, crate::ServiceError::Validation(_)));
    }

    #[test]
    fn test_miss_reason_display() {
        let reason = CacheMissReason::BlobMissing("tokyo_1.json".to_string());
        assert_eq!(reason.to_string(), "blob 'tokyo_1.json' is missing");
    }
}
