//! Storage backends for the weather cache.
//!
//! Two tiers: a `BlobStore` holding the JSON payloads, and a `LogStore`
//! indexing them by `(city, created_at)`. Each has a persistent backend and
//! an in-memory one.

pub mod blob;
pub mod fs_blob;
pub mod log;
pub mod sqlite_log;

pub use blob::{BlobStore, MemoryBlobStore};
pub use fs_blob::FsBlobStore;
pub use log::{CacheLogEntry, LogStore, MemoryLogStore};
pub use sqlite_log::SqliteLogStore;

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, skycache_core::StorageError>;
