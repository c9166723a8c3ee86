pub mod config;
pub mod error;

pub use config::{
    BlobBackend, CacheConfig, Config, IndexWriteFailure, LogBackend, ProviderConfig,
    ServerConfig, StorageConfig, Units, ValidationResult,
};
pub use error::{
    ConfigError, ProviderError, ReqwestErrorExt, RusqliteErrorExt, StorageError,
    ValidationError,
};

use anyhow::Result;

/// Default filter when `RUST_LOG` is unset. HTTP client and server internals
/// stay at warn so request logs are not drowned out.
pub const DEFAULT_LOG_FILTER: &str = "info,hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,tower_http=info";

/// Initialize tracing/logging for the process
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_target(true)
        .init();

    tracing::info!("SkyCache core initialized");
    Ok(())
}
