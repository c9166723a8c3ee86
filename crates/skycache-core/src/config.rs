use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use url::Url;

use crate::error::ConfigError;

/// Environment variable naming an optional TOML config file.
pub const CONFIG_PATH_ENV: &str = "SKYCACHE_CONFIG";

pub const ENV_BIND_ADDR: &str = "SKYCACHE_BIND_ADDR";
pub const ENV_API_KEY: &str = "OPENWEATHER_MAP_API_KEY";
pub const ENV_BASE_URL: &str = "OPENWEATHER_BASE_URL";
pub const ENV_UNITS: &str = "OPENWEATHER_UNITS";
pub const ENV_PROVIDER_TIMEOUT: &str = "PROVIDER_TIMEOUT_SECS";
pub const ENV_BLOB_BACKEND: &str = "BLOB_BACKEND";
pub const ENV_BLOB_ROOT: &str = "BLOB_ROOT";
pub const ENV_BUCKET: &str = "BLOB_BUCKET_NAME";
pub const ENV_REGION: &str = "STORAGE_REGION";
pub const ENV_LOG_BACKEND: &str = "LOG_BACKEND";
pub const ENV_LOG_DB_PATH: &str = "LOG_DB_PATH";
pub const ENV_LOG_TABLE: &str = "LOG_TABLE_NAME";
pub const ENV_CACHE_TTL: &str = "CACHE_TTL_MINUTES";
pub const ENV_INDEX_WRITE_FAILURE: &str = "CACHE_INDEX_WRITE_FAILURE";

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_PROVIDER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_BUCKET: &str = "city-weather";
pub const DEFAULT_REGION: &str = "local";
pub const DEFAULT_LOG_TABLE: &str = "city_weather_log";
pub const DEFAULT_CACHE_TTL_MINUTES: u32 = 5;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a summary of all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Unit system requested from the weather provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    Standard,
    #[default]
    Metric,
    Imperial,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Standard => "standard",
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }
}

impl FromStr for Units {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Units::Standard),
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            other => Err(ConfigError::Invalid(format!("unknown unit system '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BlobBackend {
    #[default]
    Filesystem,
    Memory,
}

impl FromStr for BlobBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "filesystem" | "fs" => Ok(BlobBackend::Filesystem),
            "memory" => Ok(BlobBackend::Memory),
            other => Err(ConfigError::Invalid(format!("unknown blob backend '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogBackend {
    #[default]
    Sqlite,
    Memory,
}

impl FromStr for LogBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(LogBackend::Sqlite),
            "memory" => Ok(LogBackend::Memory),
            other => Err(ConfigError::Invalid(format!("unknown log backend '{}'", other))),
        }
    }
}

/// What to do when the blob was written but the log entry could not be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IndexWriteFailure {
    /// Return the fetched record and log the orphaned blob.
    #[default]
    Tolerate,
    /// Fail the request even though the record is valid.
    Fail,
}

impl FromStr for IndexWriteFailure {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tolerate" => Ok(IndexWriteFailure::Tolerate),
            "fail" => Ok(IndexWriteFailure::Fail),
            other => Err(ConfigError::Invalid(format!(
                "unknown index write failure policy '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP server listens on
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// OpenWeatherMap API key. Normally supplied through the environment.
    #[serde(default)]
    pub api_key: String,

    /// Full URL of the current-weather endpoint
    #[serde(default = "default_provider_url")]
    pub base_url: String,

    #[serde(default)]
    pub units: Units,

    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

fn default_provider_url() -> String {
    DEFAULT_PROVIDER_URL.to_string()
}

fn default_provider_timeout() -> u64 {
    DEFAULT_PROVIDER_TIMEOUT_SECS
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_provider_url(),
            units: Units::default(),
            timeout_secs: default_provider_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub blob_backend: BlobBackend,

    /// Root directory for the filesystem blob store
    #[serde(default = "default_blob_root")]
    pub blob_root: PathBuf,

    #[serde(default = "default_bucket")]
    pub bucket: String,

    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default)]
    pub log_backend: LogBackend,

    /// SQLite database file for the log store
    #[serde(default = "default_log_db_path")]
    pub log_db_path: PathBuf,

    #[serde(default = "default_log_table")]
    pub log_table: String,
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("skycache")
}

fn default_blob_root() -> PathBuf {
    data_dir().join("blobs")
}

fn default_log_db_path() -> PathBuf {
    data_dir().join("cache_log.db")
}

fn default_bucket() -> String {
    DEFAULT_BUCKET.to_string()
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_log_table() -> String {
    DEFAULT_LOG_TABLE.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            blob_backend: BlobBackend::default(),
            blob_root: default_blob_root(),
            bucket: default_bucket(),
            region: default_region(),
            log_backend: LogBackend::default(),
            log_db_path: default_log_db_path(),
            log_table: default_log_table(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum age of a cache entry that is still served, in minutes
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: u32,

    #[serde(default)]
    pub index_write_failure: IndexWriteFailure,
}

fn default_ttl_minutes() -> u32 {
    DEFAULT_CACHE_TTL_MINUTES
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_ttl_minutes(),
            index_write_failure: IndexWriteFailure::default(),
        }
    }
}

impl CacheConfig {
    pub fn ttl_seconds(&self) -> i64 {
        i64::from(self.ttl_minutes) * 60
    }
}

/// Returns true for names usable as an unquoted SQL table name.
pub fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_env<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ConfigError::Invalid(format!("{}: {}", key, e)))
}

impl Config {
    /// Load configuration: defaults, then the optional TOML file named by
    /// `SKYCACHE_CONFIG`, then environment overrides (including `.env`).
    pub fn load() -> Result<Self> {
        // A missing .env file is the normal case outside development.
        let _ = dotenvy::dotenv();

        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;
        Ok(Self::from_toml_str(&contents)?)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Apply overrides from an environment-like lookup. Unset keys keep the
    /// current value.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_BIND_ADDR) {
            self.server.bind_addr = v;
        }
        if let Some(v) = lookup(ENV_API_KEY) {
            self.provider.api_key = v;
        }
        if let Some(v) = lookup(ENV_BASE_URL) {
            self.provider.base_url = v;
        }
        if let Some(v) = lookup(ENV_UNITS) {
            self.provider.units = v.parse()?;
        }
        if let Some(v) = lookup(ENV_PROVIDER_TIMEOUT) {
            self.provider.timeout_secs = parse_env(ENV_PROVIDER_TIMEOUT, &v)?;
        }
        if let Some(v) = lookup(ENV_BLOB_BACKEND) {
            self.storage.blob_backend = v.parse()?;
        }
        if let Some(v) = lookup(ENV_BLOB_ROOT) {
            self.storage.blob_root = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_BUCKET) {
            self.storage.bucket = v;
        }
        if let Some(v) = lookup(ENV_REGION) {
            self.storage.region = v;
        }
        if let Some(v) = lookup(ENV_LOG_BACKEND) {
            self.storage.log_backend = v.parse()?;
        }
        if let Some(v) = lookup(ENV_LOG_DB_PATH) {
            self.storage.log_db_path = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_LOG_TABLE) {
            self.storage.log_table = v;
        }
        if let Some(v) = lookup(ENV_CACHE_TTL) {
            self.cache.ttl_minutes = parse_env(ENV_CACHE_TTL, &v)?;
        }
        if let Some(v) = lookup(ENV_INDEX_WRITE_FAILURE) {
            self.cache.index_write_failure = v.parse()?;
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.server.bind_addr.parse::<SocketAddr>().is_err() {
            result.add_error(
                "server.bind_addr",
                format!("Not a socket address: {}", self.server.bind_addr),
            );
        }

        if self.provider.api_key.trim().is_empty() {
            result.add_error(
                "provider.api_key",
                format!("API key must be provided (set {})", ENV_API_KEY),
            );
        }

        self.validate_url(&self.provider.base_url, "provider.base_url", &mut result);

        if self.provider.timeout_secs == 0 {
            result.add_error("provider.timeout_secs", "Timeout must be greater than 0");
        }

        if self.storage.blob_backend == BlobBackend::Filesystem {
            if self.storage.bucket.trim().is_empty() {
                result.add_error("storage.bucket", "Bucket name must not be empty");
            }
            if self.storage.region.trim().is_empty() {
                result.add_error("storage.region", "Region must not be empty");
            }
        }

        if self.storage.log_backend == LogBackend::Sqlite
            && !is_sql_identifier(&self.storage.log_table)
        {
            result.add_error(
                "storage.log_table",
                format!(
                    "Table name must contain only letters, digits and underscores: {}",
                    self.storage.log_table
                ),
            );
        }

        if self.storage.blob_backend == BlobBackend::Memory
            || self.storage.log_backend == LogBackend::Memory
        {
            result.add_warning("storage", "In-memory backend selected; cache is lost on restart");
        }

        if self.cache.ttl_minutes == 0 {
            result.add_warning("cache.ttl_minutes", "Caching effectively disabled (0 minutes)");
        } else if self.cache.ttl_minutes > 1440 {
            result.add_warning("cache.ttl_minutes", "Cache TTL is more than 24 hours");
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }
}
