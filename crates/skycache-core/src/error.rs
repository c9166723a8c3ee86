//! Centralized error types for SkyCache.
//!
//! Every leaf (blob store, log store, weather provider) reports failures with
//! one of the enums below so the orchestrator and the HTTP layer can decide
//! what to swallow and what to surface without knowing which backend failed.

use thiserror::Error;

/// Blob store and log store errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Key or record does not exist. Expected on a cold cache.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Malformed document at '{key}': {message}")]
    Malformed { key: String, message: String },

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

impl StorageError {
    pub fn backend(message: impl Into<String>) -> Self {
        StorageError::Backend(message.into())
    }

    pub fn malformed(key: impl Into<String>, message: impl Into<String>) -> Self {
        StorageError::Malformed {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }

    /// Map an I/O error on `key`, keeping "file missing" distinct from real failures.
    pub fn from_io(key: &str, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(key.to_string())
        } else {
            StorageError::Backend(format!("{}: {}", key, err))
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            StorageError::NotFound(_) => "Cached weather data was not found.",
            StorageError::Backend(_) => "Weather storage is unavailable. Please try again later.",
            StorageError::Malformed { .. } => "Stored weather data is corrupted.",
            StorageError::InvalidKey(_) => "Weather data could not be stored.",
        }
    }
}

/// Upstream weather provider errors.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Provider answered with a non-success status.
    #[error("Upstream error: {status} - {message}")]
    Upstream { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Weather provider timed out")]
    Timeout,

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ProviderError::Upstream { status: 404, .. } => "City not found.",
            ProviderError::Upstream { status: 401, .. } => "Weather API key is invalid.",
            ProviderError::Upstream { status, .. } if *status >= 500 => {
                "The weather provider is experiencing issues. Please try again later."
            }
            ProviderError::Upstream { .. } => "The weather request failed.",
            ProviderError::Network(_) => "Unable to reach the weather provider.",
            ProviderError::Timeout => "The weather provider timed out. Please try again.",
            ProviderError::InvalidResponse(_) => "Received an unexpected response from the weather provider.",
        }
    }
}

/// Malformed request input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Validation error: {0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        ValidationError(message.into())
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::NotFound(_) => {
                "The configuration file named by SKYCACHE_CONFIG does not exist."
            }
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
        }
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_provider_error(self) -> ProviderError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_provider_error(self) -> ProviderError {
        if self.is_timeout() {
            ProviderError::Timeout
        } else if self.is_decode() {
            ProviderError::InvalidResponse(self.to_string())
        } else if let Some(status) = self.status() {
            ProviderError::Upstream {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else {
            ProviderError::Network(self.to_string())
        }
    }
}

/// Extension trait for converting rusqlite errors to our error types.
pub trait RusqliteErrorExt {
    fn into_storage_error(self) -> StorageError;
}

impl RusqliteErrorExt for rusqlite::Error {
    fn into_storage_error(self) -> StorageError {
        match &self {
            rusqlite::Error::QueryReturnedNoRows => StorageError::NotFound(self.to_string()),
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("corrupt") => {
                StorageError::malformed("sqlite", self.to_string())
            }
            _ => StorageError::Backend(self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_not_found_maps_to_not_found() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let mapped = StorageError::from_io("tokyo_1.json", err);
        assert!(mapped.is_not_found());
    }

    #[test]
    fn test_io_other_maps_to_backend() {
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let mapped = StorageError::from_io("tokyo_1.json", err);
        assert!(matches!(mapped, StorageError::Backend(ref m) if m.contains("tokyo_1.json")));
    }

    #[test]
    fn test_provider_user_messages() {
        let not_found = ProviderError::Upstream {
            status: 404,
            message: "city not found".into(),
        };
        assert_eq!(not_found.user_message(), "City not found.");

        let server = ProviderError::Upstream {
            status: 503,
            message: "down".into(),
        };
        assert!(server.user_message().contains("try again later"));
    }

    #[test]
    fn test_config_not_found_message_does_not_promise_defaults() {
        let err = ConfigError::NotFound("/etc/skycache/absent.toml".into());
        assert!(err.user_message().contains("does not exist"));
        assert!(!err.user_message().contains("default"));
    }

    #[test]
    fn test_rusqlite_no_rows_is_not_found() {
        let mapped = rusqlite::Error::QueryReturnedNoRows.into_storage_error();
        assert!(mapped.is_not_found());
    }

    #[test]
    fn test_upstream_display_includes_status() {
        let err = ProviderError::Upstream {
            status: 429,
            message: "slow down".into(),
        };
        assert_eq!(err.to_string(), "Upstream error: 429 - slow down");
    }
}
