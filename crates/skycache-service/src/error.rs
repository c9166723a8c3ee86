use skycache_core::{ProviderError, StorageError, ValidationError};
use thiserror::Error;

/// Terminal failure of a weather request.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ServiceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "Please provide a city name.",
            ServiceError::Provider(e) => e.user_message(),
            ServiceError::Storage(e) => e.user_message(),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        let err: ServiceError = ProviderError::Timeout.into();
        assert!(matches!(err, ServiceError::Provider(ProviderError::Timeout)));

        let err: ServiceError = StorageError::backend("disk full").into();
        assert_eq!(err.to_string(), "Storage backend error: disk full");
    }

    #[test]
    fn test_user_message_delegates() {
        let err = ServiceError::Provider(ProviderError::Timeout);
        assert_eq!(err.user_message(), ProviderError::Timeout.user_message());
    }
}
