//! HTTP error mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use skycache_core::ProviderError;
use skycache_service::ServiceError;

/// A failed request, ready to be rendered as `{"error": true, "message": ...}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

/// Upstream statuses pass through when they are HTTP error codes.
fn upstream_status(status: u16) -> StatusCode {
    match StatusCode::from_u16(status) {
        Ok(code) if code.is_client_error() || code.is_server_error() => code,
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match &err {
            ServiceError::Validation(e) => {
                tracing::warn!(detail = %e, "Rejected weather request");
                Self::bad_request(err.user_message())
            }
            ServiceError::Provider(ProviderError::Upstream { status, message }) => {
                tracing::warn!(status, detail = %message, "Weather provider returned an error");
                Self {
                    status: upstream_status(*status),
                    message: message.clone(),
                }
            }
            ServiceError::Provider(ProviderError::Timeout) => {
                tracing::warn!("Weather provider timed out");
                Self {
                    status: StatusCode::GATEWAY_TIMEOUT,
                    message: err.user_message().to_string(),
                }
            }
            ServiceError::Provider(e) => {
                tracing::warn!(detail = %e, "Weather provider unavailable");
                Self {
                    status: StatusCode::BAD_GATEWAY,
                    message: err.user_message().to_string(),
                }
            }
            ServiceError::Storage(e) => {
                tracing::error!(detail = %e, "Storage error");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "An internal error occurred".to_string(),
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": true,
            "message": self.message,
        }));

        (self.status, body).into_response()
    }
}
