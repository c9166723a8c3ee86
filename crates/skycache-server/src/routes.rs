//! API routes.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use skycache_weather::WeatherRecord;

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WeatherParams {
    pub city: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub fn weather_routes() -> Router<AppState> {
    Router::new().route("/weather", get(get_weather))
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn get_weather(
    State(state): State<AppState>,
    Query(params): Query<WeatherParams>,
) -> Result<Json<WeatherRecord>, ApiError> {
    let Some(city) = params.city else {
        tracing::warn!("Weather request without a city");
        return Err(ApiError::bad_request("Missing required query parameter 'city'."));
    };

    let record = state.service.get_weather(&city).await?;
    Ok(Json(record))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
