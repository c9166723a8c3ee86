//! Live weather providers.
//!
//! `OpenWeatherMapClient` talks to the OpenWeatherMap current-weather
//! endpoint and maps its native payload onto `WeatherRecord`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use skycache_core::{ProviderConfig, ProviderError, ReqwestErrorExt, Units};
use std::time::Duration;
use tracing::instrument;

use crate::types::{WeatherQuery, WeatherRecord};

const USER_AGENT: &str = concat!("SkyCache/", env!("CARGO_PKG_VERSION"));

/// Source of live weather for a city.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Fetch current weather for an already-normalized city.
    ///
    /// # Errors
    /// `ProviderError::Upstream` for any non-success response, `Network` or
    /// `Timeout` when the provider cannot be reached.
    async fn fetch(&self, query: &WeatherQuery) -> Result<WeatherRecord, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct OwmResponse {
    name: String,
    sys: OwmSys,
    main: OwmMain,
    weather: Vec<OwmCondition>,
    wind: OwmWind,
    clouds: OwmClouds,
}

#[derive(Debug, Deserialize)]
struct OwmSys {
    #[serde(default)]
    country: String,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    feels_like: f64,
    humidity: u8,
    pressure: u32,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwmClouds {
    all: u8,
}

impl TryFrom<OwmResponse> for WeatherRecord {
    type Error = ProviderError;

    fn try_from(raw: OwmResponse) -> Result<Self, Self::Error> {
        let description = raw
            .weather
            .into_iter()
            .next()
            .map(|c| c.description)
            .ok_or_else(|| ProviderError::InvalidResponse("no weather conditions".into()))?;

        Ok(WeatherRecord {
            city: raw.name,
            country: raw.sys.country,
            temperature: raw.main.temp,
            feels_like: raw.main.feels_like,
            description,
            humidity: raw.main.humidity,
            pressure: raw.main.pressure,
            wind_speed: raw.wind.speed,
            clouds: raw.clouds.all,
        })
    }
}

/// OpenWeatherMap current-weather client.
#[derive(Debug, Clone)]
pub struct OpenWeatherMapClient {
    client: Client,
    api_key: String,
    base_url: String,
    units: Units,
}

impl OpenWeatherMapClient {
    /// Build a client from provider configuration.
    ///
    /// # Errors
    /// Returns `ProviderError::Network` if the HTTP client cannot be built.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ProviderError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            units: config.units,
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherMapClient {
    #[instrument(skip(self), fields(city = %query), level = "info")]
    async fn fetch(&self, query: &WeatherQuery) -> Result<WeatherRecord, ProviderError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", query.as_str()),
                ("appid", self.api_key.as_str()),
                ("units", self.units.as_str()),
            ])
            .send()
            .await
            .map_err(ReqwestErrorExt::into_provider_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!("Weather provider returned status {}", status);
            return Err(ProviderError::Upstream {
                status: status.as_u16(),
                message: format!("Failed to fetch weather: {}", text),
            });
        }

        let raw: OwmResponse = response
            .json()
            .await
            .map_err(ReqwestErrorExt::into_provider_error)?;

        let record = WeatherRecord::try_from(raw)?;
        tracing::debug!("Fetched weather for {}", record.city);
        Ok(record)
    }
}
