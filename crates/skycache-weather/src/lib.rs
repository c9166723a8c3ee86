//! Weather domain types and upstream providers for SkyCache.
//!
//! `WeatherQuery` is the normalized cache key, `WeatherRecord` the payload
//! that gets cached, and `WeatherProvider` the seam to the live weather API.

pub mod provider;
pub mod types;

pub use provider::{OpenWeatherMapClient, WeatherProvider};
pub use types::{WeatherQuery, WeatherRecord};
