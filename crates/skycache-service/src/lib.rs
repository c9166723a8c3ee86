//! Weather cache orchestration.
//!
//! `WeatherCacheService` answers "weather for city X": serve a fresh cached
//! snapshot if one is readable, otherwise fetch live data and write it through
//! to both storage tiers.

pub mod error;
pub mod policy;
pub mod service;

pub use error::{ServiceError, ServiceResult};
pub use policy::{storage_path, CachePolicy, Clock, ManualClock, SystemClock};
pub use service::{CacheMissReason, WeatherCacheService};
