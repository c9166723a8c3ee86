//! Cache key and freshness rules.

use skycache_core::{CacheConfig, IndexWriteFailure};
use skycache_weather::WeatherQuery;
use std::sync::atomic::{AtomicI64, Ordering};

/// Blob key for a fetch of `city` at `timestamp`.
///
/// Unique per fetch as long as timestamps differ for the same city.
pub fn storage_path(city: &WeatherQuery, timestamp: i64) -> String {
    format!("{}_{}.json", city, timestamp)
}

/// Source of "now" in unix seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Freshness window and write-path failure handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    ttl_seconds: i64,
    pub index_write_failure: IndexWriteFailure,
}

impl CachePolicy {
    pub fn new(ttl_minutes: u32) -> Self {
        Self {
            ttl_seconds: i64::from(ttl_minutes) * 60,
            index_write_failure: IndexWriteFailure::default(),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            ttl_seconds: config.ttl_seconds(),
            index_write_failure: config.index_write_failure,
        }
    }

    pub fn with_index_write_failure(mut self, policy: IndexWriteFailure) -> Self {
        self.index_write_failure = policy;
        self
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// Oldest `created_at` still considered fresh at `now`.
    pub fn cutoff(&self, now: i64) -> i64 {
        now.saturating_sub(self.ttl_seconds)
    }

    pub fn is_fresh(&self, created_at: i64, now: i64) -> bool {
        created_at >= self.cutoff(now)
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_storage_path_format() {
        let city = WeatherQuery::parse("Tokyo ").unwrap();
        assert_eq!(storage_path(&city, 1_700_000_000), "tokyo_1700000000.json");
    }

    #[test]
    fn test_storage_path_unique_per_timestamp() {
        let city = WeatherQuery::parse("new york").unwrap();
        assert_ne!(storage_path(&city, 100), storage_path(&city, 101));
    }

    #[test]
    fn test_cutoff_and_freshness() {
        let policy = CachePolicy::new(5);
        assert_eq!(policy.ttl_seconds(), 300);
        assert_eq!(policy.cutoff(1_000), 700);
        assert!(policy.is_fresh(700, 1_000));
        assert!(!policy.is_fresh(699, 1_000));
    }

    #[test]
    fn test_from_config() {
        let config = CacheConfig {
            ttl_minutes: 15,
            index_write_failure: IndexWriteFailure::Fail,
        };
        let policy = CachePolicy::from_config(&config);
        assert_eq!(policy.ttl_seconds(), 900);
        assert_eq!(policy.index_write_failure, IndexWriteFailure::Fail);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(10);
        clock.advance(5);
        assert_eq!(clock.now(), 15);
        clock.set(1);
        assert_eq!(clock.now(), 1);
    }

    #[test]
    fn test_system_clock_is_recent() {
        assert!(SystemClock.now() > 1_700_000_000);
    }
}
