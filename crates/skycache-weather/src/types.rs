use serde::{Deserialize, Serialize};
use skycache_core::ValidationError;
use std::fmt;

/// Normalized city identifier used as the cache key.
///
/// Normalization trims, lower-cases and drops all whitespace, so
/// `"  New York "` and `"new york"` both become `"newyork"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WeatherQuery(String);

impl WeatherQuery {
    /// Normalize raw city input. Idempotent.
    pub fn normalize(raw: &str) -> String {
        raw.chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect()
    }

    /// Normalize `raw` and reject input with nothing left afterwards.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let city = Self::normalize(raw);
        if city.is_empty() {
            return Err(ValidationError::new("city must not be empty"));
        }
        Ok(Self(city))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WeatherQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for WeatherQuery {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Current weather snapshot for a city.
///
/// Stored verbatim in the blob store and returned as-is on a cache hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub city: String,
    pub country: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub description: String,
    /// Relative humidity, percent
    pub humidity: u8,
    /// Atmospheric pressure, hPa
    pub pressure: u32,
    pub wind_speed: f64,
    /// Cloud cover, percent
    pub clouds: u8,
}

impl WeatherRecord {
    /// Serialize into the JSON object written to the blob store.
    pub fn to_document(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    pub fn from_document(document: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(document)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn sample() -> WeatherRecord {
        WeatherRecord {
            city: "Tokyo".to_string(),
            country: "JP".to_string(),
            temperature: 18.4,
            feels_like: 17.9,
            description: "few clouds".to_string(),
            humidity: 64,
            pressure: 1014,
            wind_speed: 3.6,
            clouds: 20,
        }
    }

    #[test]
    fn test_normalize_collapses_case_and_whitespace() {
        assert_eq!(WeatherQuery::normalize("  New York "), "newyork");
        assert_eq!(
            WeatherQuery::normalize("  New York "),
            WeatherQuery::normalize("new york")
        );
        assert_eq!(WeatherQuery::normalize("Rio\tde\nJaneiro"), "riodejaneiro");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for raw in ["  New York ", "TOKYO", "são paulo", "", "   "] {
            let once = WeatherQuery::normalize(raw);
            assert_eq!(WeatherQuery::normalize(&once), once);
        }
    }

    #[test]
    fn test_parse_rejects_blank() {
        assert!(WeatherQuery::parse("").is_err());
        assert!(WeatherQuery::parse(" \t ").is_err());
    }

    #[test]
    fn test_parse_display() {
        let query = WeatherQuery::parse("Tokyo ").unwrap();
        assert_eq!(query.as_str(), "tokyo");
        assert_eq!(query.to_string(), "tokyo");
    }

    #[test]
    fn test_document_shape() {
        let doc = sample().to_document().unwrap();
        assert!(doc.is_object());
        assert_eq!(doc["city"], "Tokyo");
        assert_eq!(doc["wind_speed"], 3.6);
        assert_eq!(WeatherRecord::from_document(doc).unwrap(), sample());
    }

    #[test]
    fn test_from_document_rejects_missing_fields() {
        let doc = serde_json::json!({ "city": "Tokyo" });
        assert!(WeatherRecord::from_document(doc).is_err());
    }
}
