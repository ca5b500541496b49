use crate::{
    Config, WeatherError,
    model::{ConnectionStatus, LocationSuggestion, WeatherSnapshot},
    provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

pub const MIN_QUERY_CHARS: usize = 2;
pub const MAX_CITY_CHARS: usize = 100;
pub const MAX_SEARCH_CHARS: usize = 50;

/// Caller-facing operations of the ingestion core.
///
/// Each call is an independent fetch-and-normalize pipeline; nothing is
/// cached or shared between calls.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Fails `Config` without a key, `InvalidCoords` outside
    /// [-90, 90] × [-180, 180]. Validation happens before any request.
    async fn weather_by_coords(&self, lat: f64, lon: f64) -> Result<WeatherSnapshot, WeatherError>;

    /// Fails `InvalidCity` when the trimmed name is shorter than 2 chars.
    async fn weather_by_city(&self, city: &str) -> Result<WeatherSnapshot, WeatherError>;

    /// Autocomplete. Never fails: any problem yields an empty list.
    async fn location_suggestions(&self, query: &str) -> Vec<LocationSuggestion>;

    /// Diagnostics probe. Never fails.
    async fn test_connection(&self) -> ConnectionStatus;
}

/// Construct the provider from config, resolving the API key from the
/// environment first. A missing key is reported per operation, not here.
pub fn provider_from_config(config: &Config) -> Result<Box<dyn WeatherProvider>, WeatherError> {
    let api_key = config.resolve_api_key();
    if api_key.is_none() {
        tracing::warn!("no weather API key configured");
    }

    Ok(Box::new(OpenWeatherProvider::new(config, api_key)?))
}

/// Trim and bound a city name, rejecting ones too short to search for.
pub fn sanitize_city(city: &str) -> Result<String, WeatherError> {
    sanitize(city, MAX_CITY_CHARS).ok_or(WeatherError::InvalidCity)
}

/// Trim and bound an autocomplete query; `None` if it's too short to bother.
pub fn sanitize_query(query: &str) -> Option<String> {
    sanitize(query, MAX_SEARCH_CHARS)
}

fn sanitize(input: &str, max_chars: usize) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.chars().count() < MIN_QUERY_CHARS {
        return None;
    }
    Some(trimmed.chars().take(max_chars).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn city_names_are_trimmed_and_bounded() {
        assert_eq!(sanitize_city("  Oslo ").expect("valid"), "Oslo");

        let long = "x".repeat(150);
        assert_eq!(sanitize_city(&long).expect("valid").len(), MAX_CITY_CHARS);
    }

    #[test]
    fn short_city_names_are_rejected() {
        for city in ["", " ", "a", "  b  "] {
            let err = sanitize_city(city).unwrap_err();
            assert_eq!(err.code(), "INVALID_CITY");
        }
    }

    #[test]
    fn bounds_count_characters_not_bytes() {
        let query = "Zürich".repeat(20);
        let cut = sanitize_query(&query).expect("valid");
        assert_eq!(cut.chars().count(), MAX_SEARCH_CHARS);
        assert_eq!(sanitize_query("Ö"), None);
    }

    #[test]
    fn provider_from_config_works_without_a_key() {
        let cfg = Config::default();
        assert!(provider_from_config(&cfg).is_ok());
    }
}
