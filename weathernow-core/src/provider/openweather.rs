use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;

use crate::{
    Config, WeatherError,
    model::{ConnectionStatus, Coordinates, LocationSuggestion, WeatherSnapshot},
    normalize::{MAX_SUGGESTIONS, normalize, normalize_suggestions},
    provider::{sanitize_city, sanitize_query},
    transport::Transport,
};

use super::WeatherProvider;

const PROBE_CITY: &str = "London";

/// OpenWeatherMap current/forecast and geocoding endpoints.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: Option<String>,
    api_base: String,
    geo_base: String,
    max_attempts: u32,
    transport: Transport,
}

impl OpenWeatherProvider {
    pub fn new(config: &Config, api_key: Option<String>) -> Result<Self, WeatherError> {
        Ok(Self {
            api_key,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            geo_base: config.geo_base.trim_end_matches('/').to_string(),
            max_attempts: config.max_attempts,
            transport: Transport::new(config.request_timeout(), config.retry_policy())?,
        })
    }

    fn api_key(&self) -> Result<&str, WeatherError> {
        self.api_key
            .as_deref()
            .ok_or_else(WeatherError::missing_api_key)
    }

    fn endpoint(&self, base: &str, path: &str, params: &[(&str, &str)]) -> Result<Url, WeatherError> {
        Url::parse_with_params(&format!("{base}/{path}"), params)
            .map_err(|e| WeatherError::Config(format!("Invalid API base URL '{base}': {e}")))
    }

    /// `params` identify the place; key and units are appended.
    fn weather_urls(&self, params: &[(&str, &str)]) -> Result<(Url, Url), WeatherError> {
        let key = self.api_key()?;
        let mut params = params.to_vec();
        params.push(("appid", key));
        params.push(("units", "metric"));

        Ok((
            self.endpoint(&self.api_base, "weather", &params)?,
            self.endpoint(&self.api_base, "forecast", &params)?,
        ))
    }

    /// Both requests run concurrently; if either fails, the whole call fails.
    async fn fetch_snapshot(&self, current: Url, forecast: Url) -> Result<WeatherSnapshot, WeatherError> {
        let (current, forecast) = tokio::try_join!(
            self.transport.fetch_json(&current, self.max_attempts),
            self.transport.fetch_json(&forecast, self.max_attempts),
        )?;

        let snapshot = normalize(&current, Some(&forecast))?;
        tracing::info!(
            "weather for {}, {} ingested",
            snapshot.location.name,
            snapshot.location.country
        );
        Ok(snapshot)
    }

    async fn fetch_suggestions(&self, key: &str, query: &str) -> Result<Vec<LocationSuggestion>, WeatherError> {
        let limit = MAX_SUGGESTIONS.to_string();
        let url = self.endpoint(
            &self.geo_base,
            "direct",
            &[("q", query), ("limit", limit.as_str()), ("appid", key)],
        )?;

        let payload = self.transport.fetch_json(&url, self.max_attempts).await?;
        Ok(normalize_suggestions(&payload))
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn weather_by_coords(&self, lat: f64, lon: f64) -> Result<WeatherSnapshot, WeatherError> {
        self.api_key()?;
        let coords = Coordinates::new(lat, lon)?;

        let lat = coords.lat.to_string();
        let lon = coords.lon.to_string();
        let (current, forecast) = self.weather_urls(&[("lat", lat.as_str()), ("lon", lon.as_str())])?;

        self.fetch_snapshot(current, forecast).await
    }

    async fn weather_by_city(&self, city: &str) -> Result<WeatherSnapshot, WeatherError> {
        self.api_key()?;
        let city = sanitize_city(city)?;

        let (current, forecast) = self.weather_urls(&[("q", city.as_str())])?;

        self.fetch_snapshot(current, forecast).await
    }

    async fn location_suggestions(&self, query: &str) -> Vec<LocationSuggestion> {
        let Ok(key) = self.api_key() else {
            tracing::warn!("API key not found, returning no suggestions");
            return Vec::new();
        };
        let Some(query) = sanitize_query(query) else {
            return Vec::new();
        };

        match self.fetch_suggestions(key, &query).await {
            Ok(found) => {
                tracing::debug!("{} location suggestions for '{}'", found.len(), query);
                found
            }
            Err(e) => {
                tracing::warn!("location suggestions for '{}' failed: {}", query, e);
                Vec::new()
            }
        }
    }

    async fn test_connection(&self) -> ConnectionStatus {
        let Ok(key) = self.api_key() else {
            return ConnectionStatus {
                success: false,
                message: "API key not configured. Set WEATHER_API_KEY or run `weathernow configure`."
                    .to_string(),
            };
        };

        let url = match self.endpoint(
            &self.api_base,
            "weather",
            &[("q", PROBE_CITY), ("appid", key), ("units", "metric")],
        ) {
            Ok(url) => url,
            Err(e) => {
                return ConnectionStatus {
                    success: false,
                    message: e.to_string(),
                };
            }
        };

        match self.transport.fetch_json(&url, 1).await {
            Ok(payload) if has_block(&payload, "main") && has_block(&payload, "weather") => {
                ConnectionStatus {
                    success: true,
                    message: "API connection successful!".to_string(),
                }
            }
            Ok(_) => ConnectionStatus {
                success: false,
                message: "API returned invalid data structure".to_string(),
            },
            Err(e) => {
                tracing::warn!("API connection test failed: {}", e);
                ConnectionStatus {
                    success: false,
                    message: e.to_string(),
                }
            }
        }
    }
}

fn has_block(payload: &Value, key: &str) -> bool {
    payload.get(key).is_some_and(|v| !v.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(api_key: Option<&str>) -> OpenWeatherProvider {
        let cfg = Config {
            api_base: "http://127.0.0.1:9/data/2.5/".to_string(),
            ..Config::default()
        };
        OpenWeatherProvider::new(&cfg, api_key.map(str::to_string)).expect("provider")
    }

    #[test]
    fn weather_urls_keep_the_provider_query_shape() {
        let (current, forecast) = provider(Some("KEY"))
            .weather_urls(&[("lat", "51.5"), ("lon", "-0.12")])
            .expect("urls");

        assert_eq!(
            current.as_str(),
            "http://127.0.0.1:9/data/2.5/weather?lat=51.5&lon=-0.12&appid=KEY&units=metric"
        );
        assert_eq!(forecast.path(), "/data/2.5/forecast");
    }

    #[test]
    fn city_names_are_url_encoded() {
        let (current, _) = provider(Some("KEY"))
            .weather_urls(&[("q", "São Paulo")])
            .expect("urls");

        assert_eq!(current.query(), Some("q=S%C3%A3o+Paulo&appid=KEY&units=metric"));
    }

    #[test]
    fn urls_need_a_key() {
        let err = provider(None).weather_urls(&[("q", "Oslo")]).unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }

    #[tokio::test]
    async fn missing_key_is_reported_before_input_validation() {
        let p = provider(None);

        let err = p.weather_by_coords(500.0, 0.0).await.unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");

        let status = p.test_connection().await;
        assert!(!status.success);
        assert!(status.message.contains("API key not configured"));

        assert!(p.location_suggestions("Paris").await.is_empty());
    }

    #[test]
    fn probe_payload_needs_both_blocks() {
        assert!(has_block(&serde_json::json!({ "main": {} }), "main"));
        assert!(!has_block(&serde_json::json!({ "main": null }), "main"));
        assert!(!has_block(&serde_json::json!({}), "weather"));
    }
}
