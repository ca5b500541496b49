use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::WeatherError;

/// A validated latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Result<Self, WeatherError> {
        // NaN fails both range checks.
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(WeatherError::InvalidCoords { lat, lon });
        }
        Ok(Self { lat, lon })
    }
}

/// Provider condition group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Condition {
    Clear,
    Clouds,
    Rain,
    Drizzle,
    Thunderstorm,
    Snow,
    Mist,
    Fog,
    #[default]
    Unknown,
}

impl Condition {
    pub fn from_provider(main: &str) -> Self {
        match main {
            "Clear" => Condition::Clear,
            "Clouds" => Condition::Clouds,
            "Rain" => Condition::Rain,
            "Drizzle" => Condition::Drizzle,
            "Thunderstorm" => Condition::Thunderstorm,
            "Snow" => Condition::Snow,
            "Mist" => Condition::Mist,
            "Fog" => Condition::Fog,
            _ => Condition::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Clear => "Clear",
            Condition::Clouds => "Clouds",
            Condition::Rain => "Rain",
            Condition::Drizzle => "Drizzle",
            Condition::Thunderstorm => "Thunderstorm",
            Condition::Snow => "Snow",
            Condition::Mist => "Mist",
            Condition::Fog => "Fog",
            Condition::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationInfo {
    pub name: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
    /// e.g. "UTC+2", present when the provider reports a shift.
    pub timezone: Option<String>,
}

/// Current conditions, metric units throughout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    /// °C
    pub temperature: i32,
    pub feels_like: i32,
    pub condition: Condition,
    pub description: String,
    pub icon: String,
    /// %
    pub humidity: u32,
    /// km/h
    pub wind_speed: u32,
    /// Degrees, as reported.
    pub wind_direction: f64,
    /// km
    pub visibility: u32,
    /// hPa
    pub pressure: u32,
    /// %
    pub cloudiness: u32,
    /// Unix seconds.
    pub sunrise: i64,
    pub sunset: i64,
    /// Rough linear estimate, see [`crate::normalize::approximate_dew_point`].
    pub dew_point: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    /// Short weekday, e.g. "Mon".
    pub day_name: String,
    pub temp_max: i32,
    pub temp_min: i32,
    pub condition: Condition,
    pub description: String,
    pub icon: String,
    pub humidity: u32,
    pub wind_speed: u32,
    /// Probability of precipitation, %.
    pub pop: u32,
    pub pressure: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyForecast {
    /// Provider's slot timestamp text ("2024-05-01 12:00:00"), empty if absent.
    pub time: String,
    /// Clock label, e.g. "3 PM".
    pub hour: String,
    pub temperature: i32,
    pub feels_like: i32,
    pub condition: Condition,
    pub icon: String,
    pub pop: u32,
    pub wind_speed: u32,
    pub humidity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Minor,
    Moderate,
    Severe,
    Extreme,
}

/// Reserved: no ingestion path fills alerts yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherAlert {
    pub event: String,
    pub description: String,
    pub start: i64,
    pub end: i64,
    pub severity: AlertSeverity,
}

/// One fully-resolved weather result for a single location and instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub location: LocationInfo,
    pub current: CurrentConditions,
    /// Up to 6 days.
    pub forecast: Vec<ForecastDay>,
    /// Up to 8 three-hour slots.
    pub hourly: Vec<HourlyForecast>,
    pub alerts: Vec<WeatherAlert>,
}

/// Autocomplete candidate for a place search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSuggestion {
    pub name: String,
    pub country: String,
    pub region: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub display_name: String,
}

impl LocationSuggestion {
    pub fn new(name: String, country: String, region: Option<String>, lat: f64, lon: f64) -> Self {
        let display_name = match &region {
            Some(region) => format!("{name}, {region}, {country}"),
            None => format!("{name}, {country}"),
        };

        Self {
            name,
            country,
            region,
            lat,
            lon,
            display_name,
        }
    }
}

/// Outcome of the connectivity probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub success: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_accept_the_closed_range() {
        assert!(Coordinates::new(90.0, 180.0).is_ok());
        assert!(Coordinates::new(-90.0, -180.0).is_ok());
        assert!(Coordinates::new(0.0, 0.0).is_ok());
    }

    #[test]
    fn coordinates_reject_out_of_range_and_nan() {
        for (lat, lon) in [(90.5, 0.0), (-91.0, 0.0), (0.0, 180.1), (0.0, -181.0), (f64::NAN, 0.0)] {
            let err = Coordinates::new(lat, lon).unwrap_err();
            assert_eq!(err.code(), "INVALID_COORDS");
        }
    }

    #[test]
    fn condition_maps_known_groups_and_falls_back() {
        assert_eq!(Condition::from_provider("Thunderstorm"), Condition::Thunderstorm);
        assert_eq!(Condition::from_provider("Mist"), Condition::Mist);
        assert_eq!(Condition::from_provider("Haze"), Condition::Unknown);
        assert_eq!(Condition::from_provider(""), Condition::Unknown);
    }

    #[test]
    fn suggestion_label_includes_region_only_when_present() {
        let with_region = LocationSuggestion::new(
            "Springfield".into(),
            "US".into(),
            Some("Illinois".into()),
            39.8,
            -89.6,
        );
        assert_eq!(with_region.display_name, "Springfield, Illinois, US");

        let without = LocationSuggestion::new("Paris".into(), "FR".into(), None, 48.8, 2.3);
        assert_eq!(without.display_name, "Paris, FR");
    }
}
