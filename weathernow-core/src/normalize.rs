//! Provider JSON → [`WeatherSnapshot`].
//!
//! Two tiers of strictness:
//! - the current-conditions payload must carry a `main` block and a non-empty
//!   `weather` list, otherwise the whole transform fails; every other leaf is
//!   defaulted individually.
//! - forecast slots missing their own `main`/`weather` are dropped, the rest
//!   of the list is kept.
//!
//! Leaves are parsed leniently: a field of the wrong JSON type is treated the
//! same as an absent one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    error::WeatherError,
    model::{
        Condition, CurrentConditions, ForecastDay, HourlyForecast, LocationInfo,
        LocationSuggestion, WeatherSnapshot,
    },
};

pub const MAX_FORECAST_DAYS: usize = 6;
pub const MAX_HOURLY_SLOTS: usize = 8;
pub const MAX_SUGGESTIONS: usize = 8;

/// Slots per day in a 3-hour feed, and the offset of the one nearest midday.
const SLOTS_PER_DAY: usize = 8;
const MIDDAY_SLOT: usize = 4;

const DEFAULT_NAME: &str = "Unknown";
const DEFAULT_ICON: &str = "01d";
const DEFAULT_VISIBILITY_KM: u32 = 10;
const DEFAULT_PRESSURE_HPA: f64 = 1013.0;
const DEW_POINT_FALLBACK_HUMIDITY: f64 = 50.0;
const MPS_TO_KMH: f64 = 3.6;

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

#[derive(Debug, Default, Deserialize)]
struct RawCurrent {
    #[serde(default, deserialize_with = "lenient")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    coord: Option<RawCoord>,
    #[serde(default, deserialize_with = "lenient")]
    sys: Option<RawSys>,
    #[serde(default, deserialize_with = "lenient")]
    main: Option<RawMain>,
    /// Only the first entry is read; the rest may be anything.
    #[serde(default, deserialize_with = "lenient")]
    weather: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "lenient")]
    wind: Option<RawWind>,
    #[serde(default, deserialize_with = "lenient")]
    clouds: Option<RawClouds>,
    /// Metres.
    #[serde(default, deserialize_with = "lenient")]
    visibility: Option<f64>,
    /// Shift from UTC in seconds.
    #[serde(default, deserialize_with = "lenient")]
    timezone: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawCoord {
    #[serde(default, deserialize_with = "lenient")]
    lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    lon: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSys {
    #[serde(default, deserialize_with = "lenient")]
    country: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    sunrise: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    sunset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawMain {
    #[serde(default, deserialize_with = "lenient")]
    temp: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    feels_like: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    temp_min: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    temp_max: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    humidity: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pressure: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawCondition {
    #[serde(default, deserialize_with = "lenient")]
    main: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    icon: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawWind {
    /// m/s
    #[serde(default, deserialize_with = "lenient")]
    speed: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    deg: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawClouds {
    #[serde(default, deserialize_with = "lenient")]
    all: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawForecast {
    /// Kept as raw values so one bad slot can't sink the list.
    #[serde(default, deserialize_with = "lenient")]
    list: Option<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSlot {
    #[serde(default, deserialize_with = "lenient")]
    dt: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    dt_txt: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    main: Option<RawMain>,
    /// Only the first entry is read; the rest may be anything.
    #[serde(default, deserialize_with = "lenient")]
    weather: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "lenient")]
    wind: Option<RawWind>,
    /// 0.0..=1.0
    #[serde(default, deserialize_with = "lenient")]
    pop: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPlace {
    #[serde(default, deserialize_with = "lenient")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    country: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    state: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    lon: Option<f64>,
}

/// A slot whose hard requirements are met.
struct Slot {
    dt: DateTime<Utc>,
    dt_txt: Option<String>,
    main: RawMain,
    condition: RawCondition,
    wind: RawWind,
    pop: Option<f64>,
}

impl Slot {
    fn parse(value: &Value) -> Option<Slot> {
        let raw = RawSlot::deserialize(value).ok()?;
        let main = raw.main?;
        let condition = first_condition(raw.weather)?;

        Some(Slot {
            dt: raw
                .dt
                .and_then(|ts| DateTime::from_timestamp(ts, 0))
                .unwrap_or_default(),
            dt_txt: raw.dt_txt,
            main,
            condition,
            wind: raw.wind.unwrap_or_default(),
            pop: raw.pop,
        })
    }

    fn into_day(self) -> ForecastDay {
        ForecastDay {
            date: self.dt.date_naive(),
            day_name: self.dt.format("%a").to_string(),
            temp_max: round_i32(self.main.temp_max.unwrap_or(0.0)),
            temp_min: round_i32(self.main.temp_min.unwrap_or(0.0)),
            condition: condition_of(&self.condition),
            description: text_or(self.condition.description, DEFAULT_NAME),
            icon: text_or(self.condition.icon, DEFAULT_ICON),
            humidity: round_u32(self.main.humidity.unwrap_or(0.0)),
            wind_speed: wind_kmh(self.wind.speed),
            pop: percent(self.pop),
            pressure: round_u32(self.main.pressure.unwrap_or(0.0)),
        }
    }

    fn into_hourly(self) -> HourlyForecast {
        HourlyForecast {
            time: self.dt_txt.unwrap_or_default(),
            hour: self.dt.format("%-I %p").to_string(),
            temperature: round_i32(self.main.temp.unwrap_or(0.0)),
            feels_like: round_i32(self.main.feels_like.unwrap_or(0.0)),
            condition: condition_of(&self.condition),
            icon: text_or(self.condition.icon, DEFAULT_ICON),
            pop: percent(self.pop),
            wind_speed: wind_kmh(self.wind.speed),
            humidity: round_u32(self.main.humidity.unwrap_or(0.0)),
        }
    }
}

/// Build a snapshot from a current-conditions payload and an optional
/// 3-hour forecast payload.
///
/// Day and hour labels are rendered in UTC.
pub fn normalize(current: &Value, forecast: Option<&Value>) -> Result<WeatherSnapshot, WeatherError> {
    let raw = RawCurrent::deserialize(current).map_err(|_| {
        WeatherError::InvalidData("current weather payload is not an object".to_string())
    })?;

    let Some(main) = raw.main else {
        return Err(WeatherError::InvalidData(
            "current weather payload has no `main` block".to_string(),
        ));
    };
    let Some(condition) = first_condition(raw.weather) else {
        return Err(WeatherError::InvalidData(
            "current weather payload has no `weather` conditions".to_string(),
        ));
    };

    let coord = raw.coord.unwrap_or_default();
    let sys = raw.sys.unwrap_or_default();
    let wind = raw.wind.unwrap_or_default();

    let location = LocationInfo {
        name: text_or(raw.name, DEFAULT_NAME),
        country: text_or(sys.country, DEFAULT_NAME),
        lat: coord.lat.unwrap_or(0.0),
        lon: coord.lon.unwrap_or(0.0),
        timezone: raw.timezone.map(utc_offset_label),
    };

    let temperature = main.temp.unwrap_or(0.0);
    let current = CurrentConditions {
        temperature: round_i32(temperature),
        feels_like: round_i32(main.feels_like.unwrap_or(0.0)),
        condition: condition_of(&condition),
        description: text_or(condition.description, DEFAULT_NAME),
        icon: text_or(condition.icon, DEFAULT_ICON),
        humidity: round_u32(main.humidity.unwrap_or(0.0)),
        wind_speed: wind_kmh(wind.speed),
        wind_direction: wind.deg.unwrap_or(0.0),
        visibility: raw
            .visibility
            .map(|m| round_u32(m / 1000.0))
            .unwrap_or(DEFAULT_VISIBILITY_KM),
        pressure: round_u32(main.pressure.unwrap_or(DEFAULT_PRESSURE_HPA)),
        cloudiness: round_u32(raw.clouds.and_then(|c| c.all).unwrap_or(0.0)),
        sunrise: sys.sunrise.unwrap_or(0),
        sunset: sys.sunset.unwrap_or(0),
        dew_point: approximate_dew_point(
            temperature,
            main.humidity.unwrap_or(DEW_POINT_FALLBACK_HUMIDITY),
        ),
    };

    let slots = forecast
        .and_then(|f| RawForecast::deserialize(f).ok())
        .and_then(|f| f.list)
        .unwrap_or_default();

    let forecast: Vec<ForecastDay> = slots
        .iter()
        .skip(MIDDAY_SLOT)
        .step_by(SLOTS_PER_DAY)
        .take(MAX_FORECAST_DAYS)
        .filter_map(Slot::parse)
        .map(Slot::into_day)
        .collect();

    let hourly: Vec<HourlyForecast> = slots
        .iter()
        .take(MAX_HOURLY_SLOTS)
        .filter_map(Slot::parse)
        .map(Slot::into_hourly)
        .collect();

    tracing::debug!(
        "normalized {} ({} forecast days, {} hourly slots)",
        location.name,
        forecast.len(),
        hourly.len()
    );

    Ok(WeatherSnapshot {
        location,
        current,
        forecast,
        hourly,
        alerts: Vec::new(),
    })
}

/// Map a geocoding response to suggestions. Anything but an array yields none.
pub fn normalize_suggestions(payload: &Value) -> Vec<LocationSuggestion> {
    let Some(items) = payload.as_array() else {
        tracing::warn!("location suggestions response is not an array");
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| RawPlace::deserialize(item).ok())
        .take(MAX_SUGGESTIONS)
        .map(|place| {
            LocationSuggestion::new(
                text_or(place.name, DEFAULT_NAME),
                text_or(place.country, DEFAULT_NAME),
                place.state.filter(|s| !s.is_empty()),
                place.lat.unwrap_or(0.0),
                place.lon.unwrap_or(0.0),
            )
        })
        .collect()
}

/// Dew point as `temperature − (100 − humidity) / 5`, rounded.
///
/// This is a coarse linear approximation, not the Magnus formula. Consumers
/// rely on these exact values, so don't swap it for a "better" one.
pub fn approximate_dew_point(temperature: f64, humidity: f64) -> i32 {
    round_i32(temperature - (100.0 - humidity) / 5.0)
}

/// "UTC+2", "UTC-5", whole hours.
pub fn utc_offset_label(offset_secs: f64) -> String {
    let hours = round_half_up(offset_secs / 3600.0) as i64;
    if offset_secs >= 0.0 {
        format!("UTC+{hours}")
    } else {
        format!("UTC{hours}")
    }
}

/// `None` only when the list is absent or empty. A malformed first entry
/// still counts, with every field defaulted.
fn first_condition(list: Option<Vec<Value>>) -> Option<RawCondition> {
    let first = list?.into_iter().next()?;
    Some(RawCondition::deserialize(&first).unwrap_or_default())
}

fn condition_of(raw: &RawCondition) -> Condition {
    raw.main
        .as_deref()
        .map(Condition::from_provider)
        .unwrap_or_default()
}

fn text_or(value: Option<String>, default: &str) -> String {
    value
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn wind_kmh(speed_mps: Option<f64>) -> u32 {
    round_u32(speed_mps.unwrap_or(0.0) * MPS_TO_KMH)
}

fn percent(fraction: Option<f64>) -> u32 {
    round_u32(fraction.unwrap_or(0.0) * 100.0)
}

/// Halves round toward +∞, so -2.5 becomes -2.
fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

fn round_i32(x: f64) -> i32 {
    round_half_up(x) as i32
}

fn round_u32(x: f64) -> u32 {
    round_half_up(x.max(0.0)) as u32
}
