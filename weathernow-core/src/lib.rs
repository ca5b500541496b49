//! Weather ingestion core for `weathernow`.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - A fetch-with-retry HTTP transport with classified errors
//! - Normalization of provider JSON into a fixed-shape snapshot
//! - The provider abstraction the CLI (or any other front end) talks to
//!
//! Everything is stateless: each call is a fresh fetch-and-normalize pipeline.

pub mod config;
pub mod error;
pub mod model;
pub mod normalize;
pub mod provider;
pub mod quality;
pub mod transport;

pub use config::Config;
pub use error::WeatherError;
pub use model::{
    Condition, ConnectionStatus, Coordinates, CurrentConditions, ForecastDay, HourlyForecast,
    LocationInfo, LocationSuggestion, WeatherAlert, WeatherSnapshot,
};
pub use normalize::normalize;
pub use provider::{WeatherProvider, openweather::OpenWeatherProvider, provider_from_config};
pub use quality::{QualityLabel, WeatherQuality, weather_quality};
pub use transport::{RetryPolicy, Transport};
