use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode};
use tokio::time::MissedTickBehavior;
use weathernow_core::{
    Config, WeatherError, WeatherProvider, WeatherSnapshot, provider_from_config,
};

use crate::display::{Report, Units};

/// Refreshing more often than this only burns API quota.
const MIN_REFRESH_SECS: u64 = 60;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weathernow", version, about = "Current weather and forecast from OpenWeatherMap")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeatherMap API key in the config file.
    Configure,

    /// Show current weather and forecast for a place.
    Show {
        #[command(flatten)]
        place: Place,

        #[arg(long, value_enum, default_value_t = Units::Metric)]
        units: Units,

        /// Print the normalized snapshot as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Look up places matching a partial name.
    Search {
        query: String,
    },

    /// Check that the API key and provider are reachable.
    Check,

    /// Keep showing fresh weather, refreshing on an interval.
    Watch {
        #[command(flatten)]
        place: Place,

        #[arg(long, value_enum, default_value_t = Units::Metric)]
        units: Units,

        /// Seconds between refreshes.
        #[arg(long, default_value_t = 600)]
        every: u64,
    },
}

/// Either a city name or a coordinate pair.
#[derive(Debug, Clone, Args)]
pub struct Place {
    /// City name, e.g. "Lisbon" or "Paris,FR".
    #[arg(conflicts_with_all = ["lat", "lon"], required_unless_present_all = ["lat", "lon"])]
    pub city: Option<String>,

    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,
}

impl Place {
    async fn fetch(&self, provider: &dyn WeatherProvider) -> Result<WeatherSnapshot, WeatherError> {
        match (&self.city, self.lat, self.lon) {
            (Some(city), _, _) => provider.weather_by_city(city).await,
            (None, Some(lat), Some(lon)) => provider.weather_by_coords(lat, lon).await,
            // clap rules out anything else
            _ => Err(WeatherError::InvalidCity),
        }
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure().await,
            Command::Show { place, units, json } => {
                let provider = load_provider()?;
                let snapshot = place.fetch(provider.as_ref()).await?;

                if json {
                    println!("{}", serde_json::to_string_pretty(&snapshot)?);
                } else {
                    print!("{}", Report { snapshot: &snapshot, units });
                }
                Ok(())
            }
            Command::Search { query } => {
                let provider = load_provider()?;
                let found = provider.location_suggestions(&query).await;

                if found.is_empty() {
                    println!("No matching places.");
                }
                for s in found {
                    println!("{}  ({:.2}, {:.2})", s.display_name, s.lat, s.lon);
                }
                Ok(())
            }
            Command::Check => {
                let provider = load_provider()?;
                let status = provider.test_connection().await;

                if !status.success {
                    bail!(status.message);
                }
                println!("{}", status.message);
                Ok(())
            }
            Command::Watch { place, units, every } => watch(place, units, every).await,
        }
    }
}

fn load_provider() -> anyhow::Result<Box<dyn WeatherProvider>> {
    let config = Config::load()?;
    Ok(provider_from_config(&config)?)
}

async fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("OpenWeatherMap API key:")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .prompt()
        .context("Failed to read API key")?;

    config.set_api_key(api_key);
    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());

    let status = provider_from_config(&config)?.test_connection().await;
    println!("{}", status.message);
    Ok(())
}

/// Sequential refreshes; a slow fetch delays the next tick instead of
/// overlapping with it. Ctrl-C stops between refreshes.
async fn watch(place: Place, units: Units, every: u64) -> anyhow::Result<()> {
    let provider = load_provider()?;

    let mut ticker = tokio::time::interval(Duration::from_secs(every.max(MIN_REFRESH_SECS)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
                match place.fetch(provider.as_ref()).await {
                    Ok(snapshot) => {
                        println!("[{stamp}]");
                        print!("{}", Report { snapshot: &snapshot, units });
                        println!();
                    }
                    Err(e) if e.is_retryable() => {
                        tracing::warn!("refresh failed, will try again: {}", e);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            _ = &mut ctrl_c => break,
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_accepts_a_city() {
        let cli = Cli::try_parse_from(["weathernow", "show", "Lisbon", "--units", "imperial"])
            .expect("parse");

        match cli.command {
            Command::Show { place, units, json } => {
                assert_eq!(place.city.as_deref(), Some("Lisbon"));
                assert_eq!(units, Units::Imperial);
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn show_accepts_negative_coordinates() {
        let cli = Cli::try_parse_from(["weathernow", "show", "--lat", "-33.87", "--lon", "151.21"])
            .expect("parse");

        match cli.command {
            Command::Show { place, .. } => {
                assert_eq!(place.city, None);
                assert_eq!(place.lat, Some(-33.87));
                assert_eq!(place.lon, Some(151.21));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn place_needs_city_or_both_coordinates() {
        assert!(Cli::try_parse_from(["weathernow", "show"]).is_err());
        assert!(Cli::try_parse_from(["weathernow", "show", "--lat", "10"]).is_err());
        assert!(Cli::try_parse_from(["weathernow", "show", "Oslo", "--lat", "1", "--lon", "2"]).is_err());
    }

    #[test]
    fn watch_defaults_to_ten_minutes() {
        let cli = Cli::try_parse_from(["weathernow", "watch", "Oslo"]).expect("parse");

        match cli.command {
            Command::Watch { every, units, .. } => {
                assert_eq!(every, 600);
                assert_eq!(units, Units::Metric);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
