use std::fmt;

use chrono::DateTime;
use clap::ValueEnum;
use weathernow_core::{WeatherSnapshot, weather_quality};

/// Display units. The core always works in metric; conversion happens here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    pub fn temperature(self, celsius: i32) -> String {
        match self {
            Units::Metric => format!("{celsius}°C"),
            Units::Imperial => {
                let f = (f64::from(celsius) * 9.0 / 5.0 + 32.0).round() as i32;
                format!("{f}°F")
            }
        }
    }

    pub fn speed(self, kmh: u32) -> String {
        match self {
            Units::Metric => format!("{kmh} km/h"),
            Units::Imperial => format!("{} mph", (f64::from(kmh) * 0.621_371).round() as u32),
        }
    }

    pub fn distance(self, km: u32) -> String {
        match self {
            Units::Metric => format!("{km} km"),
            Units::Imperial => format!("{} mi", (f64::from(km) * 0.621_371).round() as u32),
        }
    }
}

/// Human-readable rendering of a snapshot.
pub struct Report<'a> {
    pub snapshot: &'a WeatherSnapshot,
    pub units: Units,
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.snapshot;
        let u = self.units;
        let c = &s.current;

        write!(f, "{}, {}", s.location.name, s.location.country)?;
        if let Some(tz) = &s.location.timezone {
            write!(f, " ({tz})")?;
        }
        writeln!(f)?;

        writeln!(
            f,
            "  {}  {} ({})",
            u.temperature(c.temperature),
            c.condition,
            c.description
        )?;
        writeln!(
            f,
            "  Feels like {}, dew point ~{}",
            u.temperature(c.feels_like),
            u.temperature(c.dew_point)
        )?;
        writeln!(
            f,
            "  Humidity {}%, wind {} from {}°, pressure {} hPa",
            c.humidity,
            u.speed(c.wind_speed),
            c.wind_direction,
            c.pressure
        )?;
        writeln!(
            f,
            "  Visibility {}, clouds {}%",
            u.distance(c.visibility),
            c.cloudiness
        )?;
        writeln!(
            f,
            "  Sunrise {}, sunset {}",
            clock(c.sunrise),
            clock(c.sunset)
        )?;

        let quality = weather_quality(s);
        writeln!(f, "  Outdoor comfort: {} ({}/100)", quality.label, quality.score)?;

        if !s.hourly.is_empty() {
            writeln!(f, "\nNext hours:")?;
            for h in &s.hourly {
                writeln!(
                    f,
                    "  {:>5}  {:>6}  {:<12} {:>3}% rain",
                    h.hour,
                    u.temperature(h.temperature),
                    h.condition.as_str(),
                    h.pop
                )?;
            }
        }

        if !s.forecast.is_empty() {
            writeln!(f, "\nForecast:")?;
            for d in &s.forecast {
                writeln!(
                    f,
                    "  {} {}  {:>6} / {:<6}  {:<12} {:>3}% rain",
                    d.day_name,
                    d.date,
                    u.temperature(d.temp_max),
                    u.temperature(d.temp_min),
                    d.condition.as_str(),
                    d.pop
                )?;
            }
        }

        Ok(())
    }
}

fn clock(ts: i64) -> String {
    match DateTime::from_timestamp(ts, 0) {
        Some(dt) if ts > 0 => dt.format("%H:%M UTC").to_string(),
        _ => "n/a".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn imperial_conversions_round() {
        assert_eq!(Units::Imperial.temperature(20), "68°F");
        assert_eq!(Units::Imperial.temperature(-40), "-40°F");
        assert_eq!(Units::Imperial.speed(18), "11 mph");
        assert_eq!(Units::Imperial.distance(10), "6 mi");
        assert_eq!(Units::Metric.speed(18), "18 km/h");
    }

    #[test]
    fn report_renders_current_and_lists() {
        let snapshot = weathernow_core::normalize(
            &json!({
                "name": "Lisbon",
                "sys": { "country": "PT", "sunrise": 1714540000, "sunset": 0 },
                "main": { "temp": 19.6, "humidity": 55 },
                "weather": [{ "main": "Clear", "description": "clear sky" }],
                "wind": { "speed": 5.0 }
            }),
            Some(&json!({
                "list": [{
                    "dt": 1714543200,
                    "main": { "temp": 18.0 },
                    "weather": [{ "main": "Clouds" }]
                }]
            })),
        )
        .expect("snapshot");

        let text = Report { snapshot: &snapshot, units: Units::Metric }.to_string();

        assert!(text.starts_with("Lisbon, PT\n"));
        assert!(text.contains("20°C  Clear (clear sky)"));
        assert!(text.contains("wind 18 km/h"));
        assert!(text.contains("sunset n/a"));
        assert!(text.contains("Next hours:"));
        assert!(!text.contains("Forecast:"));
    }
}
