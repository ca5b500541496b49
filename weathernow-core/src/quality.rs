//! Outdoor comfort score derived from a snapshot's current conditions.

use serde::{Deserialize, Serialize};

use crate::model::{Condition, WeatherSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityLabel {
    Excellent,
    Good,
    Fair,
    Poor,
    VeryPoor,
}

impl QualityLabel {
    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => QualityLabel::Excellent,
            60..=79 => QualityLabel::Good,
            40..=59 => QualityLabel::Fair,
            20..=39 => QualityLabel::Poor,
            _ => QualityLabel::VeryPoor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityLabel::Excellent => "Excellent",
            QualityLabel::Good => "Good",
            QualityLabel::Fair => "Fair",
            QualityLabel::Poor => "Poor",
            QualityLabel::VeryPoor => "Very Poor",
        }
    }
}

impl std::fmt::Display for QualityLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherQuality {
    /// 0..=100
    pub score: u8,
    pub label: QualityLabel,
    /// What moved the score, in evaluation order.
    pub factors: Vec<String>,
}

pub fn weather_quality(snapshot: &WeatherSnapshot) -> WeatherQuality {
    let current = &snapshot.current;
    let mut score: i32 = 50;
    let mut factors = Vec::new();
    let mut adjust = |delta: i32, factor: &str| {
        score += delta;
        factors.push(factor.to_string());
    };

    match current.temperature {
        20..=25 => adjust(20, "Perfect temperature"),
        15..=30 => adjust(10, "Comfortable temperature"),
        t if !(0..=35).contains(&t) => adjust(-20, "Extreme temperature"),
        _ => {}
    }

    match current.humidity {
        40..=60 => adjust(15, "Ideal humidity"),
        h if h < 30 => adjust(-10, "Very dry"),
        h if h > 70 => adjust(-10, "Very humid"),
        _ => {}
    }

    match current.wind_speed {
        w if w < 10 => adjust(10, "Calm winds"),
        w if w > 30 => adjust(-15, "Strong winds"),
        _ => {}
    }

    match current.condition {
        Condition::Clear => adjust(15, "Clear skies"),
        Condition::Clouds => adjust(5, "Partly cloudy"),
        Condition::Rain | Condition::Thunderstorm => adjust(-20, "Rainy weather"),
        _ => {}
    }

    match current.visibility {
        v if v >= 10 => adjust(5, "Excellent visibility"),
        v if v < 5 => adjust(-10, "Poor visibility"),
        _ => {}
    }

    let score = score.clamp(0, 100) as u8;
    WeatherQuality {
        score,
        label: QualityLabel::from_score(score),
        factors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use serde_json::json;

    fn snapshot(temp: f64, humidity: u32, wind_mps: f64, condition: &str, visibility_m: u32) -> WeatherSnapshot {
        normalize(
            &json!({
                "main": { "temp": temp, "humidity": humidity },
                "weather": [{ "main": condition }],
                "wind": { "speed": wind_mps },
                "visibility": visibility_m
            }),
            None,
        )
        .expect("snapshot")
    }

    #[test]
    fn ideal_day_scores_excellent_and_is_clamped() {
        let q = weather_quality(&snapshot(22.0, 50, 1.0, "Clear", 10000));

        // 50 + 20 + 15 + 10 + 15 + 5 = 115
        assert_eq!(q.score, 100);
        assert_eq!(q.label, QualityLabel::Excellent);
        assert_eq!(
            q.factors,
            vec![
                "Perfect temperature",
                "Ideal humidity",
                "Calm winds",
                "Clear skies",
                "Excellent visibility",
            ]
        );
    }

    #[test]
    fn stormy_day_scores_very_poor() {
        // 50 - 20 (cold) - 10 (humid) - 15 (wind 36 km/h) - 20 (storm) - 10 (2 km)
        let q = weather_quality(&snapshot(-4.0, 90, 10.0, "Thunderstorm", 2000));

        assert_eq!(q.score, 0);
        assert_eq!(q.label, QualityLabel::VeryPoor);
        assert!(q.factors.contains(&"Very humid".to_string()));
        assert!(q.factors.contains(&"Rainy weather".to_string()));
    }

    #[test]
    fn middling_values_leave_the_score_alone() {
        // 12°C, 65%, 18 km/h, mist, 7 km: nothing applies
        let q = weather_quality(&snapshot(12.0, 65, 5.0, "Mist", 7000));

        assert_eq!(q.score, 50);
        assert_eq!(q.label, QualityLabel::Fair);
        assert!(q.factors.is_empty());
    }

    #[test]
    fn drizzle_is_not_penalized_like_rain() {
        // 12°C, 65%, 18 km/h, 7 km: only the condition could move the score
        let drizzle = weather_quality(&snapshot(12.0, 65, 5.0, "Drizzle", 7000));
        assert_eq!(drizzle.score, 50);
        assert!(drizzle.factors.is_empty());

        let rain = weather_quality(&snapshot(12.0, 65, 5.0, "Rain", 7000));
        assert_eq!(rain.score, 30);
        assert_eq!(rain.factors, vec!["Rainy weather"]);
    }

    #[test]
    fn labels_follow_score_bands() {
        assert_eq!(QualityLabel::from_score(80), QualityLabel::Excellent);
        assert_eq!(QualityLabel::from_score(60), QualityLabel::Good);
        assert_eq!(QualityLabel::from_score(40), QualityLabel::Fair);
        assert_eq!(QualityLabel::from_score(20), QualityLabel::Poor);
        assert_eq!(QualityLabel::from_score(19), QualityLabel::VeryPoor);
        assert_eq!(QualityLabel::VeryPoor.to_string(), "Very Poor");
    }
}
