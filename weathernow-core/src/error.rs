use reqwest::StatusCode;

/// Every failure the ingestion core can surface to a caller.
///
/// `Display` is the human-readable message shown to users verbatim;
/// [`WeatherError::code`] is the stable machine-readable classification.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    /// Missing or rejected credentials. The user has to fix their setup.
    #[error("{0}")]
    Config(String),

    #[error("Invalid coordinates provided: lat {lat}, lon {lon}")]
    InvalidCoords { lat: f64, lon: f64 },

    #[error("Please provide a valid city name")]
    InvalidCity,

    #[error("Location not found. Please check the city name.")]
    NotFound,

    /// The provider answered with a non-retryable error status.
    #[error("{message}")]
    Api { status: StatusCode, message: String },

    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Max retries exceeded")]
    RetryExhausted,

    #[error("Invalid weather data: {0}")]
    InvalidData(String),
}

impl WeatherError {
    pub(crate) fn missing_api_key() -> Self {
        WeatherError::Config(
            "Weather API key is not configured.\n\
             Hint: set WEATHER_API_KEY or run `weathernow configure`."
                .to_string(),
        )
    }

    pub(crate) fn invalid_api_key() -> Self {
        WeatherError::Config(
            "Invalid API key. Please check your OpenWeatherMap API key.".to_string(),
        )
    }

    pub fn code(&self) -> &'static str {
        match self {
            WeatherError::Config(_) => "CONFIG_ERROR",
            WeatherError::InvalidCoords { .. } => "INVALID_COORDS",
            WeatherError::InvalidCity => "INVALID_CITY",
            WeatherError::NotFound => "LOCATION_NOT_FOUND",
            WeatherError::Api { .. } => "API_ERROR",
            WeatherError::Network(_) => "NETWORK_ERROR",
            WeatherError::RetryExhausted => "RETRY_FAILED",
            WeatherError::InvalidData(_) => "INVALID_DATA",
        }
    }

    /// HTTP status attached to the failure, if the provider produced one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            WeatherError::Api { status, .. } => Some(*status),
            WeatherError::NotFound => Some(StatusCode::NOT_FOUND),
            _ => None,
        }
    }

    /// Whether a caller-driven manual retry has a chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WeatherError::Network(_) | WeatherError::RetryExhausted
        ) || matches!(self, WeatherError::Api { status, .. } if status.is_server_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(WeatherError::missing_api_key().code(), "CONFIG_ERROR");
        assert_eq!(WeatherError::InvalidCity.code(), "INVALID_CITY");
        assert_eq!(WeatherError::NotFound.code(), "LOCATION_NOT_FOUND");
        assert_eq!(WeatherError::RetryExhausted.code(), "RETRY_FAILED");
        assert_eq!(
            WeatherError::InvalidCoords { lat: 91.0, lon: 0.0 }.code(),
            "INVALID_COORDS"
        );
    }

    #[test]
    fn api_error_displays_provider_message_verbatim() {
        let err = WeatherError::Api {
            status: StatusCode::BAD_REQUEST,
            message: "API Error: wrong latitude".to_string(),
        };
        assert_eq!(err.to_string(), "API Error: wrong latitude");
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
        assert!(!err.is_retryable());
    }

    #[test]
    fn server_side_failures_are_retryable_by_the_caller() {
        let err = WeatherError::Api {
            status: StatusCode::BAD_GATEWAY,
            message: "API request failed: 502 Bad Gateway".to_string(),
        };
        assert!(err.is_retryable());
        assert!(WeatherError::RetryExhausted.is_retryable());
        assert!(!WeatherError::invalid_api_key().is_retryable());
    }
}
