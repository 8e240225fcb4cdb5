use thiserror::Error;

/// Longest hourly horizon any provider is asked to cover.
pub const MAX_FORECAST_HOURS: usize = 48;

/// Number of days after today a forecast can cover.
pub const MAX_FORECAST_DAYS: usize = 7;

/// Everything that can end a weather request early.
///
/// Each variant maps to at most one spoken fallback, see
/// [`WeatherError::fallback_dialog`].
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("could not understand the weather request: {0}")]
    MalformedQuery(String),

    #[error("weather provider rejected the configured credentials")]
    AuthenticationFailure,

    #[error("location '{0}' could not be found")]
    LocationNotFound(String),

    #[error("weather provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("requested hour offset {requested} exceeds the {MAX_FORECAST_HOURS} hour forecast")]
    HourOutOfRange { requested: i64 },

    #[error("requested {requested} days but only {available} days are available")]
    DayCountOutOfRange { requested: i64, available: usize },

    #[error("speech output failed: {0}")]
    Speech(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl WeatherError {
    /// Name of the dialog spoken when this error ends a request.
    ///
    /// `None` means the failure is reported some other way (a pairing
    /// signal for credential errors, the caller's own handling for speech
    /// and configuration errors).
    pub fn fallback_dialog(&self) -> Option<&'static str> {
        match self {
            WeatherError::MalformedQuery(_) | WeatherError::ProviderUnavailable(_) => {
                Some("cant-get-forecast")
            }
            WeatherError::LocationNotFound(_) => Some("location-not-found"),
            WeatherError::HourOutOfRange { .. } => Some("forty-eight-hours-available"),
            WeatherError::DayCountOutOfRange { available, .. }
                if *available < MAX_FORECAST_DAYS =>
            {
                Some("days-available")
            }
            WeatherError::DayCountOutOfRange { .. } => Some("seven-days-available"),
            WeatherError::AuthenticationFailure
            | WeatherError::Speech(_)
            | WeatherError::Config(_) => None,
        }
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        WeatherError::ProviderUnavailable(err.to_string())
    }
}
