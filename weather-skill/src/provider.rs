use crate::{
    Config, WeatherError,
    model::{Coordinate, Geolocation, UnitSystem, WeatherReport},
    provider::{openweather::OpenWeatherProvider, weatherapi::WeatherApiProvider},
};
use async_trait::async_trait;
use reqwest::Client;
use std::{convert::TryFrom, fmt::Debug, time::Duration};

pub mod openweather;
pub mod weatherapi;

const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenWeather,
    WeatherApi,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "openweather",
            ProviderId::WeatherApi => "weatherapi",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::OpenWeather, ProviderId::WeatherApi]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "openweather" => Ok(ProviderId::OpenWeather),
            "weatherapi" => Ok(ProviderId::WeatherApi),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: openweather, weatherapi."
            )),
        }
    }
}

/// Where the report should be fetched for.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportLocation {
    Coordinate(Coordinate),
    /// Free-form place name from the utterance; the provider geocodes it.
    Place(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRequest {
    pub location: ReportLocation,
    pub units: UnitSystem,
    pub lang: String,
}

/// A fetched report together with the place it was resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderReport {
    /// `None` when the request was made by coordinate and the provider
    /// does not name the place.
    pub geolocation: Option<Geolocation>,
    pub report: WeatherReport,
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Fetch the current, hourly and daily report in one go.
    ///
    /// Failures are returned as-is; callers never retry.
    async fn get_report(&self, request: &ReportRequest) -> Result<ProviderReport, WeatherError>;
}

pub(crate) fn http_client() -> Result<Client, WeatherError> {
    Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(WeatherError::from)
}

/// Map a non-success HTTP status to the error taxonomy.
pub(crate) fn status_error(
    provider: ProviderId,
    status: reqwest::StatusCode,
    body: &str,
) -> WeatherError {
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        tracing::error!(%provider, %status, "weather provider rejected credentials");
        return WeatherError::AuthenticationFailure;
    }

    WeatherError::ProviderUnavailable(format!(
        "{provider} request failed with status {status}: {}",
        truncate_body(body)
    ))
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let cut = (0..=MAX).rev().find(|&i| body.is_char_boundary(i)).unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}

/// Construct a provider from config and explicit ProviderId.
pub fn provider_from_config(
    id: ProviderId,
    config: &Config,
) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let provider = config.provider_config(id).ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured for provider '{id}'.\n\
                 Hint: run `weather-skill configure {id}` and enter your API key."
        )
    })?;
    let api_key = provider.api_key.clone();
    let base_url = provider.base_url.clone();

    let boxed: Box<dyn WeatherProvider> = match id {
        ProviderId::OpenWeather => {
            let mut p = OpenWeatherProvider::new(api_key)?;
            if let Some(url) = base_url {
                p = p.with_base_url(url);
            }
            Box::new(p)
        }
        ProviderId::WeatherApi => {
            let mut p = WeatherApiProvider::new(api_key)?;
            if let Some(url) = base_url {
                p = p.with_base_url(url);
            }
            Box::new(p)
        }
    };

    Ok(boxed)
}

/// Construct the default provider from config, using `default_provider` field.
pub fn default_provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let id = config.default_provider_id()?;
    provider_from_config(id, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn provider_id_as_str_roundtrip() {
        for id in ProviderId::all() {
            let s = id.as_str();
            let parsed = ProviderId::try_from(s).expect("roundtrip should succeed");
            assert_eq!(*id, parsed);
        }
    }

    #[test]
    fn unknown_provider_error() {
        let err = ProviderId::try_from("doesnotexist").unwrap_err();
        assert!(err.to_string().contains("Unknown provider"));
    }

    #[test]
    fn provider_from_config_errors_when_missing_api_key() {
        let cfg = Config::default();
        let err = provider_from_config(ProviderId::OpenWeather, &cfg).unwrap_err();
        assert!(err.to_string().contains("No API key configured for provider"));
    }

    #[test]
    fn default_provider_from_config_errors_when_not_set() {
        let cfg = Config::default();
        let err = default_provider_from_config(&cfg).unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("No default provider configured"));
        assert!(msg.contains("Hint: run `weather-skill configure"));
    }

    #[test]
    fn default_provider_from_config_works_when_set_and_configured() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::WeatherApi, "KEY".to_string());

        let provider = default_provider_from_config(&cfg);
        assert!(provider.is_ok());
    }

    #[test]
    fn credential_statuses_map_to_authentication_failure() {
        let err = status_error(ProviderId::OpenWeather, reqwest::StatusCode::UNAUTHORIZED, "");
        assert!(matches!(err, WeatherError::AuthenticationFailure));

        let err = status_error(ProviderId::WeatherApi, reqwest::StatusCode::FORBIDDEN, "");
        assert!(matches!(err, WeatherError::AuthenticationFailure));

        let err = status_error(ProviderId::OpenWeather, reqwest::StatusCode::BAD_GATEWAY, "oops");
        match err {
            WeatherError::ProviderUnavailable(msg) => assert!(msg.contains("502")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let body = "é".repeat(150);
        let truncated = truncate_body(&body);
        assert!(truncated.ends_with("..."));
        assert!(truncated.len() <= 203);
    }
}
