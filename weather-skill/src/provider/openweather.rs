use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use reqwest::Client;
use serde::Deserialize;

use crate::{
    WeatherError,
    error::MAX_FORECAST_HOURS,
    model::{
        CompassPoint, Coordinate, CurrentWeather, DailyWeather, Geolocation, HourlyWeather,
        WeatherCondition, WeatherReport, whole_degrees,
    },
    provider::{
        ProviderId, ProviderReport, ReportLocation, ReportRequest, http_client, status_error,
    },
};

use super::WeatherProvider;

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";
const MAX_DAILY: usize = 8;

/// OpenWeather One Call adapter; place names go through the direct geocoding API.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Result<Self, WeatherError> {
        Ok(Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http: http_client()?,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn geocode(&self, place: &str) -> Result<(Coordinate, Geolocation), WeatherError> {
        let url = format!("{}/geo/1.0/direct", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[("q", place), ("limit", "1"), ("appid", self.api_key.as_str())])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(status_error(ProviderId::OpenWeather, status, &body));
        }

        let places: Vec<OwPlace> = serde_json::from_str(&body).map_err(|e| {
            WeatherError::ProviderUnavailable(format!(
                "Failed to parse OpenWeather geocoding JSON: {e}"
            ))
        })?;

        let found = places
            .into_iter()
            .next()
            .ok_or_else(|| WeatherError::LocationNotFound(place.to_string()))?;

        tracing::debug!(place, city = %found.name, "geocoded place name");

        Ok((
            Coordinate { latitude: found.lat, longitude: found.lon },
            Geolocation {
                city: found.name,
                region: found.state.unwrap_or_default(),
                country: found.country,
            },
        ))
    }

    async fn fetch_one_call(
        &self,
        coordinate: Coordinate,
        request: &ReportRequest,
    ) -> Result<WeatherReport, WeatherError> {
        let url = format!("{}/data/3.0/onecall", self.base_url);
        let lat = coordinate.latitude.to_string();
        let lon = coordinate.longitude.to_string();

        let res = self
            .http
            .get(&url)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("units", request.units.as_str()),
                ("lang", request.lang.as_str()),
                ("exclude", "minutely,alerts"),
                ("appid", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(status_error(ProviderId::OpenWeather, status, &body));
        }

        let parsed: OcResponse = serde_json::from_str(&body).map_err(|e| {
            WeatherError::ProviderUnavailable(format!(
                "Failed to parse OpenWeather One Call JSON: {e}"
            ))
        })?;

        report_from_one_call(parsed)
    }
}

#[derive(Debug, Deserialize)]
struct OwPlace {
    name: String,
    lat: f64,
    lon: f64,
    country: String,
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    id: u32,
    main: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct OcCurrent {
    dt: i64,
    sunrise: i64,
    sunset: i64,
    temp: f64,
    feels_like: f64,
    humidity: u8,
    wind_speed: f64,
    wind_deg: f64,
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OcHourly {
    dt: i64,
    temp: f64,
    feels_like: f64,
    humidity: u8,
    wind_speed: f64,
    wind_deg: f64,
    #[serde(default)]
    pop: f64,
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OcDailyTemp {
    min: f64,
    max: f64,
}

#[derive(Debug, Deserialize)]
struct OcDaily {
    dt: i64,
    sunrise: i64,
    sunset: i64,
    temp: OcDailyTemp,
    humidity: u8,
    wind_speed: f64,
    wind_deg: f64,
    #[serde(default)]
    pop: f64,
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OcResponse {
    timezone_offset: i32,
    current: OcCurrent,
    #[serde(default)]
    hourly: Vec<OcHourly>,
    #[serde(default)]
    daily: Vec<OcDaily>,
}

fn report_from_one_call(parsed: OcResponse) -> Result<WeatherReport, WeatherError> {
    let offset = FixedOffset::east_opt(parsed.timezone_offset).ok_or_else(|| {
        WeatherError::ProviderUnavailable(format!(
            "OpenWeather returned invalid timezone offset {}",
            parsed.timezone_offset
        ))
    })?;

    let daily = parsed
        .daily
        .iter()
        .take(MAX_DAILY)
        .map(|d| {
            Ok(DailyWeather {
                date_time: local_time(d.dt, offset)?,
                temperature_high: whole_degrees(d.temp.max),
                temperature_low: whole_degrees(d.temp.min),
                condition: condition(&d.weather),
                wind_speed: d.wind_speed,
                wind_direction: CompassPoint::from_degrees(d.wind_deg),
                humidity: d.humidity,
                chance_of_precipitation: percent(d.pop),
                sunrise: local_time(d.sunrise, offset)?,
                sunset: local_time(d.sunset, offset)?,
            })
        })
        .collect::<Result<Vec<_>, WeatherError>>()?;

    let hourly = parsed
        .hourly
        .iter()
        .take(MAX_FORECAST_HOURS)
        .map(|h| {
            Ok(HourlyWeather {
                date_time: local_time(h.dt, offset)?,
                temperature: whole_degrees(h.temp),
                feels_like: whole_degrees(h.feels_like),
                condition: condition(&h.weather),
                wind_speed: h.wind_speed,
                wind_direction: CompassPoint::from_degrees(h.wind_deg),
                humidity: h.humidity,
                chance_of_precipitation: percent(h.pop),
            })
        })
        .collect::<Result<Vec<_>, WeatherError>>()?;

    let c = &parsed.current;
    let temperature = whole_degrees(c.temp);
    let (temperature_high, temperature_low) = daily
        .first()
        .map(|today| (today.temperature_high, today.temperature_low))
        .unwrap_or((temperature, temperature));

    let current = CurrentWeather {
        date_time: local_time(c.dt, offset)?,
        temperature,
        feels_like: whole_degrees(c.feels_like),
        temperature_high,
        temperature_low,
        condition: condition(&c.weather),
        wind_speed: c.wind_speed,
        wind_direction: CompassPoint::from_degrees(c.wind_deg),
        humidity: c.humidity,
        sunrise: local_time(c.sunrise, offset)?,
        sunset: local_time(c.sunset, offset)?,
    };

    Ok(WeatherReport { current, hourly, daily })
}

fn condition(weather: &[OwWeather]) -> WeatherCondition {
    weather
        .first()
        .map(|w| WeatherCondition::from_openweather(w.id, &w.main, &w.description))
        .unwrap_or_else(|| WeatherCondition::from_openweather(800, "Clear", "clear sky"))
}

fn percent(probability: f64) -> u8 {
    (probability.clamp(0.0, 1.0) * 100.0).round() as u8
}

fn local_time(ts: i64, offset: FixedOffset) -> Result<DateTime<FixedOffset>, WeatherError> {
    DateTime::from_timestamp(ts, 0)
        .map(|utc| utc.with_timezone(&offset))
        .ok_or_else(|| {
            WeatherError::ProviderUnavailable(format!(
                "OpenWeather returned invalid timestamp {ts}"
            ))
        })
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn get_report(&self, request: &ReportRequest) -> Result<ProviderReport, WeatherError> {
        let (coordinate, geolocation) = match &request.location {
            ReportLocation::Coordinate(coordinate) => (*coordinate, None),
            ReportLocation::Place(place) => {
                let (coordinate, geolocation) = self.geocode(place).await?;
                (coordinate, Some(geolocation))
            }
        };

        let report = self.fetch_one_call(coordinate, request).await?;

        Ok(ProviderReport { geolocation, report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UnitSystem;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BASE_TS: i64 = 1_718_366_400; // 2024-06-14 12:00:00 UTC

    fn weather(id: u32, main: &str, description: &str) -> serde_json::Value {
        json!([{ "id": id, "main": main, "description": description, "icon": "01d" }])
    }

    fn one_call_body() -> serde_json::Value {
        let hourly: Vec<_> = (0..50)
            .map(|h| {
                json!({
                    "dt": BASE_TS + h * 3600,
                    "temp": 20.4 + h as f64 * 0.1,
                    "feels_like": 19.0,
                    "humidity": 60,
                    "wind_speed": 3.5,
                    "wind_deg": 90,
                    "pop": 0.25,
                    "weather": weather(803, "Clouds", "broken clouds"),
                })
            })
            .collect();
        let daily: Vec<_> = (0..8)
            .map(|d| {
                json!({
                    "dt": BASE_TS + d * 86_400,
                    "sunrise": BASE_TS - 6 * 3600 + d * 86_400,
                    "sunset": BASE_TS + 8 * 3600 + d * 86_400,
                    "temp": { "min": 12.6, "max": 24.4, "day": 20.0 },
                    "humidity": 55,
                    "wind_speed": 4.0,
                    "wind_deg": 180,
                    "pop": 0.6,
                    "weather": weather(500, "Rain", "light rain"),
                })
            })
            .collect();

        json!({
            "lat": 38.97,
            "lon": -95.24,
            "timezone": "America/Chicago",
            "timezone_offset": -18_000,
            "current": {
                "dt": BASE_TS,
                "sunrise": BASE_TS - 6 * 3600,
                "sunset": BASE_TS + 8 * 3600,
                "temp": 21.6,
                "feels_like": 21.0,
                "humidity": 58,
                "wind_speed": 2.1,
                "wind_deg": 45,
                "weather": weather(801, "Clouds", "few clouds"),
            },
            "hourly": hourly,
            "daily": daily,
        })
    }

    fn request(location: ReportLocation) -> ReportRequest {
        ReportRequest { location, units: UnitSystem::Metric, lang: "en-us".into() }
    }

    #[test]
    fn one_call_response_is_normalized() {
        let parsed: OcResponse = serde_json::from_value(one_call_body()).expect("valid fixture");
        let report = report_from_one_call(parsed).expect("report");

        assert_eq!(report.hourly.len(), MAX_FORECAST_HOURS);
        assert_eq!(report.daily.len(), 8);
        assert_eq!(report.current.temperature, 22);
        assert_eq!(report.current.temperature_high, 24);
        assert_eq!(report.current.temperature_low, 13);
        assert_eq!(report.current.wind_direction, CompassPoint::NorthEast);
        assert_eq!(report.current.date_time.offset().local_minus_utc(), -18_000);
        assert_eq!(report.hourly[0].chance_of_precipitation, 25);
        assert_eq!(report.daily[1].condition.category, "Rain");
        assert_eq!(report.daily[1].chance_of_precipitation, 60);
    }

    #[tokio::test]
    async fn fetches_report_by_coordinate() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/3.0/onecall"))
            .and(query_param("units", "metric"))
            .and(query_param("appid", "KEY"))
            .respond_with(ResponseTemplate::new(200).set_body_json(one_call_body()))
            .expect(1)
            .mount(&server)
            .await;

        let provider = OpenWeatherProvider::new("KEY".into()).unwrap().with_base_url(server.uri());
        let coordinate = Coordinate { latitude: 38.97, longitude: -95.24 };
        let request = request(ReportLocation::Coordinate(coordinate));
        let result = provider.get_report(&request).await.unwrap();

        assert!(result.geolocation.is_none());
        assert_eq!(result.report.current.condition.description, "few clouds");
    }

    #[tokio::test]
    async fn geocodes_place_names_before_fetching() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .and(query_param("q", "Berlin"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "name": "Berlin", "lat": 52.52, "lon": 13.40, "country": "DE", "state": "Berlin" }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/data/3.0/onecall"))
            .and(query_param("lat", "52.52"))
            .respond_with(ResponseTemplate::new(200).set_body_json(one_call_body()))
            .mount(&server)
            .await;

        let provider = OpenWeatherProvider::new("KEY".into()).unwrap().with_base_url(server.uri());
        let request = request(ReportLocation::Place("Berlin".into()));
        let result = provider.get_report(&request).await.unwrap();

        let geo = result.geolocation.expect("geolocation");
        assert_eq!(geo.city, "Berlin");
        assert_eq!(geo.country, "DE");
    }

    #[tokio::test]
    async fn unknown_place_is_location_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let provider = OpenWeatherProvider::new("KEY".into()).unwrap().with_base_url(server.uri());
        let err = provider
            .get_report(&request(ReportLocation::Place("Atlantis".into())))
            .await
            .unwrap_err();

        match err {
            WeatherError::LocationNotFound(place) => assert_eq!(place, "Atlantis"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unauthorized_is_authentication_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/3.0/onecall"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "cod": 401 })))
            .mount(&server)
            .await;

        let provider = OpenWeatherProvider::new("BAD".into()).unwrap().with_base_url(server.uri());
        let coordinate = Coordinate { latitude: 0.0, longitude: 0.0 };
        let request = request(ReportLocation::Coordinate(coordinate));
        let err = provider.get_report(&request).await.unwrap_err();

        assert!(matches!(err, WeatherError::AuthenticationFailure));
    }

    #[tokio::test]
    async fn server_errors_and_garbage_are_provider_unavailable() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/3.0/onecall"))
            .and(query_param("lat", "1"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/data/3.0/onecall"))
            .and(query_param("lat", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let provider = OpenWeatherProvider::new("KEY".into()).unwrap().with_base_url(server.uri());

        for latitude in [1.0, 2.0] {
            let coordinate = Coordinate { latitude, longitude: 0.0 };
            let request = request(ReportLocation::Coordinate(coordinate));
            let err = provider.get_report(&request).await.unwrap_err();
            assert!(
                matches!(err, WeatherError::ProviderUnavailable(_)),
                "latitude {latitude}: {err:?}"
            );
        }
    }
}
