use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use reqwest::Client;
use serde::Deserialize;

use crate::{
    WeatherError,
    error::MAX_FORECAST_HOURS,
    model::{
        CompassPoint, CurrentWeather, DailyWeather, Geolocation, HourlyWeather, UnitSystem,
        WeatherCondition, WeatherReport, whole_degrees,
    },
    provider::{
        ProviderId, ProviderReport, ReportLocation, ReportRequest, http_client, status_error,
    },
};

use super::WeatherProvider;

const DEFAULT_BASE_URL: &str = "https://api.weatherapi.com";
const FORECAST_DAYS: &str = "8";
const NO_MATCHING_LOCATION: u32 = 1006;

/// WeatherAPI.com adapter; the forecast endpoint geocodes `q` itself.
#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl WeatherApiProvider {
    pub fn new(api_key: String) -> Result<Self, WeatherError> {
        Ok(Self { api_key, base_url: DEFAULT_BASE_URL.to_string(), http: http_client()? })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Deserialize)]
struct WaLocation {
    name: String,
    #[serde(default)]
    region: String,
    #[serde(default)]
    country: String,
    localtime_epoch: i64,
    localtime: String,
}

#[derive(Debug, Deserialize)]
struct WaCondition {
    text: String,
    code: u32,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
    temp_f: f64,
    feelslike_c: f64,
    feelslike_f: f64,
    humidity: u8,
    wind_kph: f64,
    wind_mph: f64,
    wind_degree: f64,
    condition: WaCondition,
}

#[derive(Debug, Deserialize)]
struct WaHour {
    time_epoch: i64,
    temp_c: f64,
    temp_f: f64,
    feelslike_c: f64,
    feelslike_f: f64,
    humidity: u8,
    wind_kph: f64,
    wind_mph: f64,
    wind_degree: f64,
    #[serde(default)]
    chance_of_rain: u8,
    #[serde(default)]
    chance_of_snow: u8,
    condition: WaCondition,
}

#[derive(Debug, Deserialize)]
struct WaDay {
    maxtemp_c: f64,
    maxtemp_f: f64,
    mintemp_c: f64,
    mintemp_f: f64,
    avghumidity: f64,
    maxwind_kph: f64,
    maxwind_mph: f64,
    #[serde(default)]
    daily_chance_of_rain: u8,
    #[serde(default)]
    daily_chance_of_snow: u8,
    condition: WaCondition,
}

#[derive(Debug, Deserialize)]
struct WaAstro {
    sunrise: String,
    sunset: String,
}

#[derive(Debug, Deserialize)]
struct WaForecastDay {
    date: NaiveDate,
    day: WaDay,
    astro: WaAstro,
    #[serde(default)]
    hour: Vec<WaHour>,
}

#[derive(Debug, Deserialize)]
struct WaForecast {
    forecastday: Vec<WaForecastDay>,
}

#[derive(Debug, Deserialize)]
struct WaForecastResponse {
    location: WaLocation,
    current: WaCurrent,
    forecast: WaForecast,
}

#[derive(Debug, Deserialize)]
struct WaErrorBody {
    error: WaErrorDetail,
}

#[derive(Debug, Deserialize)]
struct WaErrorDetail {
    code: u32,
}

/// Map WeatherAPI condition codes onto OpenWeather style categories.
fn condition(c: &WaCondition) -> WeatherCondition {
    let (category, animated_code) = match c.code {
        1000 => ("Clear", 0),
        1003 => ("Clouds", 1),
        1006 | 1009 => ("Clouds", 2),
        1030 => ("Mist", 7),
        1135 | 1147 => ("Fog", 7),
        1063 | 1072 | 1150 | 1153 | 1168 | 1171 => ("Drizzle", 3),
        1180 | 1183 | 1240 => ("Rain", 3),
        1186..=1201 | 1243 | 1246 => ("Rain", 4),
        1066 | 1069 | 1114 | 1117 | 1204..=1237 | 1249..=1264 => ("Snow", 6),
        1087 | 1273..=1282 => ("Thunderstorm", 5),
        _ => ("Clouds", 2),
    };

    WeatherCondition {
        category: category.to_string(),
        description: c.text.trim().to_lowercase(),
        code: c.code,
        animated_code,
    }
}

/// Offset of the location's clock, derived from its local time and epoch.
fn location_offset(location: &WaLocation) -> Result<FixedOffset, WeatherError> {
    let local = NaiveDateTime::parse_from_str(&location.localtime, "%Y-%m-%d %H:%M").map_err(|e| {
        WeatherError::ProviderUnavailable(format!(
            "WeatherAPI returned unparseable localtime '{}': {e}",
            location.localtime
        ))
    })?;
    let utc = DateTime::from_timestamp(location.localtime_epoch, 0)
        .ok_or_else(|| invalid_timestamp(location.localtime_epoch))?
        .naive_utc();

    let quarter_hours = ((local - utc).num_seconds() as f64 / 900.0).round() as i32;
    FixedOffset::east_opt(quarter_hours * 900).ok_or_else(|| {
        WeatherError::ProviderUnavailable("WeatherAPI returned an impossible UTC offset".into())
    })
}

fn invalid_timestamp(ts: i64) -> WeatherError {
    WeatherError::ProviderUnavailable(format!("WeatherAPI returned invalid timestamp {ts}"))
}

fn local_time(ts: i64, offset: FixedOffset) -> Result<DateTime<FixedOffset>, WeatherError> {
    DateTime::from_timestamp(ts, 0)
        .map(|utc| utc.with_timezone(&offset))
        .ok_or_else(|| invalid_timestamp(ts))
}

fn on_date(
    date: NaiveDate,
    time: NaiveTime,
    offset: FixedOffset,
) -> Result<DateTime<FixedOffset>, WeatherError> {
    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .ok_or_else(|| {
            WeatherError::ProviderUnavailable(format!("invalid local time {date} {time}"))
        })
}

fn astro_time(
    date: NaiveDate,
    value: &str,
    offset: FixedOffset,
) -> Result<DateTime<FixedOffset>, WeatherError> {
    let time = NaiveTime::parse_from_str(value.trim(), "%I:%M %p").map_err(|e| {
        WeatherError::ProviderUnavailable(format!(
            "WeatherAPI returned unparseable time '{value}': {e}"
        ))
    })?;
    on_date(date, time, offset)
}

fn report_from_forecast(
    parsed: &WaForecastResponse,
    units: UnitSystem,
) -> Result<WeatherReport, WeatherError> {
    let offset = location_offset(&parsed.location)?;
    let imperial = units == UnitSystem::Imperial;
    let speed = |kph: f64, mph: f64| if imperial { mph } else { kph / 3.6 };
    let temp = |c: f64, f: f64| whole_degrees(if imperial { f } else { c });

    let daily = parsed
        .forecast
        .forecastday
        .iter()
        .map(|fd| {
            let wind_degree = fd
                .hour
                .get(12)
                .or_else(|| fd.hour.first())
                .map(|h| h.wind_degree)
                .unwrap_or(0.0);
            let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN);

            Ok(DailyWeather {
                date_time: on_date(fd.date, noon, offset)?,
                temperature_high: temp(fd.day.maxtemp_c, fd.day.maxtemp_f),
                temperature_low: temp(fd.day.mintemp_c, fd.day.mintemp_f),
                condition: condition(&fd.day.condition),
                wind_speed: speed(fd.day.maxwind_kph, fd.day.maxwind_mph),
                wind_direction: CompassPoint::from_degrees(wind_degree),
                humidity: fd.day.avghumidity.round().clamp(0.0, 100.0) as u8,
                chance_of_precipitation: fd
                    .day
                    .daily_chance_of_rain
                    .max(fd.day.daily_chance_of_snow),
                sunrise: astro_time(fd.date, &fd.astro.sunrise, offset)?,
                sunset: astro_time(fd.date, &fd.astro.sunset, offset)?,
            })
        })
        .collect::<Result<Vec<_>, WeatherError>>()?;

    let now = parsed.location.localtime_epoch;
    let hour_start = now - now.rem_euclid(3600);
    let hourly = parsed
        .forecast
        .forecastday
        .iter()
        .flat_map(|fd| fd.hour.iter())
        .filter(|h| h.time_epoch >= hour_start)
        .take(MAX_FORECAST_HOURS)
        .map(|h| {
            Ok(HourlyWeather {
                date_time: local_time(h.time_epoch, offset)?,
                temperature: temp(h.temp_c, h.temp_f),
                feels_like: temp(h.feelslike_c, h.feelslike_f),
                condition: condition(&h.condition),
                wind_speed: speed(h.wind_kph, h.wind_mph),
                wind_direction: CompassPoint::from_degrees(h.wind_degree),
                humidity: h.humidity,
                chance_of_precipitation: h.chance_of_rain.max(h.chance_of_snow),
            })
        })
        .collect::<Result<Vec<_>, WeatherError>>()?;

    let today = daily.first().ok_or_else(|| {
        WeatherError::ProviderUnavailable(
            "WeatherAPI response contained no forecastday data".into(),
        )
    })?;

    let c = &parsed.current;
    let current = CurrentWeather {
        date_time: local_time(now, offset)?,
        temperature: temp(c.temp_c, c.temp_f),
        feels_like: temp(c.feelslike_c, c.feelslike_f),
        temperature_high: today.temperature_high,
        temperature_low: today.temperature_low,
        condition: condition(&c.condition),
        wind_speed: speed(c.wind_kph, c.wind_mph),
        wind_direction: CompassPoint::from_degrees(c.wind_degree),
        humidity: c.humidity,
        sunrise: today.sunrise,
        sunset: today.sunset,
    };

    Ok(WeatherReport { current, hourly, daily })
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    async fn get_report(&self, request: &ReportRequest) -> Result<ProviderReport, WeatherError> {
        let url = format!("{}/v1/forecast.json", self.base_url);
        let q = match &request.location {
            ReportLocation::Coordinate(c) => format!("{},{}", c.latitude, c.longitude),
            ReportLocation::Place(place) => place.clone(),
        };
        let lang = request.lang.split('-').next().unwrap_or("en");

        let res = self
            .http
            .get(&url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("q", q.as_str()),
                ("days", FORECAST_DAYS),
                ("aqi", "no"),
                ("alerts", "no"),
                ("lang", lang),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            let api_code = serde_json::from_str::<WaErrorBody>(&body).ok().map(|b| b.error.code);
            if status == reqwest::StatusCode::BAD_REQUEST
                && api_code == Some(NO_MATCHING_LOCATION)
            {
                return Err(WeatherError::LocationNotFound(q));
            }
            return Err(status_error(ProviderId::WeatherApi, status, &body));
        }

        let parsed: WaForecastResponse = serde_json::from_str(&body).map_err(|e| {
            WeatherError::ProviderUnavailable(format!(
                "Failed to parse WeatherAPI forecast JSON: {e}"
            ))
        })?;

        let report = report_from_forecast(&parsed, request.units)?;

        let geolocation = match &request.location {
            ReportLocation::Place(_) => Some(Geolocation {
                city: parsed.location.name.clone(),
                region: parsed.location.region.clone(),
                country: parsed.location.country.clone(),
            }),
            ReportLocation::Coordinate(_) => None,
        };

        Ok(ProviderReport { geolocation, report })
    }
}
