use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{
    WeatherError,
    config::WeatherConfig,
    model::{Coordinate, UnitSystem},
    vocab::{self, Vocab},
};

/// Hours ahead reported for "later".
const LATER_HOURS: i64 = 3;

/// Intents the parser can hand to the skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum IntentKind {
    CurrentWeather,
    LikeOutside,
    NumberDaysForecast,
    OneDayForecast,
    WeatherLater,
    WeatherAtTime,
    WeekendForecast,
    WeekWeather,
    CurrentTemperature,
    DailyTemperature,
    HourlyTemperature,
    HighTemperature,
    LowTemperature,
    IsHot,
    HowHotOrCold,
    IsWindy,
    CurrentWind,
    IsSnow,
    IsClear,
    IsCloudy,
    IsFog,
    IsRain,
    NeedUmbrella,
    IsStormy,
    NextRain,
    Humidity,
    Sunrise,
    Sunset,
}

impl IntentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::CurrentWeather => "current_weather",
            IntentKind::LikeOutside => "like_outside",
            IntentKind::NumberDaysForecast => "N_days_forecast",
            IntentKind::OneDayForecast => "one_day_forecast",
            IntentKind::WeatherLater => "weather_later",
            IntentKind::WeatherAtTime => "weather_at_time",
            IntentKind::WeekendForecast => "weekend_forecast",
            IntentKind::WeekWeather => "week_weather",
            IntentKind::CurrentTemperature => "current_temperature",
            IntentKind::DailyTemperature => "daily_temperature",
            IntentKind::HourlyTemperature => "hourly_temperature",
            IntentKind::HighTemperature => "high_temperature",
            IntentKind::LowTemperature => "low_temperature",
            IntentKind::IsHot => "is_hot",
            IntentKind::HowHotOrCold => "how_hot_or_cold",
            IntentKind::IsWindy => "is_wind",
            IntentKind::CurrentWind => "current_wind",
            IntentKind::IsSnow => "is_snow",
            IntentKind::IsClear => "is_clear",
            IntentKind::IsCloudy => "is_cloudy",
            IntentKind::IsFog => "is_fog",
            IntentKind::IsRain => "is_rain",
            IntentKind::NeedUmbrella => "need_umbrella",
            IntentKind::IsStormy => "is_stormy",
            IntentKind::NextRain => "next_rain",
            IntentKind::Humidity => "humidity",
            IntentKind::Sunrise => "sunrise",
            IntentKind::Sunset => "sunset",
        }
    }

    pub const fn all() -> &'static [IntentKind] {
        &[
            IntentKind::CurrentWeather,
            IntentKind::LikeOutside,
            IntentKind::NumberDaysForecast,
            IntentKind::OneDayForecast,
            IntentKind::WeatherLater,
            IntentKind::WeatherAtTime,
            IntentKind::WeekendForecast,
            IntentKind::WeekWeather,
            IntentKind::CurrentTemperature,
            IntentKind::DailyTemperature,
            IntentKind::HourlyTemperature,
            IntentKind::HighTemperature,
            IntentKind::LowTemperature,
            IntentKind::IsHot,
            IntentKind::HowHotOrCold,
            IntentKind::IsWindy,
            IntentKind::CurrentWind,
            IntentKind::IsSnow,
            IntentKind::IsClear,
            IntentKind::IsCloudy,
            IntentKind::IsFog,
            IntentKind::IsRain,
            IntentKind::NeedUmbrella,
            IntentKind::IsStormy,
            IntentKind::NextRain,
            IntentKind::Humidity,
            IntentKind::Sunrise,
            IntentKind::Sunset,
        ]
    }
}

impl std::fmt::Display for IntentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for IntentKind {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        IntentKind::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| anyhow::anyhow!("Unknown weather intent '{value}'."))
    }
}

impl TryFrom<String> for IntentKind {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        IntentKind::try_from(value.as_str())
    }
}

impl From<IntentKind> for String {
    fn from(kind: IntentKind) -> Self {
        kind.as_str().to_string()
    }
}

/// A matched intent as delivered by the intent parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentMessage {
    pub intent: IntentKind,
    pub utterance: String,
    /// Slot values keyed by slot name, e.g. "location" or "unit".
    #[serde(default)]
    pub slots: HashMap<String, String>,
    /// Coordinate of the requesting device when it differs from the stored one.
    #[serde(default)]
    pub lat_lon: Option<Coordinate>,
    /// Language of the request, e.g. "en-us".
    #[serde(default)]
    pub lang: Option<String>,
}

impl IntentMessage {
    pub fn new(intent: IntentKind, utterance: impl Into<String>) -> Self {
        Self {
            intent,
            utterance: utterance.into(),
            slots: HashMap::new(),
            lat_lon: None,
            lang: None,
        }
    }

    pub fn with_slot(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.slots.insert(name.into(), value.into());
        self
    }

    pub fn with_lat_lon(mut self, coordinate: Coordinate) -> Self {
        self.lat_lon = Some(coordinate);
        self
    }

    pub fn slot(&self, name: &str) -> Option<&str> {
        self.slots.get(name).map(String::as_str)
    }
}

/// Granularity of the weather being asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    #[default]
    Current,
    Hourly,
    Daily,
    Weekly,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Current => "current",
            Timeframe::Hourly => "hourly",
            Timeframe::Daily => "daily",
            Timeframe::Weekly => "weekly",
        }
    }
}

/// Canonical form of a request, produced once per utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    pub utterance: String,
    /// Place name asked about; `None` means the configured location.
    pub location: Option<String>,
    pub timeframe: Timeframe,
    /// Unit system for this request only.
    pub units: UnitSystem,
    /// Days after today; only set for daily queries.
    pub relative_day: Option<i64>,
    /// Hours after the current hour; only set for hourly queries.
    pub relative_hour: Option<i64>,
}

fn relative_day_offset(phrase: &str, now: NaiveDateTime) -> i64 {
    let weekday = match phrase {
        "today" => return 0,
        "tomorrow" => return 1,
        "day after tomorrow" => return 2,
        "monday" => Weekday::Mon,
        "tuesday" => Weekday::Tue,
        "wednesday" => Weekday::Wed,
        "thursday" => Weekday::Thu,
        "friday" => Weekday::Fri,
        "saturday" => Weekday::Sat,
        _ => Weekday::Sun,
    };
    let target = i64::from(weekday.num_days_from_monday());
    let today = i64::from(now.weekday().num_days_from_monday());
    (target - today).rem_euclid(7)
}

/// Clock hour a time-of-day phrase refers to; 24 and above spill into the next day.
fn relative_time_hour(phrase: &str) -> i64 {
    match phrase.trim_start_matches("this ") {
        "morning" => 8,
        "afternoon" => 15,
        "evening" => 19,
        "overnight" => 26,
        _ => 22,
    }
}

/// Build the query descriptor for an intent message.
///
/// `now` is the local wall-clock time the utterance was heard at; it anchors
/// weekday names and times of day.
pub fn normalize(
    message: &IntentMessage,
    config: &WeatherConfig,
    now: NaiveDateTime,
) -> Result<QueryDescriptor, WeatherError> {
    let utterance = message.utterance.as_str();

    let location = match message.slot("location") {
        Some(raw) if raw.trim().is_empty() => {
            return Err(WeatherError::MalformedQuery("location slot is empty".into()));
        }
        Some(raw) => Some(raw.trim().to_string()),
        None => None,
    };

    let day = vocab::first_match(utterance, Vocab::RelativeDay)
        .map(|phrase| relative_day_offset(phrase, now));

    let hours_from_now = vocab::extract_hours_from_now(utterance);
    let time_of_day = vocab::first_match(utterance, Vocab::RelativeTime);

    let (timeframe, relative_day, relative_hour) = if let Some(hours) = hours_from_now {
        (Timeframe::Hourly, None, Some(hours))
    } else if let Some(phrase) = time_of_day {
        let target = day.unwrap_or(0) * 24 + relative_time_hour(phrase);
        let offset = (target - i64::from(now.hour())).max(0);
        (Timeframe::Hourly, None, Some(offset))
    } else if vocab::voc_match(utterance, Vocab::Later) {
        (Timeframe::Hourly, None, Some(LATER_HOURS))
    } else if day.is_some() && !vocab::voc_match(utterance, Vocab::Today) {
        (Timeframe::Daily, day, None)
    } else {
        (Timeframe::Current, None, None)
    };

    let units = match message.slot("unit") {
        Some(unit) if vocab::voc_match(unit, Vocab::Fahrenheit) => UnitSystem::Imperial,
        Some(unit) if vocab::voc_match(unit, Vocab::Celsius) => UnitSystem::Metric,
        _ => config.units,
    };

    let query = QueryDescriptor {
        utterance: utterance.to_string(),
        location,
        timeframe,
        units,
        relative_day,
        relative_hour,
    };
    tracing::debug!(intent = %message.intent, ?query, "normalized weather query");

    Ok(query)
}

/// Number of days asked for in an "N day forecast" utterance.
pub fn requested_day_count(utterance: &str) -> Result<i64, WeatherError> {
    if vocab::voc_match(utterance, Vocab::Couple) {
        return Ok(2);
    }
    if vocab::voc_match(utterance, Vocab::Few) {
        return Ok(3);
    }
    match vocab::extract_number(utterance) {
        Some(days) if days > 0 => Ok(days),
        _ => Err(WeatherError::MalformedQuery(format!(
            "no day count in '{utterance}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use chrono::NaiveDate;

    fn config() -> WeatherConfig {
        Config::default().weather_config(None, None)
    }

    // Friday 2024-06-14 15:00
    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 14).unwrap().and_hms_opt(15, 0, 0).unwrap()
    }

    fn normalize_utterance(intent: IntentKind, utterance: &str) -> QueryDescriptor {
        normalize(&IntentMessage::new(intent, utterance), &config(), now()).unwrap()
    }

    #[test]
    fn intent_names_round_trip() {
        for kind in IntentKind::all() {
            assert_eq!(IntentKind::try_from(kind.as_str()).unwrap(), *kind);
        }
        assert!(IntentKind::try_from("make_coffee").is_err());
        assert_eq!(IntentKind::all().len(), 28);
    }

    #[test]
    fn plain_question_is_current() {
        let query = normalize_utterance(IntentKind::CurrentWeather, "what is the weather like");
        assert_eq!(query.timeframe, Timeframe::Current);
        assert_eq!(query.location, None);
        assert_eq!(query.relative_day, None);
        assert_eq!(query.relative_hour, None);
    }

    #[test]
    fn tonight_is_hourly_from_now() {
        let query =
            normalize_utterance(IntentKind::HourlyTemperature, "what is the temperature tonight");
        assert_eq!(query.timeframe, Timeframe::Hourly);
        assert_eq!(query.relative_hour, Some(7));
        assert_eq!(query.relative_day, None);
    }

    #[test]
    fn relative_day_folds_into_hour_offset() {
        let query =
            normalize_utterance(IntentKind::WeatherAtTime, "what's the weather tomorrow morning");
        assert_eq!(query.timeframe, Timeframe::Hourly);
        assert_eq!(query.relative_hour, Some(24 + 8 - 15));
        assert_eq!(query.relative_day, None);
    }

    #[test]
    fn past_time_of_day_clamps_to_now() {
        let query =
            normalize_utterance(IntentKind::WeatherAtTime, "how was the weather this morning");
        assert_eq!(query.relative_hour, Some(0));
    }

    #[test]
    fn later_is_hourly() {
        let query = normalize_utterance(IntentKind::WeatherLater, "what's the weather later");
        assert_eq!(query.timeframe, Timeframe::Hourly);
        assert_eq!(query.relative_hour, Some(LATER_HOURS));
    }

    #[test]
    fn explicit_hours_are_kept_even_beyond_the_forecast() {
        let query =
            normalize_utterance(IntentKind::WeatherAtTime, "what's the weather in 72 hours");
        assert_eq!(query.relative_hour, Some(72));
    }

    #[test]
    fn relative_day_is_daily_except_today() {
        let tomorrow =
            normalize_utterance(IntentKind::OneDayForecast, "what is the forecast tomorrow");
        assert_eq!(tomorrow.timeframe, Timeframe::Daily);
        assert_eq!(tomorrow.relative_day, Some(1));

        let today =
            normalize_utterance(IntentKind::HighTemperature, "what is the high temperature today");
        assert_eq!(today.timeframe, Timeframe::Current);
        assert_eq!(today.relative_day, None);
    }

    #[test]
    fn weekday_names_count_forward_from_today() {
        let monday = normalize_utterance(IntentKind::OneDayForecast, "forecast on monday");
        assert_eq!(monday.relative_day, Some(3));

        let friday = normalize_utterance(IntentKind::OneDayForecast, "forecast on friday");
        assert_eq!(friday.relative_day, Some(0));
        assert_eq!(friday.timeframe, Timeframe::Daily);
    }

    #[test]
    fn unit_slot_overrides_config_for_this_request() {
        let message =
            IntentMessage::new(IntentKind::CurrentTemperature, "temperature in fahrenheit")
                .with_slot("unit", "Fahrenheit");
        let cfg = config();
        let query = normalize(&message, &cfg, now()).unwrap();
        assert_eq!(query.units, UnitSystem::Imperial);
        assert_eq!(cfg.units, UnitSystem::Metric);

        let message = IntentMessage::new(IntentKind::CurrentTemperature, "temperature in celsius")
            .with_slot("unit", "celsius");
        let imperial = cfg.with_units(UnitSystem::Imperial);
        assert_eq!(normalize(&message, &imperial, now()).unwrap().units, UnitSystem::Metric);
    }

    #[test]
    fn blank_location_is_malformed() {
        let message = IntentMessage::new(IntentKind::CurrentWeather, "weather in")
            .with_slot("location", "  ");
        let err = normalize(&message, &config(), now()).unwrap_err();
        assert!(matches!(err, WeatherError::MalformedQuery(_)));
    }

    #[test]
    fn location_slot_is_trimmed() {
        let message = IntentMessage::new(IntentKind::CurrentWeather, "weather in berlin")
            .with_slot("location", " Berlin ");
        let query = normalize(&message, &config(), now()).unwrap();
        assert_eq!(query.location.as_deref(), Some("Berlin"));
    }

    #[test]
    fn day_counts() {
        assert_eq!(requested_day_count("forecast for the next couple of days").unwrap(), 2);
        assert_eq!(requested_day_count("forecast for the next few days").unwrap(), 3);
        assert_eq!(requested_day_count("what is the 10 day forecast").unwrap(), 10);
        assert!(matches!(
            requested_day_count("what is the day forecast"),
            Err(WeatherError::MalformedQuery(_))
        ));
    }

    #[test]
    fn intent_messages_deserialize_from_bus_json() {
        let message: IntentMessage = serde_json::from_str(
            r#"{"intent": "is_rain", "utterance": "is it raining", "slots": {"location": "Paris"}}"#,
        )
        .unwrap();
        assert_eq!(message.intent, IntentKind::IsRain);
        assert_eq!(message.slot("location"), Some("Paris"));
        assert!(message.lat_lon.is_none());
    }
}
