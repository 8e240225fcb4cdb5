use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// Unit system a report is fetched and spoken in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "metric",
            UnitSystem::Imperial => "imperial",
        }
    }

    pub fn temperature_unit(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "celsius",
            UnitSystem::Imperial => "fahrenheit",
        }
    }

    pub fn speed_unit(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "meters per second",
            UnitSystem::Imperial => "miles per hour",
        }
    }
}

impl std::fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit preference stored in the skill settings; `Default` defers to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitPreference {
    #[default]
    Default,
    Metric,
    Imperial,
}

impl UnitPreference {
    pub fn explicit(&self) -> Option<UnitSystem> {
        match self {
            UnitPreference::Default => None,
            UnitPreference::Metric => Some(UnitSystem::Metric),
            UnitPreference::Imperial => Some(UnitSystem::Imperial),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// Place a report was resolved for, used to speak and display the location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Geolocation {
    pub city: String,
    pub region: String,
    pub country: String,
}

/// Eight point compass used for spoken wind directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompassPoint {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl CompassPoint {
    const ALL: [CompassPoint; 8] = [
        CompassPoint::North,
        CompassPoint::NorthEast,
        CompassPoint::East,
        CompassPoint::SouthEast,
        CompassPoint::South,
        CompassPoint::SouthWest,
        CompassPoint::West,
        CompassPoint::NorthWest,
    ];

    /// Direction the wind blows from, given in meteorological degrees.
    pub fn from_degrees(degrees: f64) -> Self {
        let normalized = degrees.rem_euclid(360.0);
        let index = ((normalized + 22.5) / 45.0).floor() as usize % 8;
        Self::ALL[index]
    }

    pub fn spoken(&self) -> &'static str {
        match self {
            CompassPoint::North => "north",
            CompassPoint::NorthEast => "northeast",
            CompassPoint::East => "east",
            CompassPoint::SouthEast => "southeast",
            CompassPoint::South => "south",
            CompassPoint::SouthWest => "southwest",
            CompassPoint::West => "west",
            CompassPoint::NorthWest => "northwest",
        }
    }
}

/// Condition as reported by a provider, normalized to OpenWeather categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherCondition {
    /// Broad group, e.g. "Clouds" or "Rain".
    pub category: String,
    /// Provider wording, e.g. "broken clouds".
    pub description: String,
    /// Provider specific numeric code.
    pub code: u32,
    /// Code understood by the animated display: 0 clear, 1 partly cloudy,
    /// 2 cloudy, 3 light rain, 4 rain, 5 thunderstorm, 6 snow, 7 fog.
    pub animated_code: u8,
}

impl WeatherCondition {
    /// Build a condition from an OpenWeather `weather` entry.
    pub fn from_openweather(id: u32, main: &str, description: &str) -> Self {
        let animated_code = match id {
            200..=299 => 5,
            300..=399 | 500 => 3,
            501..=599 => 4,
            600..=699 => 6,
            700..=799 => 7,
            801 | 802 => 1,
            803..=899 => 2,
            _ => 0,
        };

        Self {
            category: main.to_string(),
            description: description.to_lowercase(),
            code: id,
            animated_code,
        }
    }

    /// Image asset shown next to the condition on the display.
    pub fn image(&self) -> &'static str {
        match self.animated_code {
            1 => "partial_clouds",
            2 => "clouds",
            3 | 4 => "rain",
            5 => "storm",
            6 => "snow",
            7 => "fog",
            _ => "sun",
        }
    }

    /// Whether the condition itself means something is falling from the sky.
    pub fn is_precipitation(&self) -> bool {
        matches!(self.animated_code, 3..=6)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub date_time: DateTime<FixedOffset>,
    pub temperature: i32,
    pub feels_like: i32,
    pub temperature_high: i32,
    pub temperature_low: i32,
    pub condition: WeatherCondition,
    pub wind_speed: f64,
    pub wind_direction: CompassPoint,
    pub humidity: u8,
    pub sunrise: DateTime<FixedOffset>,
    pub sunset: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyWeather {
    pub date_time: DateTime<FixedOffset>,
    pub temperature: i32,
    pub feels_like: i32,
    pub condition: WeatherCondition,
    pub wind_speed: f64,
    pub wind_direction: CompassPoint,
    pub humidity: u8,
    pub chance_of_precipitation: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyWeather {
    pub date_time: DateTime<FixedOffset>,
    pub temperature_high: i32,
    pub temperature_low: i32,
    pub condition: WeatherCondition,
    pub wind_speed: f64,
    pub wind_direction: CompassPoint,
    pub humidity: u8,
    pub chance_of_precipitation: u8,
    pub sunrise: DateTime<FixedOffset>,
    pub sunset: DateTime<FixedOffset>,
}

impl DailyWeather {
    pub fn date(&self) -> NaiveDate {
        self.date_time.date_naive()
    }
}

/// Multi-scale report for one location, owned by the request that fetched it.
///
/// `daily[0]` is today in the location's timezone; `hourly[0]` is the
/// current hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub current: CurrentWeather,
    pub hourly: Vec<HourlyWeather>,
    pub daily: Vec<DailyWeather>,
}

impl WeatherReport {
    /// Today's date at the reported location.
    pub fn today(&self) -> NaiveDate {
        self.current.date_time.date_naive()
    }
}

/// Round a provider temperature to the whole number that gets spoken.
pub(crate) fn whole_degrees(value: f64) -> i32 {
    value.round() as i32
}
