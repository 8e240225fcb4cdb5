//! Screen payloads for devices with a display.
//!
//! Field names are camelCase because that is what the screen templates read.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::{
    config::TimeFormat,
    model::{DailyWeather, WeatherReport},
};

/// Hours shown on the hourly screen, not counting the current one.
const HOURLY_SCREEN_HOURS: usize = 4;
/// Days shown on the multi-day screen.
const MULTI_DAY_SCREEN_DAYS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Screen {
    Current(CurrentScreen),
    Hourly(HourlyScreen),
    SingleDay(SingleDayScreen),
    MultiDay(MultiDayScreen),
    SunriseSunset(SunriseSunsetScreen),
}

impl Screen {
    /// Name of the page template that renders this payload.
    pub fn page(&self) -> &'static str {
        match self {
            Screen::Current(_) => "CurrentWeather",
            Screen::Hourly(_) => "HourlyForecast",
            Screen::SingleDay(_) => "SingleDay",
            Screen::MultiDay(_) => "DailyForecast",
            Screen::SunriseSunset(_) => "SunriseSunset",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentScreen {
    pub weather_code: u8,
    pub current_timezone: String,
    pub current_temperature: i32,
    pub weather_condition: String,
    pub weather_location: String,
    pub high_temperature: i32,
    pub low_temperature: i32,
    pub wind_speed: f64,
    pub humidity: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HourScreen {
    pub time: String,
    pub precipitation: u8,
    pub temperature: i32,
    pub weather_condition: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourList {
    pub hours: Vec<HourScreen>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyScreen {
    pub weather_code: u8,
    pub weather_location: String,
    pub hourly_forecast: HourList,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleDayScreen {
    pub weather_location: String,
    pub weather_condition: u8,
    pub weather_date: String,
    pub high_temperature: i32,
    pub low_temperature: i32,
    pub chance_of_precipitation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayScreen {
    pub weather_condition: u8,
    pub high_temperature: i32,
    pub low_temperature: i32,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayList {
    pub all: Vec<DayScreen>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiDayScreen {
    pub forecast: DayList,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SunriseSunsetScreen {
    pub weather_date: String,
    pub weather_location: String,
    pub sunrise: String,
    pub sunset: String,
    pub ampm: bool,
}

pub fn current_screen(report: &WeatherReport, location: &str) -> Screen {
    let current = &report.current;
    Screen::Current(CurrentScreen {
        weather_code: current.condition.animated_code,
        current_timezone: current.date_time.format("%a %B %d, %Y").to_string(),
        current_temperature: current.temperature,
        weather_condition: current.condition.image().to_string(),
        weather_location: location.to_string(),
        high_temperature: current.temperature_high,
        low_temperature: current.temperature_low,
        wind_speed: current.wind_speed,
        humidity: current.humidity,
    })
}

/// The hours following the current one.
pub fn hourly_screen(report: &WeatherReport, location: &str, format: TimeFormat) -> Screen {
    let hours = report
        .hourly
        .iter()
        .skip(1)
        .take(HOURLY_SCREEN_HOURS)
        .map(|hour| HourScreen {
            time: match format {
                TimeFormat::Half => hour.date_time.format("%-I %p").to_string(),
                TimeFormat::Full => hour.date_time.format("%H:00").to_string(),
            },
            precipitation: hour.chance_of_precipitation,
            temperature: hour.temperature,
            weather_condition: hour.condition.animated_code,
        })
        .collect();

    Screen::Hourly(HourlyScreen {
        weather_code: report.current.condition.animated_code,
        weather_location: location.to_string(),
        hourly_forecast: HourList { hours },
    })
}

pub fn single_day_screen(day: &DailyWeather, location: &str) -> Screen {
    Screen::SingleDay(SingleDayScreen {
        weather_location: location.to_string(),
        weather_condition: day.condition.animated_code,
        weather_date: day.date_time.format("%a %B %d, %Y").to_string(),
        high_temperature: day.temperature_high,
        low_temperature: day.temperature_low,
        chance_of_precipitation: day.chance_of_precipitation.to_string(),
    })
}

/// Up to four days, in the order given.
pub fn multi_day_screen<'a>(days: impl IntoIterator<Item = &'a DailyWeather>) -> Screen {
    let all = days
        .into_iter()
        .take(MULTI_DAY_SCREEN_DAYS)
        .map(|day| DayScreen {
            weather_condition: day.condition.animated_code,
            high_temperature: day.temperature_high,
            low_temperature: day.temperature_low,
            date: day.date_time.format("%a").to_string(),
        })
        .collect();

    Screen::MultiDay(MultiDayScreen { forecast: DayList { all } })
}

pub fn sunrise_sunset_screen(
    date_time: &DateTime<FixedOffset>,
    sunrise: &DateTime<FixedOffset>,
    sunset: &DateTime<FixedOffset>,
    location: &str,
    format: TimeFormat,
) -> Screen {
    Screen::SunriseSunset(SunriseSunsetScreen {
        weather_date: date_time.format("%A %b %d").to_string(),
        weather_location: location.to_string(),
        sunrise: clock(sunrise, format),
        sunset: clock(sunset, format),
        ampm: format == TimeFormat::Half,
    })
}

/// Clock face time without the am/pm marker, which the page adds itself.
fn clock(value: &DateTime<FixedOffset>, format: TimeFormat) -> String {
    match format {
        TimeFormat::Half => value.format("%-I:%M").to_string(),
        TimeFormat::Full => value.format("%H:%M").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeframe::fixtures;
    use chrono::NaiveDate;
    use serde_json::json;

    fn report() -> WeatherReport {
        let start = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
        fixtures::report(start, [800, 500, 800, 803, 500, 500, 600, 800])
    }

    #[test]
    fn current_screen_serializes_camel_case() {
        let value = serde_json::to_value(current_screen(&report(), "Lawrence, Kansas")).unwrap();
        assert_eq!(value["weatherCode"], 1);
        assert_eq!(value["weatherCondition"], "partial_clouds");
        assert_eq!(value["currentTimezone"], "Fri June 14, 2024");
        assert_eq!(value["weatherLocation"], "Lawrence, Kansas");
        assert_eq!(value["highTemperature"], 25);
    }

    #[test]
    fn hourly_screen_skips_the_current_hour() {
        let Screen::Hourly(screen) = hourly_screen(&report(), "here", TimeFormat::Half) else {
            panic!("expected an hourly screen");
        };
        let times: Vec<_> = screen.hourly_forecast.hours.iter().map(|h| h.time.as_str()).collect();
        assert_eq!(times, vec!["4 PM", "5 PM", "6 PM", "7 PM"]);

        let Screen::Hourly(screen) = hourly_screen(&report(), "here", TimeFormat::Full) else {
            panic!("expected an hourly screen");
        };
        assert_eq!(screen.hourly_forecast.hours[0].time, "16:00");
    }

    #[test]
    fn multi_day_screen_shows_four_days() {
        let report = report();
        let value = serde_json::to_value(multi_day_screen(&report.daily[1..])).unwrap();
        let all = value["forecast"]["all"].as_array().unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(
            all[0],
            json!({
                "weatherCondition": 3,
                "highTemperature": 26,
                "lowTemperature": 11,
                "date": "Sat"
            })
        );
    }

    #[test]
    fn single_day_precipitation_is_a_string() {
        let report = report();
        let value = serde_json::to_value(single_day_screen(&report.daily[1], "here")).unwrap();
        assert_eq!(value["chanceOfPrecipitation"], "70");
        assert_eq!(value["weatherDate"], "Sat June 15, 2024");
    }

    #[test]
    fn sun_times_drop_the_leading_zero() {
        let report = report();
        let day = &report.daily[0];
        let (sunrise, sunset) = (&day.sunrise, &day.sunset);
        let screen =
            sunrise_sunset_screen(&day.date_time, sunrise, sunset, "here", TimeFormat::Half);
        let Screen::SunriseSunset(screen) = screen else {
            panic!("expected a sunrise screen");
        };
        assert_eq!(screen.sunrise, "6:00");
        assert_eq!(screen.sunset, "8:00");
        assert_eq!(screen.weather_date, "Friday Jun 14");
        assert!(screen.ampm);
    }
}
