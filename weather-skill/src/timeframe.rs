//! Selecting the part of a report a query is about.

use chrono::{Datelike, Weekday};

use crate::{
    WeatherError,
    error::{MAX_FORECAST_DAYS, MAX_FORECAST_HOURS},
    intent::{QueryDescriptor, Timeframe},
    model::{CurrentWeather, DailyWeather, HourlyWeather, WeatherReport},
};

/// Chance of precipitation, in percent, worth mentioning.
pub const PRECIPITATION_THRESHOLD: u8 = 30;

/// The slice of a report that answers a query.
#[derive(Debug, Clone)]
pub enum IntentWeather<'a> {
    Current(&'a CurrentWeather),
    Hourly(&'a HourlyWeather),
    Daily(&'a DailyWeather),
    Weekly(WeekSummary<'a>),
}

impl IntentWeather<'_> {
    pub fn timeframe(&self) -> Timeframe {
        match self {
            IntentWeather::Current(_) => Timeframe::Current,
            IntentWeather::Hourly(_) => Timeframe::Hourly,
            IntentWeather::Daily(_) => Timeframe::Daily,
            IntentWeather::Weekly(_) => Timeframe::Weekly,
        }
    }
}

/// Days grouped under one condition category for the week summary.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionGroup<'a> {
    pub category: &'a str,
    pub days: Vec<&'a DailyWeather>,
}

/// Seven day outlook, condensed. Never built from an empty set of days.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekSummary<'a> {
    pub days: &'a [DailyWeather],
    /// Categories in order of first occurrence, each listed once.
    pub conditions: Vec<ConditionGroup<'a>>,
    pub low_min: i32,
    pub low_max: i32,
    pub high_min: i32,
    pub high_max: i32,
}

/// Pick the current, hourly or daily slice the query asks about.
pub fn weather_for_intent<'a>(
    report: &'a WeatherReport,
    query: &QueryDescriptor,
) -> Result<IntentWeather<'a>, WeatherError> {
    match query.timeframe {
        Timeframe::Current => Ok(IntentWeather::Current(&report.current)),
        Timeframe::Hourly => {
            let hours = query.relative_hour.unwrap_or(0);
            forecast_for_hour(report, hours).map(IntentWeather::Hourly)
        }
        Timeframe::Daily => {
            let days = query.relative_day.unwrap_or(0);
            forecast_for_date(report, days).map(IntentWeather::Daily)
        }
        Timeframe::Weekly => week_summary(report).map(IntentWeather::Weekly),
    }
}

fn missing(section: &str) -> WeatherError {
    WeatherError::ProviderUnavailable(format!("report contains no {section} forecast"))
}

/// Forecast `hours` after the current hour.
pub fn forecast_for_hour(
    report: &WeatherReport,
    hours: i64,
) -> Result<&HourlyWeather, WeatherError> {
    if report.hourly.is_empty() {
        return Err(missing("hourly"));
    }
    let out_of_range = || WeatherError::HourOutOfRange { requested: hours };
    if hours > MAX_FORECAST_HOURS as i64 {
        return Err(out_of_range());
    }
    let index = usize::try_from(hours.max(0)).map_err(|_| out_of_range())?;
    report.hourly.get(index).ok_or_else(out_of_range)
}

/// Forecast for the day `days` after today.
pub fn forecast_for_date(report: &WeatherReport, days: i64) -> Result<&DailyWeather, WeatherError> {
    if report.daily.is_empty() {
        return Err(missing("daily"));
    }
    let available = available_days(report);
    let out_of_range = || WeatherError::DayCountOutOfRange { requested: days, available };
    if days > available as i64 {
        return Err(out_of_range());
    }
    let index = usize::try_from(days.max(0)).map_err(|_| out_of_range())?;
    report.daily.get(index).ok_or_else(out_of_range)
}

/// The `days` days following today.
///
/// A report without any day after today has nothing to offer and is
/// reported as unavailable rather than out of range.
pub fn forecast_for_multiple_days(
    report: &WeatherReport,
    days: i64,
) -> Result<&[DailyWeather], WeatherError> {
    let available = available_days(report);
    if available == 0 {
        return Err(missing("daily"));
    }
    let out_of_range = || WeatherError::DayCountOutOfRange { requested: days, available };
    if days > available as i64 {
        return Err(out_of_range());
    }
    let count = usize::try_from(days.max(0)).map_err(|_| out_of_range())?;
    report.daily.get(1..1 + count).ok_or_else(out_of_range)
}

/// Number of days after today the report covers, capped at a week.
pub fn available_days(report: &WeatherReport) -> usize {
    report.daily.len().saturating_sub(1).min(MAX_FORECAST_DAYS)
}

/// Saturday and Sunday of the first weekend from today onwards.
pub fn weekend_forecast(report: &WeatherReport) -> Result<Vec<&DailyWeather>, WeatherError> {
    let is_weekend =
        |d: &&DailyWeather| matches!(d.date().weekday(), Weekday::Sat | Weekday::Sun);

    let mut days = report.daily.iter().skip_while(|d| !is_weekend(d));
    let Some(first) = days.next() else {
        return Err(missing("weekend"));
    };

    let mut weekend = vec![first];
    if first.date().weekday() == Weekday::Sat {
        if let Some(sunday) = days.next().filter(|d| d.date().weekday() == Weekday::Sun) {
            weekend.push(sunday);
        }
    }
    Ok(weekend)
}

/// Group the coming week by condition and find its temperature band.
pub fn week_summary(report: &WeatherReport) -> Result<WeekSummary<'_>, WeatherError> {
    let days = forecast_for_multiple_days(report, available_days(report) as i64)?;
    summarize(days)
}

pub(crate) fn summarize(days: &[DailyWeather]) -> Result<WeekSummary<'_>, WeatherError> {
    let band = |pick: fn(&DailyWeather) -> i32| {
        let min = days.iter().map(pick).min();
        let max = days.iter().map(pick).max();
        min.zip(max).ok_or_else(|| missing("daily"))
    };
    let (low_min, low_max) = band(|d| d.temperature_low)?;
    let (high_min, high_max) = band(|d| d.temperature_high)?;

    let mut conditions: Vec<ConditionGroup<'_>> = Vec::new();
    for day in days {
        match conditions.iter_mut().find(|g| g.category == day.condition.category) {
            Some(group) => group.days.push(day),
            None => conditions.push(ConditionGroup {
                category: &day.condition.category,
                days: vec![day],
            }),
        }
    }

    Ok(WeekSummary { days, conditions, low_min, low_max, high_min, high_max })
}

/// The next forecast period likely to bring precipitation.
#[derive(Debug, Clone, Copy)]
pub enum NextPrecipitation<'a> {
    Hour(&'a HourlyWeather),
    Day(&'a DailyWeather),
}

/// First hour later today, else first later day, with a meaningful chance of precipitation.
pub fn next_precipitation(report: &WeatherReport) -> Option<NextPrecipitation<'_>> {
    let today = report.today();

    report
        .hourly
        .iter()
        .take_while(|h| h.date_time.date_naive() == today)
        .find(|h| h.chance_of_precipitation >= PRECIPITATION_THRESHOLD)
        .map(NextPrecipitation::Hour)
        .or_else(|| {
            report
                .daily
                .iter()
                .filter(|d| d.date() > today)
                .find(|d| d.chance_of_precipitation >= PRECIPITATION_THRESHOLD)
                .map(NextPrecipitation::Day)
        })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone};

    use crate::model::{
        CompassPoint, CurrentWeather, DailyWeather, HourlyWeather, WeatherCondition, WeatherReport,
    };

    pub fn offset() -> FixedOffset {
        FixedOffset::west_opt(5 * 3600).unwrap()
    }

    pub fn at(date: NaiveDate, hour: u32) -> DateTime<FixedOffset> {
        offset().from_local_datetime(&date.and_hms_opt(hour, 0, 0).unwrap()).unwrap()
    }

    pub fn condition(id: u32) -> WeatherCondition {
        let (main, description) = match id {
            200..=299 => ("Thunderstorm", "thunderstorm"),
            500..=599 => ("Rain", "light rain"),
            600..=699 => ("Snow", "snow"),
            700..=799 => ("Fog", "fog"),
            800 => ("Clear", "clear sky"),
            _ => ("Clouds", "broken clouds"),
        };
        WeatherCondition::from_openweather(id, main, description)
    }

    /// Report anchored at 15:00 on `today` with 48 hours and 8 days.
    pub fn report(today: NaiveDate, daily_conditions: [u32; 8]) -> WeatherReport {
        let now = at(today, 15);
        let hourly = (0..48)
            .map(|h| HourlyWeather {
                date_time: now + Duration::hours(h),
                temperature: 20 + h as i32 % 5,
                feels_like: 19,
                condition: condition(803),
                wind_speed: 3.0,
                wind_direction: CompassPoint::West,
                humidity: 60,
                chance_of_precipitation: 10,
            })
            .collect();
        let daily: Vec<DailyWeather> = daily_conditions
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let date = today + Duration::days(i as i64);
                DailyWeather {
                    date_time: at(date, 12),
                    temperature_high: 25 + i as i32,
                    temperature_low: 12 - i as i32,
                    condition: condition(*id),
                    wind_speed: 4.0,
                    wind_direction: CompassPoint::South,
                    humidity: 50,
                    chance_of_precipitation: if *id / 100 == 5 { 70 } else { 0 },
                    sunrise: at(date, 6),
                    sunset: at(date, 20),
                }
            })
            .collect();

        WeatherReport {
            current: CurrentWeather {
                date_time: now,
                temperature: 22,
                feels_like: 21,
                temperature_high: daily[0].temperature_high,
                temperature_low: daily[0].temperature_low,
                condition: condition(801),
                wind_speed: 2.5,
                wind_direction: CompassPoint::NorthEast,
                humidity: 58,
                sunrise: daily[0].sunrise,
                sunset: daily[0].sunset,
            },
            hourly,
            daily,
        }
    }
}
