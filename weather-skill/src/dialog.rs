//! Dialog construction, one builder per timeframe.
//!
//! Dialog names follow `{timeframe}-{metric}[-{qualifier}][-today]-{local|location}`
//! and are resolved against the phrase table by whoever speaks them.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::{
    config::{TimeFormat, WeatherConfig},
    intent::Timeframe,
    model::{Geolocation, UnitSystem, WeatherReport},
    phrases::PhraseTable,
    timeframe::IntentWeather,
    vocab::{self, Vocab},
};

mod current;
mod daily;
mod hourly;
mod weekly;

pub use current::CurrentDialog;
pub use daily::DailyDialog;
pub use hourly::HourlyDialog;
pub use weekly::WeeklyDialog;

/// Placeholder name to rendered value.
pub type DialogData = BTreeMap<String, String>;

/// One spoken utterance: a phrase name plus its fill-in values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dialog {
    pub name: String,
    pub data: DialogData,
}

impl Dialog {
    /// A dialog with no fill-in values, e.g. a fallback phrase.
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), data: DialogData::new() }
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.data.insert(key.to_string(), value.to_string());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureKind {
    Current,
    High,
    Low,
}

/// Condition a user asks to confirm, e.g. "is it raining?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionKeyword {
    Rain,
    Snow,
    Clear,
    Clouds,
    Fog,
    Thunderstorm,
}

impl ConditionKeyword {
    pub fn vocab(&self) -> Vocab {
        match self {
            ConditionKeyword::Rain => Vocab::Rain,
            ConditionKeyword::Snow => Vocab::Snow,
            ConditionKeyword::Clear => Vocab::Clear,
            ConditionKeyword::Clouds => Vocab::Clouds,
            ConditionKeyword::Fog => Vocab::Fog,
            ConditionKeyword::Thunderstorm => Vocab::Thunderstorm,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionKeyword::Rain => "rain",
            ConditionKeyword::Snow => "snow",
            ConditionKeyword::Clear => "clear skies",
            ConditionKeyword::Clouds => "clouds",
            ConditionKeyword::Fog => "fog",
            ConditionKeyword::Thunderstorm => "thunderstorms",
        }
    }

    /// Whether an observed condition category is what the user asked about.
    pub fn matches(&self, category: &str) -> bool {
        vocab::voc_match(&category.to_lowercase(), self.vocab())
    }
}

/// Everything a builder needs besides the weather itself.
#[derive(Debug, Clone, Copy)]
pub struct DialogContext<'a> {
    pub config: &'a WeatherConfig,
    /// Spoken name of the place asked about; `None` for the device location.
    pub location: Option<&'a str>,
    /// Today's date at the reported location.
    pub today: NaiveDate,
    pub phrases: &'a PhraseTable,
}

impl DialogContext<'_> {
    /// Finish a dialog name with its location suffix.
    pub(crate) fn finish(&self, mut dialog: Dialog) -> Dialog {
        match self.location {
            Some(location) => {
                dialog.name.push_str("-location");
                dialog.with("location", location)
            }
            None => {
                dialog.name.push_str("-local");
                dialog
            }
        }
    }

    pub(crate) fn percent(&self, value: u8) -> String {
        let data = DialogData::from([("number".to_string(), value.to_string())]);
        self.phrases.translate("percentage-number", &data)
    }

    pub(crate) fn time(&self, value: &DateTime<FixedOffset>) -> String {
        spoken_time(value, self.config.time_format)
    }

    /// "today", "tomorrow" or the weekday name.
    pub(crate) fn day(&self, date: NaiveDate) -> String {
        if date == self.today {
            self.phrases.word("today")
        } else if date == self.today + Duration::days(1) {
            self.phrases.word("tomorrow")
        } else {
            date.format("%A").to_string()
        }
    }

    pub(crate) fn wind_strength(&self, speed: f64) -> &'static str {
        let (strong, moderate) = match self.config.units {
            UnitSystem::Imperial => (20.0, 11.0),
            UnitSystem::Metric => (9.0, 5.0),
        };
        if speed >= strong {
            "strong"
        } else if speed >= moderate {
            "moderate"
        } else {
            "light"
        }
    }
}

/// Operations every timeframe variant answers.
pub trait DialogBuilder {
    fn timeframe(&self) -> Timeframe;

    /// General overview, possibly several dialogs spoken in order.
    fn weather(&self) -> Vec<Dialog>;

    /// Confirm or deny the condition the user asked about.
    fn condition(&self, asked: ConditionKeyword) -> Dialog;

    fn temperature(&self, kind: TemperatureKind) -> Dialog;

    fn wind(&self) -> Dialog;

    fn humidity(&self) -> Dialog;

    fn sunrise(&self) -> Dialog;

    fn sunset(&self) -> Dialog;

    fn precipitation(&self) -> Dialog;
}

/// Pick the builder for the timeframe the weather slice belongs to.
pub fn dialog_builder<'a>(
    weather: IntentWeather<'a>,
    report: &'a WeatherReport,
    ctx: DialogContext<'a>,
) -> Box<dyn DialogBuilder + 'a> {
    match weather {
        IntentWeather::Current(current) => Box::new(CurrentDialog::new(current, ctx)),
        IntentWeather::Hourly(hour) => {
            let date = hour.date_time.date_naive();
            let day = report.daily.iter().find(|d| d.date() == date);
            Box::new(HourlyDialog::new(hour, day, ctx))
        }
        IntentWeather::Daily(day) => Box::new(DailyDialog::new(day, ctx)),
        IntentWeather::Weekly(summary) => Box::new(WeeklyDialog::new(summary, ctx)),
    }
}

/// Dialog for when no precipitation is forecast at all.
pub fn no_precipitation_dialog(ctx: &DialogContext<'_>) -> Dialog {
    ctx.finish(Dialog::named("precipitation-next-none"))
}

/// How to speak the place a user asked about.
///
/// Places in the device's own country are qualified by region, others by
/// country. Without a geocoded place the user's own words are repeated.
pub fn spoken_location(
    asked: Option<&str>,
    resolved: Option<&Geolocation>,
    home: &Geolocation,
) -> Option<String> {
    let asked = asked?;
    let Some(place) = resolved else {
        return Some(asked.to_string());
    };

    let qualifier = if place.country == home.country { &place.region } else { &place.country };
    if qualifier.is_empty() || *qualifier == place.city {
        Some(place.city.clone())
    } else {
        Some(format!("{}, {}", place.city, qualifier))
    }
}

/// Clock time as it should be spoken or shown, 12-hour without a leading zero.
pub fn spoken_time(value: &DateTime<FixedOffset>, format: TimeFormat) -> String {
    match format {
        TimeFormat::Half => value.format("%-I:%M %p").to_string(),
        TimeFormat::Full => value.format("%H:%M").to_string(),
    }
}
