use chrono::{DateTime, Duration, FixedOffset, NaiveTime};

use crate::{
    intent::Timeframe,
    model::DailyWeather,
    timeframe::{PRECIPITATION_THRESHOLD, WeekSummary},
};

use super::{ConditionKeyword, Dialog, DialogBuilder, DialogContext, TemperatureKind};

/// Dialogs summarizing several days at once.
#[derive(Debug, Clone)]
pub struct WeeklyDialog<'a> {
    summary: WeekSummary<'a>,
    ctx: DialogContext<'a>,
}

impl<'a> WeeklyDialog<'a> {
    pub fn new(summary: WeekSummary<'a>, ctx: DialogContext<'a>) -> Self {
        Self { summary, ctx }
    }

    fn days(&self) -> &'a [DailyWeather] {
        self.summary.days
    }

    /// Speak a set of days: "every day", "Monday through Wednesday" or
    /// "Monday, Tuesday and Friday".
    pub fn day_list(&self, days: &[&DailyWeather]) -> String {
        if !days.is_empty() && days.len() == self.days().len() {
            return self.ctx.phrases.word("every-day");
        }

        let names: Vec<String> = days.iter().map(|d| d.date().format("%A").to_string()).collect();
        let consecutive = days
            .windows(2)
            .all(|pair| pair[1].date() == pair[0].date() + Duration::days(1));

        match names.as_slice() {
            [] => String::new(),
            [only] => only.clone(),
            [first, .., last] if consecutive && names.len() >= 3 => {
                format!("{first} {} {last}", self.ctx.phrases.word("through"))
            }
            [init @ .., last] => {
                format!("{} {} {last}", init.join(", "), self.ctx.phrases.word("and"))
            }
        }
    }

    fn sun_band(
        &self,
        pick: impl Fn(&DailyWeather) -> NaiveTime,
    ) -> Option<(&'a DailyWeather, &'a DailyWeather)> {
        let earliest = self.days().iter().min_by_key(|d| pick(d))?;
        let latest = self.days().iter().max_by_key(|d| pick(d))?;
        Some((earliest, latest))
    }

    fn finish_sun(
        &self,
        name: &str,
        band: Option<(&DailyWeather, &DailyWeather)>,
        pick: fn(&DailyWeather) -> &DateTime<FixedOffset>,
    ) -> Dialog {
        match band {
            Some((earliest, latest)) => self.ctx.finish(
                Dialog::named(name)
                    .with("earliest", self.ctx.time(pick(earliest)))
                    .with("latest", self.ctx.time(pick(latest))),
            ),
            None => self.ctx.finish(Dialog::named("sun-times-unavailable")),
        }
    }
}

impl DialogBuilder for WeeklyDialog<'_> {
    fn timeframe(&self) -> Timeframe {
        Timeframe::Weekly
    }

    /// One dialog per condition category, then the temperature band.
    fn weather(&self) -> Vec<Dialog> {
        let mut dialogs: Vec<Dialog> = self
            .summary
            .conditions
            .iter()
            .map(|group| {
                self.ctx.finish(
                    Dialog::named("weekly-condition")
                        .with("condition", group.category.to_lowercase())
                        .with("days", self.day_list(&group.days)),
                )
            })
            .collect();
        dialogs.push(self.temperature(TemperatureKind::Current));
        dialogs
    }

    fn condition(&self, asked: ConditionKeyword) -> Dialog {
        let matching: Vec<&DailyWeather> = self
            .days()
            .iter()
            .filter(|d| asked.matches(&d.condition.category))
            .collect();

        let dialog = if matching.is_empty() {
            Dialog::named("weekly-condition-not-expected")
        } else {
            Dialog::named("weekly-condition-expected").with("days", self.day_list(&matching))
        };
        self.ctx.finish(dialog.with("condition", asked.as_str()))
    }

    fn temperature(&self, kind: TemperatureKind) -> Dialog {
        let WeekSummary { high_min, high_max, low_min, low_max, .. } = self.summary;

        let dialog = match kind {
            TemperatureKind::Current => Dialog::named("weekly-temperature")
                .with("high_min", high_min)
                .with("high_max", high_max)
                .with("low_min", low_min)
                .with("low_max", low_max),
            TemperatureKind::High => Dialog::named("weekly-temperature-high")
                .with("high_min", high_min)
                .with("high_max", high_max),
            TemperatureKind::Low => Dialog::named("weekly-temperature-low")
                .with("low_min", low_min)
                .with("low_max", low_max),
        };
        self.ctx.finish(dialog.with("temperature_unit", self.ctx.config.temperature_unit()))
    }

    /// Reports the windiest day.
    fn wind(&self) -> Dialog {
        let windiest = self.days().iter().max_by(|a, b| a.wind_speed.total_cmp(&b.wind_speed));
        let Some(windiest) = windiest else {
            return self.ctx.finish(Dialog::named("weekly-wind-light"));
        };
        let strength = self.ctx.wind_strength(windiest.wind_speed);
        self.ctx.finish(
            Dialog::named(format!("weekly-wind-{strength}"))
                .with("day", self.ctx.day(windiest.date()))
                .with("speed", windiest.wind_speed.round())
                .with("speed_unit", self.ctx.config.speed_unit())
                .with("direction", windiest.wind_direction.spoken()),
        )
    }

    fn humidity(&self) -> Dialog {
        let min = self.days().iter().map(|d| d.humidity).min().unwrap_or_default();
        let max = self.days().iter().map(|d| d.humidity).max().unwrap_or_default();
        self.ctx.finish(
            Dialog::named("weekly-humidity")
                .with("min_percent", self.ctx.percent(min))
                .with("max_percent", self.ctx.percent(max)),
        )
    }

    fn sunrise(&self) -> Dialog {
        let band = self.sun_band(|d| d.sunrise.time());
        self.finish_sun("weekly-sunrise", band, |d| &d.sunrise)
    }

    fn sunset(&self) -> Dialog {
        let band = self.sun_band(|d| d.sunset.time());
        self.finish_sun("weekly-sunset", band, |d| &d.sunset)
    }

    /// First day with a meaningful chance of precipitation.
    fn precipitation(&self) -> Dialog {
        let next = self
            .days()
            .iter()
            .find(|d| d.chance_of_precipitation >= PRECIPITATION_THRESHOLD);
        let Some(day) = next else {
            return self.ctx.finish(Dialog::named("weekly-precipitation-none"));
        };

        let precipitation = if day.condition.is_precipitation() {
            day.condition.description.as_str()
        } else {
            "precipitation"
        };
        self.ctx.finish(
            Dialog::named("weekly-precipitation-next")
                .with("day", self.ctx.day(day.date()))
                .with("percent", self.ctx.percent(day.chance_of_precipitation))
                .with("precipitation", precipitation),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::phrases::PhraseTable;
    use crate::timeframe::{fixtures, forecast_for_multiple_days, summarize};
    use chrono::NaiveDate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 14).unwrap()
    }

    fn weekly<'a>(week: &'a [DailyWeather], ctx: DialogContext<'a>) -> WeeklyDialog<'a> {
        WeeklyDialog::new(summarize(week).unwrap(), ctx)
    }

    #[test]
    fn week_names_each_category_once() {
        let phrases = PhraseTable::for_lang("en-us");
        let config = Config::default().weather_config(None, None);
        let ctx = DialogContext {
            config: &config,
            location: None,
            today: today(),
            phrases: &phrases,
        };
        let report = fixtures::report(today(), [800, 500, 800, 803, 500, 500, 600, 800]);
        let week = forecast_for_multiple_days(&report, 7).unwrap();

        let dialogs = weekly(week, ctx).weather();
        let conditions: Vec<_> = dialogs
            .iter()
            .filter(|d| d.name == "weekly-condition-local")
            .map(|d| d.data["condition"].as_str())
            .collect();
        assert_eq!(conditions, vec!["rain", "clear", "clouds", "snow"]);
        assert_eq!(dialogs.last().map(|d| d.name.as_str()), Some("weekly-temperature-local"));

        // rain on Saturday, then Tuesday and Wednesday
        assert_eq!(dialogs[0].data["days"], "Saturday, Tuesday and Wednesday");
        assert_eq!(
            phrases.render(&dialogs[4]),
            "Over the next week, highs will be between 26 and 32 and lows between 5 and 11 degrees celsius."
        );
    }

    #[test]
    fn temperature_band_comes_from_the_summary() {
        let phrases = PhraseTable::for_lang("en-us");
        let config = Config::default().weather_config(None, None);
        let ctx = DialogContext {
            config: &config,
            location: None,
            today: today(),
            phrases: &phrases,
        };
        let report = fixtures::report(today(), [800; 8]);
        let summary = summarize(forecast_for_multiple_days(&report, 3).unwrap()).unwrap();
        assert_eq!((summary.high_min, summary.high_max), (26, 28));

        let builder = WeeklyDialog::new(summary, ctx);
        let highs = builder.temperature(TemperatureKind::High);
        let band = (highs.data["high_min"].as_str(), highs.data["high_max"].as_str());
        assert_eq!(band, ("26", "28"));
        let lows = builder.temperature(TemperatureKind::Low);
        assert_eq!((lows.data["low_min"].as_str(), lows.data["low_max"].as_str()), ("9", "11"));
    }

    #[test]
    fn day_lists_collapse_runs_and_whole_weeks() {
        let phrases = PhraseTable::for_lang("en-us");
        let config = Config::default().weather_config(None, None);
        let ctx = DialogContext {
            config: &config,
            location: None,
            today: today(),
            phrases: &phrases,
        };
        let report = fixtures::report(today(), [800; 8]);
        let week = forecast_for_multiple_days(&report, 7).unwrap();
        let builder = weekly(week, ctx);

        let all: Vec<_> = week.iter().collect();
        assert_eq!(builder.day_list(&all), "every day");

        let run: Vec<_> = week[1..4].iter().collect();
        assert_eq!(builder.day_list(&run), "Sunday through Tuesday");

        let pair = vec![&week[0], &week[1]];
        assert_eq!(builder.day_list(&pair), "Saturday and Sunday");
        assert_eq!(builder.day_list(&[&week[2]]), "Monday");
    }

    #[test]
    fn condition_confirmation_lists_matching_days() {
        let phrases = PhraseTable::for_lang("en-us");
        let config = Config::default().weather_config(None, None);
        let ctx = DialogContext {
            config: &config,
            location: None,
            today: today(),
            phrases: &phrases,
        };
        let report = fixtures::report(today(), [800, 800, 800, 600, 600, 800, 800, 800]);
        let week = forecast_for_multiple_days(&report, 7).unwrap();
        let builder = weekly(week, ctx);

        let snow = builder.condition(ConditionKeyword::Snow);
        assert_eq!(phrases.render(&snow), "Yes, expect snow Monday and Tuesday.");

        let storms = builder.condition(ConditionKeyword::Thunderstorm);
        assert_eq!(storms.name, "weekly-condition-not-expected-local");
    }

    #[test]
    fn precipitation_reports_the_first_wet_day() {
        let phrases = PhraseTable::for_lang("en-us");
        let config = Config::default().weather_config(None, None);
        let ctx = DialogContext {
            config: &config,
            location: None,
            today: today(),
            phrases: &phrases,
        };
        let report = fixtures::report(today(), [800, 800, 800, 500, 800, 800, 800, 800]);
        let week = forecast_for_multiple_days(&report, 7).unwrap();

        let dialog = weekly(week, ctx).precipitation();
        assert_eq!(dialog.data["day"], "Monday");
        assert_eq!(dialog.data["percent"], "70 percent");

        let dry = fixtures::report(today(), [800; 8]);
        let week = forecast_for_multiple_days(&dry, 7).unwrap();
        let dry_week = weekly(week, ctx).precipitation();
        assert_eq!(dry_week.name, "weekly-precipitation-none-local");
    }
}
