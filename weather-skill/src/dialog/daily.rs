use crate::{intent::Timeframe, model::DailyWeather, timeframe::PRECIPITATION_THRESHOLD};

use super::{ConditionKeyword, Dialog, DialogBuilder, DialogContext, TemperatureKind};

/// Dialogs about a single day.
///
/// A day that is today elides the day name and uses the `-today` variant.
#[derive(Debug, Clone, Copy)]
pub struct DailyDialog<'a> {
    weather: &'a DailyWeather,
    ctx: DialogContext<'a>,
}

impl<'a> DailyDialog<'a> {
    pub fn new(weather: &'a DailyWeather, ctx: DialogContext<'a>) -> Self {
        Self { weather, ctx }
    }

    fn is_today(&self) -> bool {
        self.weather.date() == self.ctx.today
    }

    fn finish(&self, mut dialog: Dialog) -> Dialog {
        if self.is_today() {
            dialog.name.push_str("-today");
        } else {
            dialog = dialog.with("day", self.ctx.day(self.weather.date()));
        }
        self.ctx.finish(dialog)
    }
}

impl DialogBuilder for DailyDialog<'_> {
    fn timeframe(&self) -> Timeframe {
        Timeframe::Daily
    }

    fn weather(&self) -> Vec<Dialog> {
        vec![self.finish(
            Dialog::named("daily-weather")
                .with("condition", &self.weather.condition.description)
                .with("high_temperature", self.weather.temperature_high)
                .with("low_temperature", self.weather.temperature_low)
                .with("temperature_unit", self.ctx.config.temperature_unit()),
        )]
    }

    fn condition(&self, asked: ConditionKeyword) -> Dialog {
        let name = if asked.matches(&self.weather.condition.category) {
            "daily-condition-expected"
        } else {
            "daily-condition-not-expected"
        };
        self.finish(Dialog::named(name).with("condition", &self.weather.condition.description))
    }

    fn temperature(&self, kind: TemperatureKind) -> Dialog {
        let name = match kind {
            TemperatureKind::Current => "daily-temperature",
            TemperatureKind::High => "daily-temperature-high",
            TemperatureKind::Low => "daily-temperature-low",
        };
        self.finish(
            Dialog::named(name)
                .with("high_temperature", self.weather.temperature_high)
                .with("low_temperature", self.weather.temperature_low)
                .with("temperature_unit", self.ctx.config.temperature_unit()),
        )
    }

    fn wind(&self) -> Dialog {
        let strength = self.ctx.wind_strength(self.weather.wind_speed);
        self.finish(
            Dialog::named(format!("daily-wind-{strength}"))
                .with("speed", self.weather.wind_speed.round())
                .with("speed_unit", self.ctx.config.speed_unit())
                .with("direction", self.weather.wind_direction.spoken()),
        )
    }

    fn humidity(&self) -> Dialog {
        let percent = self.ctx.percent(self.weather.humidity);
        self.finish(Dialog::named("daily-humidity").with("percent", percent))
    }

    fn sunrise(&self) -> Dialog {
        let time = self.ctx.time(&self.weather.sunrise);
        self.finish(Dialog::named("daily-sunrise").with("time", time))
    }

    fn sunset(&self) -> Dialog {
        let time = self.ctx.time(&self.weather.sunset);
        self.finish(Dialog::named("daily-sunset").with("time", time))
    }

    fn precipitation(&self) -> Dialog {
        let precipitation = if self.weather.chance_of_precipitation >= PRECIPITATION_THRESHOLD
            && self.weather.condition.is_precipitation()
        {
            self.weather.condition.description.as_str()
        } else {
            "precipitation"
        };
        self.finish(
            Dialog::named("daily-precipitation-next")
                .with("percent", self.ctx.percent(self.weather.chance_of_precipitation))
                .with("precipitation", precipitation),
        )
    }
}
