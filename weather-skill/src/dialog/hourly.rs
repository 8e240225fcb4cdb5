use crate::{
    intent::Timeframe,
    model::{DailyWeather, HourlyWeather},
};

use super::{ConditionKeyword, DailyDialog, Dialog, DialogBuilder, DialogContext, TemperatureKind};

/// Dialogs about one forecast hour.
#[derive(Debug, Clone, Copy)]
pub struct HourlyDialog<'a> {
    weather: &'a HourlyWeather,
    /// Daily forecast for the same date, for the sun times.
    day: Option<&'a DailyWeather>,
    ctx: DialogContext<'a>,
}

impl<'a> HourlyDialog<'a> {
    pub fn new(
        weather: &'a HourlyWeather,
        day: Option<&'a DailyWeather>,
        ctx: DialogContext<'a>,
    ) -> Self {
        Self { weather, day, ctx }
    }

    fn finish(&self, dialog: Dialog) -> Dialog {
        self.ctx.finish(dialog.with("time", self.ctx.time(&self.weather.date_time)))
    }

    fn sun_times(&self) -> Option<DailyDialog<'a>> {
        self.day.map(|day| DailyDialog::new(day, self.ctx))
    }
}

impl DialogBuilder for HourlyDialog<'_> {
    fn timeframe(&self) -> Timeframe {
        Timeframe::Hourly
    }

    fn weather(&self) -> Vec<Dialog> {
        vec![self.finish(
            Dialog::named("hourly-weather")
                .with("condition", &self.weather.condition.description)
                .with("temperature", self.weather.temperature)
                .with("temperature_unit", self.ctx.config.temperature_unit()),
        )]
    }

    fn condition(&self, asked: ConditionKeyword) -> Dialog {
        let name = if asked.matches(&self.weather.condition.category) {
            "hourly-condition-expected"
        } else {
            "hourly-condition-not-expected"
        };
        self.finish(Dialog::named(name).with("condition", &self.weather.condition.description))
    }

    /// An hour has a single temperature, so every kind speaks it.
    fn temperature(&self, _kind: TemperatureKind) -> Dialog {
        self.finish(
            Dialog::named("hourly-temperature")
                .with("temperature", self.weather.temperature)
                .with("temperature_unit", self.ctx.config.temperature_unit()),
        )
    }

    fn wind(&self) -> Dialog {
        let strength = self.ctx.wind_strength(self.weather.wind_speed);
        self.finish(
            Dialog::named(format!("hourly-wind-{strength}"))
                .with("speed", self.weather.wind_speed.round())
                .with("speed_unit", self.ctx.config.speed_unit())
                .with("direction", self.weather.wind_direction.spoken()),
        )
    }

    fn humidity(&self) -> Dialog {
        let percent = self.ctx.percent(self.weather.humidity);
        self.finish(Dialog::named("hourly-humidity").with("percent", percent))
    }

    fn sunrise(&self) -> Dialog {
        match self.sun_times() {
            Some(day) => day.sunrise(),
            None => self.ctx.finish(Dialog::named("sun-times-unavailable")),
        }
    }

    fn sunset(&self) -> Dialog {
        match self.sun_times() {
            Some(day) => day.sunset(),
            None => self.ctx.finish(Dialog::named("sun-times-unavailable")),
        }
    }

    fn precipitation(&self) -> Dialog {
        let precipitation = if self.weather.condition.is_precipitation() {
            self.weather.condition.description.as_str()
        } else {
            "precipitation"
        };
        self.finish(
            Dialog::named("hourly-precipitation-next")
                .with("percent", self.ctx.percent(self.weather.chance_of_precipitation))
                .with("precipitation", precipitation),
        )
    }
}
