use crate::{intent::Timeframe, model::CurrentWeather};

use super::{ConditionKeyword, Dialog, DialogBuilder, DialogContext, TemperatureKind};

/// Dialogs about conditions right now.
#[derive(Debug, Clone, Copy)]
pub struct CurrentDialog<'a> {
    weather: &'a CurrentWeather,
    ctx: DialogContext<'a>,
}

impl<'a> CurrentDialog<'a> {
    pub fn new(weather: &'a CurrentWeather, ctx: DialogContext<'a>) -> Self {
        Self { weather, ctx }
    }

    /// Today's forecast high and low.
    pub fn high_low(&self) -> Dialog {
        self.ctx.finish(
            Dialog::named("current-temperature-high-low")
                .with("high_temperature", self.weather.temperature_high)
                .with("low_temperature", self.weather.temperature_low),
        )
    }

    fn sun_event(&self, event: &str, at: &chrono::DateTime<chrono::FixedOffset>) -> Dialog {
        let tense = if *at <= self.weather.date_time { "past" } else { "future" };
        self.ctx.finish(
            Dialog::named(format!("current-{event}-{tense}")).with("time", self.ctx.time(at)),
        )
    }
}

impl DialogBuilder for CurrentDialog<'_> {
    fn timeframe(&self) -> Timeframe {
        Timeframe::Current
    }

    fn weather(&self) -> Vec<Dialog> {
        let summary = Dialog::named("current-weather")
            .with("condition", &self.weather.condition.description)
            .with("temperature", self.weather.temperature)
            .with("temperature_unit", self.ctx.config.temperature_unit());
        vec![self.ctx.finish(summary), self.high_low()]
    }

    fn condition(&self, asked: ConditionKeyword) -> Dialog {
        let name = if asked.matches(&self.weather.condition.category) {
            "current-condition-expected"
        } else {
            "current-condition-not-expected"
        };
        self.ctx.finish(Dialog::named(name).with("condition", &self.weather.condition.description))
    }

    fn temperature(&self, kind: TemperatureKind) -> Dialog {
        let dialog = match kind {
            TemperatureKind::Current => Dialog::named("current-temperature")
                .with("temperature", self.weather.temperature),
            TemperatureKind::High => Dialog::named("current-temperature-high")
                .with("high_temperature", self.weather.temperature_high),
            TemperatureKind::Low => Dialog::named("current-temperature-low")
                .with("low_temperature", self.weather.temperature_low),
        };
        self.ctx.finish(dialog.with("temperature_unit", self.ctx.config.temperature_unit()))
    }

    fn wind(&self) -> Dialog {
        let strength = self.ctx.wind_strength(self.weather.wind_speed);
        self.ctx.finish(
            Dialog::named(format!("current-wind-{strength}"))
                .with("speed", self.weather.wind_speed.round())
                .with("speed_unit", self.ctx.config.speed_unit())
                .with("direction", self.weather.wind_direction.spoken()),
        )
    }

    fn humidity(&self) -> Dialog {
        let percent = self.ctx.percent(self.weather.humidity);
        self.ctx.finish(Dialog::named("current-humidity").with("percent", percent))
    }

    fn sunrise(&self) -> Dialog {
        self.sun_event("sunrise", &self.weather.sunrise)
    }

    fn sunset(&self) -> Dialog {
        self.sun_event("sunset", &self.weather.sunset)
    }

    fn precipitation(&self) -> Dialog {
        if self.weather.condition.is_precipitation() {
            self.ctx.finish(
                Dialog::named("current-precipitation-now")
                    .with("condition", &self.weather.condition.description),
            )
        } else {
            self.ctx.finish(Dialog::named("current-precipitation-none"))
        }
    }
}
