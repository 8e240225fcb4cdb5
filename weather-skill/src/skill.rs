//! The weather skill: one intent message in, spoken answers and screens out.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc, time::Duration};

use crate::{
    Config, WeatherError,
    config::WeatherConfig,
    dialog::{
        self, ConditionKeyword, CurrentDialog, DailyDialog, Dialog, DialogBuilder, DialogContext,
        HourlyDialog, TemperatureKind, WeeklyDialog,
    },
    dispatch::{
        DEVICE_NOT_PAIRED, Display, MessageBus, ResponseDispatcher, Speaker, WEATHER_REQUEST,
        WEATHER_RESPONSE,
    },
    display,
    intent::{self, IntentKind, IntentMessage, QueryDescriptor},
    model::{Coordinate, DailyWeather, UnitSystem, WeatherReport},
    phrases::PhraseTable,
    provider::{ReportLocation, ReportRequest, WeatherProvider},
    timeframe::{self, IntentWeather, NextPrecipitation},
    vocab::{self, Vocab},
};

/// Pause between screens of the current weather sequence.
const DEFAULT_DISPLAY_DWELL: Duration = Duration::from_secs(5);

type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Summary served to the homescreen on `weather.request`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomescreenReport {
    pub weather_temp: i32,
    pub high_temperature: i32,
    pub low_temperature: i32,
    pub weather_code: u32,
    pub condition_category: String,
    pub condition_description: String,
    pub system_unit: UnitSystem,
}

/// Payload of an inbound `weather.request` event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HomescreenRequest {
    #[serde(default)]
    pub lat_lon: Option<Coordinate>,
}

pub struct WeatherSkill {
    config: Config,
    provider: Box<dyn WeatherProvider>,
    speaker: Box<dyn Speaker>,
    display: Option<Box<dyn Display>>,
    bus: Box<dyn MessageBus>,
    clock: Clock,
    display_dwell: Duration,
}

impl fmt::Debug for WeatherSkill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeatherSkill")
            .field("provider", &self.provider)
            .field("display", &self.display.is_some())
            .field("display_dwell", &self.display_dwell)
            .finish_non_exhaustive()
    }
}

/// Everything fetched and resolved for one request.
struct Answer {
    query: QueryDescriptor,
    config: WeatherConfig,
    report: WeatherReport,
    phrases: PhraseTable,
    /// Spoken name of the place asked about, `None` for the device location.
    location: Option<String>,
}

impl Answer {
    fn ctx(&self) -> DialogContext<'_> {
        DialogContext {
            config: &self.config,
            location: self.location.as_deref(),
            today: self.report.today(),
            phrases: &self.phrases,
        }
    }

    /// Location shown on screens; always names a place.
    fn display_location(&self) -> String {
        match &self.location {
            Some(location) => location.clone(),
            None => {
                let home = &self.config.home;
                format!("{}, {}", home.city, home.region)
            }
        }
    }

    fn builder<'a>(&'a self, weather: IntentWeather<'a>) -> Box<dyn DialogBuilder + 'a> {
        dialog::dialog_builder(weather, &self.report, self.ctx())
    }
}

impl WeatherSkill {
    pub fn new(
        config: Config,
        provider: Box<dyn WeatherProvider>,
        speaker: Box<dyn Speaker>,
        bus: Box<dyn MessageBus>,
    ) -> Self {
        Self {
            config,
            provider,
            speaker,
            display: None,
            bus,
            clock: Arc::new(|| chrono::Local::now().naive_local()),
            display_dwell: DEFAULT_DISPLAY_DWELL,
        }
    }

    pub fn with_display(mut self, display: Box<dyn Display>) -> Self {
        self.display = Some(display);
        self
    }

    /// Replace the wall clock used to anchor weekday names and times of day.
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDateTime + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_display_dwell(mut self, dwell: Duration) -> Self {
        self.display_dwell = dwell;
        self
    }

    fn dispatcher(&self) -> ResponseDispatcher<'_> {
        ResponseDispatcher::new(self.speaker.as_ref(), self.display.as_deref(), self.display_dwell)
    }

    /// Answer one intent.
    ///
    /// Failures that have a spoken fallback (or the pairing signal) are
    /// handled here and reported as success; only speech and configuration
    /// failures are returned.
    pub async fn handle(&self, message: &IntentMessage) -> Result<(), WeatherError> {
        tracing::info!(
            intent = %message.intent,
            utterance = %message.utterance,
            "handling weather intent"
        );

        match self.respond(message).await {
            Ok(()) => Ok(()),
            Err(err) => self.recover(err).await,
        }
    }

    async fn recover(&self, err: WeatherError) -> Result<(), WeatherError> {
        if matches!(err, WeatherError::AuthenticationFailure) {
            tracing::error!("weather provider rejected credentials, device needs pairing");
            if let Err(bus_err) = self.bus.emit(DEVICE_NOT_PAIRED, serde_json::json!({})).await {
                tracing::warn!("failed to emit {DEVICE_NOT_PAIRED}: {bus_err:#}");
            }
            return Ok(());
        }

        let Some(fallback) = fallback_for(&err) else {
            return Err(err);
        };
        tracing::warn!("weather request failed: {err}");
        self.dispatcher().speak(&fallback).await
    }

    async fn respond(&self, message: &IntentMessage) -> Result<(), WeatherError> {
        match message.intent {
            IntentKind::CurrentWeather | IntentKind::LikeOutside => {
                self.report_current_weather(message).await
            }
            IntentKind::NumberDaysForecast => {
                let days = intent::requested_day_count(&message.utterance)?;
                self.report_multi_day_forecast(message, days).await
            }
            IntentKind::OneDayForecast => self.report_one_day_forecast(message).await,
            IntentKind::WeatherLater | IntentKind::WeatherAtTime => {
                self.report_one_hour_weather(message).await
            }
            IntentKind::WeekendForecast => self.report_weekend_forecast(message).await,
            IntentKind::WeekWeather => self.report_week_summary(message).await,
            IntentKind::CurrentTemperature
            | IntentKind::DailyTemperature
            | IntentKind::HourlyTemperature
            | IntentKind::IsHot => self.report_temperature(message, TemperatureKind::Current).await,
            IntentKind::HighTemperature => {
                self.report_temperature(message, TemperatureKind::High).await
            }
            IntentKind::LowTemperature => {
                self.report_temperature(message, TemperatureKind::Low).await
            }
            IntentKind::HowHotOrCold => {
                let kind = if vocab::voc_match(&message.utterance, Vocab::Hot) {
                    TemperatureKind::High
                } else {
                    TemperatureKind::Low
                };
                self.report_temperature(message, kind).await
            }
            IntentKind::IsWindy | IntentKind::CurrentWind => {
                self.report_with(message, |builder| builder.wind()).await
            }
            IntentKind::IsSnow => self.report_condition(message, ConditionKeyword::Snow).await,
            IntentKind::IsClear => self.report_condition(message, ConditionKeyword::Clear).await,
            IntentKind::IsCloudy => self.report_condition(message, ConditionKeyword::Clouds).await,
            IntentKind::IsFog => self.report_condition(message, ConditionKeyword::Fog).await,
            IntentKind::IsRain | IntentKind::NeedUmbrella => {
                self.report_condition(message, ConditionKeyword::Rain).await
            }
            IntentKind::IsStormy => {
                self.report_condition(message, ConditionKeyword::Thunderstorm).await
            }
            IntentKind::NextRain => self.report_next_precipitation(message).await,
            IntentKind::Humidity => self.report_with(message, |builder| builder.humidity()).await,
            IntentKind::Sunrise => self.report_sun(message, |builder| builder.sunrise()).await,
            IntentKind::Sunset => self.report_sun(message, |builder| builder.sunset()).await,
        }
    }

    /// Normalize the message and fetch the report it needs.
    async fn answer(&self, message: &IntentMessage) -> Result<Answer, WeatherError> {
        let base = self.config.weather_config(message.lang.as_deref(), message.lat_lon);
        let query = intent::normalize(message, &base, (self.clock)())?;
        let config = base.with_units(query.units);

        let location = match &query.location {
            Some(place) => ReportLocation::Place(place.clone()),
            None => ReportLocation::Coordinate(config.coordinate),
        };
        let request = ReportRequest { location, units: config.units, lang: config.lang.clone() };
        tracing::debug!(?request, "fetching weather report");

        let fetched = self.provider.get_report(&request).await?;
        let asked = query.location.as_deref();
        let location = dialog::spoken_location(asked, fetched.geolocation.as_ref(), &config.home);

        Ok(Answer {
            phrases: PhraseTable::for_lang(&config.lang),
            query,
            config,
            report: fetched.report,
            location,
        })
    }

    /// Speak a single dialog built for whatever timeframe the query resolved to.
    async fn report_with(
        &self,
        message: &IntentMessage,
        build: impl FnOnce(&dyn DialogBuilder) -> Dialog,
    ) -> Result<(), WeatherError> {
        let answer = self.answer(message).await?;
        let weather = timeframe::weather_for_intent(&answer.report, &answer.query)?;
        let dialog = build(answer.builder(weather).as_ref());
        self.dispatcher().speak(&dialog).await
    }

    async fn report_current_weather(&self, message: &IntentMessage) -> Result<(), WeatherError> {
        let answer = self.answer(message).await?;
        let dispatcher = self.dispatcher();
        let location = answer.display_location();

        dispatcher.show(&display::current_screen(&answer.report, &location)).await;
        let dialogs = CurrentDialog::new(&answer.report.current, answer.ctx()).weather();
        dispatcher.speak_all(&dialogs).await?;

        if dispatcher.has_display() {
            tokio::time::sleep(self.display_dwell).await;
            dispatcher
                .show_sequence(&[
                    display::hourly_screen(&answer.report, &location, answer.config.time_format),
                    display::multi_day_screen(answer.report.daily.iter().skip(1)),
                ])
                .await;
        }
        Ok(())
    }

    async fn report_one_hour_weather(&self, message: &IntentMessage) -> Result<(), WeatherError> {
        let answer = self.answer(message).await?;
        let hours = answer.query.relative_hour.unwrap_or(0);
        let hour = timeframe::forecast_for_hour(&answer.report, hours)?;
        let day = answer.report.daily.iter().find(|d| d.date() == hour.date_time.date_naive());

        let dialogs = HourlyDialog::new(hour, day, answer.ctx()).weather();
        self.dispatcher().speak_all(&dialogs).await
    }

    async fn report_one_day_forecast(&self, message: &IntentMessage) -> Result<(), WeatherError> {
        let answer = self.answer(message).await?;
        let offset = answer.query.relative_day.unwrap_or(0);
        let day = timeframe::forecast_for_date(&answer.report, offset)?;
        let dispatcher = self.dispatcher();

        dispatcher.show(&display::single_day_screen(day, &answer.display_location())).await;
        dispatcher.speak_all(&DailyDialog::new(day, answer.ctx()).weather()).await
    }

    /// Daily forecasts for the next `days` days; too many days speaks the
    /// notice once and reports what is available.
    async fn report_multi_day_forecast(
        &self,
        message: &IntentMessage,
        days: i64,
    ) -> Result<(), WeatherError> {
        let answer = self.answer(message).await?;
        let dispatcher = self.dispatcher();

        let forecast = match timeframe::forecast_for_multiple_days(&answer.report, days) {
            Ok(forecast) => forecast,
            Err(err @ WeatherError::DayCountOutOfRange { available, .. }) => {
                tracing::info!("{err}, reporting {available} days instead");
                if let Some(notice) = fallback_for(&err) {
                    dispatcher.speak(&notice).await?;
                }
                timeframe::forecast_for_multiple_days(&answer.report, available as i64)?
            }
            Err(err) => return Err(err),
        };

        self.report_days(&answer, forecast.iter()).await
    }

    async fn report_weekend_forecast(&self, message: &IntentMessage) -> Result<(), WeatherError> {
        let answer = self.answer(message).await?;
        let weekend = timeframe::weekend_forecast(&answer.report)?;
        self.report_days(&answer, weekend.into_iter()).await
    }

    async fn report_days<'a>(
        &self,
        answer: &'a Answer,
        days: impl Iterator<Item = &'a DailyWeather> + Clone,
    ) -> Result<(), WeatherError> {
        let dispatcher = self.dispatcher();
        dispatcher.show(&display::multi_day_screen(days.clone())).await;

        let dialogs: Vec<Dialog> = days
            .flat_map(|day| DailyDialog::new(day, answer.ctx()).weather())
            .collect();
        dispatcher.speak_all(&dialogs).await
    }

    async fn report_week_summary(&self, message: &IntentMessage) -> Result<(), WeatherError> {
        let answer = self.answer(message).await?;
        let summary = timeframe::week_summary(&answer.report)?;
        let dispatcher = self.dispatcher();

        dispatcher.show(&display::multi_day_screen(summary.days)).await;
        dispatcher.speak_all(&WeeklyDialog::new(summary, answer.ctx()).weather()).await
    }

    async fn report_temperature(
        &self,
        message: &IntentMessage,
        kind: TemperatureKind,
    ) -> Result<(), WeatherError> {
        self.report_with(message, |builder| builder.temperature(kind)).await
    }

    async fn report_condition(
        &self,
        message: &IntentMessage,
        asked: ConditionKeyword,
    ) -> Result<(), WeatherError> {
        self.report_with(message, |builder| builder.condition(asked)).await
    }

    async fn report_next_precipitation(&self, message: &IntentMessage) -> Result<(), WeatherError> {
        let answer = self.answer(message).await?;
        let report = &answer.report;

        let dialog = match timeframe::next_precipitation(report) {
            Some(NextPrecipitation::Hour(hour)) => {
                answer.builder(IntentWeather::Hourly(hour)).precipitation()
            }
            Some(NextPrecipitation::Day(day)) => {
                answer.builder(IntentWeather::Daily(day)).precipitation()
            }
            None => dialog::no_precipitation_dialog(&answer.ctx()),
        };
        self.dispatcher().speak(&dialog).await
    }

    async fn report_sun(
        &self,
        message: &IntentMessage,
        build: impl FnOnce(&dyn DialogBuilder) -> Dialog,
    ) -> Result<(), WeatherError> {
        let answer = self.answer(message).await?;
        let weather = timeframe::weather_for_intent(&answer.report, &answer.query)?;

        let (date_time, sunrise, sunset) = match weather {
            IntentWeather::Current(current) => (current.date_time, current.sunrise, current.sunset),
            IntentWeather::Daily(day) => (day.date_time, day.sunrise, day.sunset),
            IntentWeather::Hourly(hour) => {
                let date = hour.date_time.date_naive();
                let today = &answer.report.current;
                match answer.report.daily.iter().find(|d| d.date() == date) {
                    Some(day) => (day.date_time, day.sunrise, day.sunset),
                    None => (hour.date_time, today.sunrise, today.sunset),
                }
            }
            IntentWeather::Weekly(_) => {
                let today = &answer.report.current;
                (today.date_time, today.sunrise, today.sunset)
            }
        };

        let dispatcher = self.dispatcher();
        let screen = display::sunrise_sunset_screen(
            &date_time,
            &sunrise,
            &sunset,
            &answer.display_location(),
            answer.config.time_format,
        );
        dispatcher.show(&screen).await;

        let dialog = build(answer.builder(weather).as_ref());
        dispatcher.speak(&dialog).await
    }

    /// Current conditions for the homescreen, also published as `weather.response`.
    pub async fn homescreen(
        &self,
        request: &HomescreenRequest,
    ) -> Result<HomescreenReport, WeatherError> {
        let config = self.config.weather_config(None, request.lat_lon);
        let fetched = self
            .provider
            .get_report(&ReportRequest {
                location: ReportLocation::Coordinate(config.coordinate),
                units: config.units,
                lang: config.lang.clone(),
            })
            .await?;

        let current = &fetched.report.current;
        let summary = HomescreenReport {
            weather_temp: current.temperature,
            high_temperature: current.temperature_high,
            low_temperature: current.temperature_low,
            weather_code: current.condition.code,
            condition_category: current.condition.category.clone(),
            condition_description: current.condition.description.clone(),
            system_unit: config.units,
        };

        let payload = serde_json::json!({ "report": &summary });
        if let Err(err) = self.bus.emit(WEATHER_RESPONSE, payload).await {
            tracing::warn!("failed to emit {WEATHER_RESPONSE}: {err:#}");
        }
        Ok(summary)
    }

    /// Handle a bus event addressed to the skill.
    ///
    /// Only `weather.request` is understood; other events return `None`.
    pub async fn on_event(
        &self,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<Option<HomescreenReport>, WeatherError> {
        if event != WEATHER_REQUEST {
            tracing::debug!(event, "ignoring event");
            return Ok(None);
        }
        let request: HomescreenRequest = if payload.is_null() {
            HomescreenRequest::default()
        } else {
            serde_json::from_value(payload).map_err(|err| {
                WeatherError::MalformedQuery(format!("invalid {WEATHER_REQUEST} payload: {err}"))
            })?
        };
        self.homescreen(&request).await.map(Some)
    }
}

/// The one utterance spoken in place of an answer when `err` ends a request.
fn fallback_for(err: &WeatherError) -> Option<Dialog> {
    let fallback = Dialog::named(err.fallback_dialog()?);
    Some(match err {
        WeatherError::LocationNotFound(location) => fallback.with("location", location),
        WeatherError::DayCountOutOfRange { available, .. } => fallback.with("number", available),
        _ => fallback,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderReport;
    use crate::timeframe::fixtures;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct FixedProvider(WeatherReport);

    #[async_trait]
    impl WeatherProvider for FixedProvider {
        async fn get_report(
            &self,
            _request: &ReportRequest,
        ) -> Result<ProviderReport, WeatherError> {
            Ok(ProviderReport { geolocation: None, report: self.0.clone() })
        }
    }

    #[derive(Debug, Clone, Default)]
    struct Spoken(Arc<Mutex<Vec<Dialog>>>);

    #[async_trait]
    impl Speaker for Spoken {
        async fn speak(&self, dialog: &Dialog) -> Result<(), WeatherError> {
            self.0.lock().unwrap().push(dialog.clone());
            Ok(())
        }
    }

    #[derive(Debug, Clone, Default)]
    struct Events(Arc<Mutex<Vec<(String, serde_json::Value)>>>);

    #[async_trait]
    impl MessageBus for Events {
        async fn emit(&self, event: &str, payload: serde_json::Value) -> anyhow::Result<()> {
            self.0.lock().unwrap().push((event.to_string(), payload));
            Ok(())
        }
    }

    fn skill(spoken: &Spoken, events: &Events) -> WeatherSkill {
        let today = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
        let report = fixtures::report(today, [800, 500, 800, 803, 500, 500, 600, 800]);
        WeatherSkill::new(
            Config::default(),
            Box::new(FixedProvider(report)),
            Box::new(spoken.clone()),
            Box::new(events.clone()),
        )
        .with_clock(move || today.and_hms_opt(15, 0, 0).unwrap())
        .with_display_dwell(Duration::ZERO)
    }

    fn names(spoken: &Spoken) -> Vec<String> {
        spoken.0.lock().unwrap().iter().map(|d| d.name.clone()).collect()
    }

    async fn ask(skill: &WeatherSkill, intent: IntentKind, utterance: &str) {
        skill.handle(&IntentMessage::new(intent, utterance)).await.unwrap();
    }

    #[tokio::test]
    async fn how_hot_picks_high_and_how_cold_picks_low() {
        let (spoken, events) = (Spoken::default(), Events::default());
        let skill = skill(&spoken, &events);

        ask(&skill, IntentKind::HowHotOrCold, "how hot will it be").await;
        ask(&skill, IntentKind::HowHotOrCold, "how cold will it be").await;

        assert_eq!(
            names(&spoken),
            vec!["current-temperature-high-local", "current-temperature-low-local"]
        );
    }

    #[tokio::test]
    async fn next_rain_finds_the_first_wet_day() {
        let (spoken, events) = (Spoken::default(), Events::default());
        let skill = skill(&spoken, &events);

        ask(&skill, IntentKind::NextRain, "when will it rain next").await;

        let spoken = spoken.0.lock().unwrap();
        assert_eq!(spoken[0].name, "daily-precipitation-next-local");
        assert_eq!(spoken[0].data["day"], "tomorrow");
    }

    #[tokio::test]
    async fn unreadable_day_count_speaks_the_generic_fallback() {
        let (spoken, events) = (Spoken::default(), Events::default());
        let skill = skill(&spoken, &events);

        ask(&skill, IntentKind::NumberDaysForecast, "what's the forecast").await;
        assert_eq!(names(&spoken), vec!["cant-get-forecast"]);
    }

    #[tokio::test]
    async fn homescreen_emits_the_summary() {
        let (spoken, events) = (Spoken::default(), Events::default());
        let skill = skill(&spoken, &events);

        let summary = skill.homescreen(&HomescreenRequest::default()).await.unwrap();
        assert_eq!(summary.weather_temp, 22);
        assert_eq!(summary.weather_code, 801);
        assert_eq!(summary.system_unit, UnitSystem::Metric);

        let events = events.0.lock().unwrap();
        assert_eq!(events[0].0, WEATHER_RESPONSE);
        assert_eq!(events[0].1["report"]["condition_category"], "Clouds");
        assert!(spoken.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_weather_requests_are_answered() {
        let (spoken, events) = (Spoken::default(), Events::default());
        let skill = skill(&spoken, &events);

        assert!(skill.on_event("volume.set", serde_json::json!({})).await.unwrap().is_none());
        let with_coordinate =
            serde_json::json!({"lat_lon": {"latitude": 52.52, "longitude": 13.4}});
        assert!(skill.on_event(WEATHER_REQUEST, with_coordinate).await.unwrap().is_some());
        assert!(matches!(
            skill.on_event(WEATHER_REQUEST, serde_json::json!({"lat_lon": "north"})).await,
            Err(WeatherError::MalformedQuery(_))
        ));
    }

    #[tokio::test]
    async fn sunset_tomorrow_is_daily() {
        let (spoken, events) = (Spoken::default(), Events::default());
        let skill = skill(&spoken, &events);

        ask(&skill, IntentKind::Sunset, "when is sunset tomorrow").await;
        assert_eq!(names(&spoken), vec!["daily-sunset-local"]);
    }
}
