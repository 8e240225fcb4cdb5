//! Output seams: speech, screen and message bus, plus the dispatcher that
//! drives them for one response.

use async_trait::async_trait;
use std::{fmt::Debug, time::Duration};

use crate::{WeatherError, dialog::Dialog, display::Screen};

/// Event asking for the homescreen summary.
pub const WEATHER_REQUEST: &str = "weather.request";
/// Event carrying the homescreen summary back.
pub const WEATHER_RESPONSE: &str = "weather.response";
/// Signal sent instead of speech when the provider rejects the credentials.
pub const DEVICE_NOT_PAIRED: &str = "device.not.paired";

/// Text-to-speech output. `speak` returns once the utterance has finished.
#[async_trait]
pub trait Speaker: Send + Sync + Debug {
    async fn speak(&self, dialog: &Dialog) -> Result<(), WeatherError>;
}

/// Optional screen.
#[async_trait]
pub trait Display: Send + Sync + Debug {
    fn is_connected(&self) -> bool;

    async fn show(&self, screen: &Screen) -> anyhow::Result<()>;
}

#[async_trait]
pub trait MessageBus: Send + Sync + Debug {
    async fn emit(&self, event: &str, payload: serde_json::Value) -> anyhow::Result<()>;
}

/// Delivers one response: dialogs in order, screens when a display is attached.
#[derive(Debug, Clone, Copy)]
pub struct ResponseDispatcher<'a> {
    speaker: &'a dyn Speaker,
    display: Option<&'a dyn Display>,
    dwell: Duration,
}

impl<'a> ResponseDispatcher<'a> {
    pub fn new(
        speaker: &'a dyn Speaker,
        display: Option<&'a dyn Display>,
        dwell: Duration,
    ) -> Self {
        Self { speaker, display, dwell }
    }

    pub fn has_display(&self) -> bool {
        self.display.is_some_and(|d| d.is_connected())
    }

    pub async fn speak(&self, dialog: &Dialog) -> Result<(), WeatherError> {
        tracing::info!(dialog = %dialog.name, "speaking dialog");
        self.speaker.speak(dialog).await
    }

    /// Speak each dialog, waiting for one to finish before the next starts.
    pub async fn speak_all(&self, dialogs: &[Dialog]) -> Result<(), WeatherError> {
        for dialog in dialogs {
            self.speak(dialog).await?;
        }
        Ok(())
    }

    /// Show a screen if a display is connected. Screen failures never end a
    /// request.
    pub async fn show(&self, screen: &Screen) {
        let Some(display) = self.display.filter(|d| d.is_connected()) else {
            return;
        };
        tracing::debug!(page = screen.page(), "showing screen");
        if let Err(err) = display.show(screen).await {
            tracing::warn!(page = screen.page(), "failed to show screen: {err:#}");
        }
    }

    /// Show a sequence of screens, pausing between them.
    pub async fn show_sequence(&self, screens: &[Screen]) {
        if !self.has_display() {
            return;
        }
        for (index, screen) in screens.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.dwell).await;
            }
            self.show(screen).await;
        }
    }
}
