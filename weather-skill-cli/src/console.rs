//! Console implementations of the skill's output seams.

use async_trait::async_trait;
use weather_skill::{
    Dialog, Display, MessageBus, PhraseTable, Speaker, WeatherError, display::Screen,
};

/// Prints each dialog as the sentence it would be spoken as.
#[derive(Debug)]
pub struct ConsoleSpeaker {
    phrases: PhraseTable,
}

impl ConsoleSpeaker {
    pub fn new(lang: &str) -> Self {
        Self { phrases: PhraseTable::for_lang(lang) }
    }
}

#[async_trait]
impl Speaker for ConsoleSpeaker {
    async fn speak(&self, dialog: &Dialog) -> Result<(), WeatherError> {
        println!("{}", self.phrases.render(dialog));
        Ok(())
    }
}

/// Prints screen payloads as JSON.
#[derive(Debug)]
pub struct ConsoleDisplay;

#[async_trait]
impl Display for ConsoleDisplay {
    fn is_connected(&self) -> bool {
        true
    }

    async fn show(&self, screen: &Screen) -> anyhow::Result<()> {
        let payload = serde_json::to_string_pretty(screen)?;
        println!("[{}] {payload}", screen.page());
        Ok(())
    }
}

/// Logs emitted events.
#[derive(Debug)]
pub struct LogBus;

#[async_trait]
impl MessageBus for LogBus {
    async fn emit(&self, event: &str, payload: serde_json::Value) -> anyhow::Result<()> {
        tracing::info!(event, %payload, "bus event");
        Ok(())
    }
}
