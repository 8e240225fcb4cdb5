use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use inquire::{Confirm, Password, PasswordDisplayMode};
use std::time::Duration;
use weather_skill::{
    Config, HomescreenRequest, IntentKind, IntentMessage, ProviderId, WeatherSkill,
    model::Coordinate, provider,
};

use crate::console::{ConsoleDisplay, ConsoleSpeaker, LogBus};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-skill", version, about = "Voice weather skill console")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name, e.g. "openweather" or "weatherapi".
        provider: String,
    },

    /// Ask the skill a question as if the intent parser had matched it.
    Ask {
        /// Intent name, e.g. "current_weather" or "N_days_forecast".
        intent: String,

        /// What the user said.
        #[arg(long, short, default_value = "")]
        utterance: String,

        /// Place asked about; defaults to the configured location.
        #[arg(long, short)]
        location: Option<String>,

        /// Unit asked for, e.g. "fahrenheit" or "celsius".
        #[arg(long)]
        unit: Option<String>,

        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,

        /// Request language, e.g. "en-us".
        #[arg(long)]
        lang: Option<String>,

        /// Print display screens as well as speech.
        #[arg(long)]
        display: bool,

        /// Use this provider instead of the configured default.
        #[arg(long)]
        provider: Option<String>,
    },

    /// Print the homescreen summary.
    Homescreen {
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,
    },

    /// List the intents the skill answers.
    Intents,
}

fn coordinate(lat: Option<f64>, lon: Option<f64>) -> Option<Coordinate> {
    lat.zip(lon).map(|(latitude, longitude)| Coordinate { latitude, longitude })
}

fn build_skill(config: Config, provider: Option<&str>, lang: &str) -> anyhow::Result<WeatherSkill> {
    let weather_provider = match provider {
        Some(name) => provider::provider_from_config(ProviderId::try_from(name)?, &config)?,
        None => provider::default_provider_from_config(&config)?,
    };

    Ok(WeatherSkill::new(
        config,
        weather_provider,
        Box::new(ConsoleSpeaker::new(lang)),
        Box::new(LogBus),
    ))
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { provider } => configure(&provider),
            Command::Ask {
                intent,
                utterance,
                location,
                unit,
                lat,
                lon,
                lang,
                display,
                provider,
            } => {
                let config = Config::load()?;
                let intent = IntentKind::try_from(intent.as_str())?;

                let mut message = IntentMessage::new(intent, utterance);
                if let Some(location) = location {
                    message = message.with_slot("location", location);
                }
                if let Some(unit) = unit {
                    message = message.with_slot("unit", unit);
                }
                if let Some(coordinate) = coordinate(lat, lon) {
                    message = message.with_lat_lon(coordinate);
                }
                message.lang = lang;

                let speech_lang =
                    message.lang.clone().unwrap_or_else(|| config.device.lang.clone());
                let mut skill = build_skill(config, provider.as_deref(), &speech_lang)?;
                if display {
                    skill = skill
                        .with_display(Box::new(ConsoleDisplay))
                        .with_display_dwell(Duration::from_millis(500));
                }

                skill.handle(&message).await.context("Weather skill failed to answer")?;
                Ok(())
            }
            Command::Homescreen { lat, lon } => {
                let config = Config::load()?;
                let lang = config.device.lang.clone();
                let skill = build_skill(config, None, &lang)?;

                let summary = skill
                    .homescreen(&HomescreenRequest { lat_lon: coordinate(lat, lon) })
                    .await
                    .context("Failed to fetch the homescreen summary")?;
                println!("{}", serde_json::to_string_pretty(&summary)?);
                Ok(())
            }
            Command::Intents => {
                for intent in IntentKind::all() {
                    println!("{intent}");
                }
                Ok(())
            }
        }
    }
}

/// Prompt for an API key and store it, optionally making the provider the default.
fn configure(provider: &str) -> anyhow::Result<()> {
    let id = ProviderId::try_from(provider)?;
    let mut config = Config::load()?;

    let api_key = Password::new(&format!("API key for {id}:"))
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    let api_key = api_key.trim().to_string();
    if api_key.is_empty() {
        bail!("API key must not be empty");
    }

    config.upsert_provider_api_key(id, api_key);

    let already_default = config.default_provider_id().is_ok_and(|current| current == id);
    if !already_default
        && Confirm::new(&format!("Make {id} the default provider?"))
            .with_default(true)
            .prompt()
            .context("Failed to read answer")?
    {
        config.set_default_provider(id);
    }

    config.save()?;
    println!("Saved {id} credentials to {}", Config::config_file_path()?.display());
    Ok(())
}
