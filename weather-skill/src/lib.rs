//! Core library for the `weather-skill` voice assistant skill.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Intent normalization into a canonical weather query
//! - Abstraction over weather providers
//! - Timeframe resolution and dialog construction
//! - Output seams for speech, display and the message bus
//!
//! It is used by `weather-skill-cli`, but can also be embedded in any
//! assistant runtime that supplies its own `Speaker`, `Display` and
//! `MessageBus`.

pub mod config;
pub mod dialog;
pub mod dispatch;
pub mod display;
pub mod error;
pub mod intent;
pub mod model;
pub mod phrases;
pub mod provider;
pub mod skill;
pub mod timeframe;
pub mod vocab;

pub use config::{Config, ProviderConfig, WeatherConfig};
pub use dialog::{Dialog, DialogBuilder};
pub use dispatch::{Display, MessageBus, Speaker};
pub use error::WeatherError;
pub use intent::{IntentKind, IntentMessage, QueryDescriptor, Timeframe};
pub use model::WeatherReport;
pub use phrases::PhraseTable;
pub use provider::{ProviderId, WeatherProvider};
pub use skill::{HomescreenReport, HomescreenRequest, WeatherSkill};
