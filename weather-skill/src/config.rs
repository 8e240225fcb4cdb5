use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use crate::{
    model::{Coordinate, Geolocation, UnitPreference, UnitSystem},
    provider::ProviderId,
};

/// Configuration for a single provider (API key, optional endpoint override).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,

    /// Replaces the provider's public endpoint, e.g. to point at a proxy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Settings owned by the skill itself.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SkillSettings {
    #[serde(default)]
    pub units: UnitPreference,
}

/// How clock times are shown on the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeFormat {
    /// 12-hour clock.
    #[default]
    Half,
    /// 24-hour clock.
    Full,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceLocation {
    pub city: String,
    pub region: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for DeviceLocation {
    fn default() -> Self {
        Self {
            city: "Lawrence".to_string(),
            region: "Kansas".to_string(),
            country: "United States".to_string(),
            latitude: 38.971669,
            longitude: -95.23525,
        }
    }
}

/// Device wide settings shared with every other skill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default)]
    pub system_unit: UnitSystem,
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default)]
    pub time_format: TimeFormat,
    #[serde(default)]
    pub location: DeviceLocation,
}

fn default_lang() -> String {
    "en-us".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            system_unit: UnitSystem::default(),
            lang: default_lang(),
            time_format: TimeFormat::default(),
            location: DeviceLocation::default(),
        }
    }
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Optional default provider id, e.g. "openweather" or "weatherapi".
    pub default_provider: Option<String>,

    /// Example TOML:
    /// [providers.openweather]
    /// api_key = "..."
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    #[serde(default)]
    pub skill: SkillSettings,

    #[serde(default)]
    pub device: DeviceConfig,
}

impl Config {
    /// Return the default provider as a strongly-typed ProviderId.
    pub fn default_provider_id(&self) -> Result<ProviderId> {
        let s = self.default_provider.as_ref().ok_or_else(|| {
            anyhow::anyhow!(
                "No default provider configured.\n\
                 Hint: run `weather-skill configure <provider>` (e.g. `weather-skill configure openweather`) first."
            )
        })?;

        ProviderId::try_from(s.as_str())
    }

    pub fn provider_config(&self, id: ProviderId) -> Option<&ProviderConfig> {
        self.providers.get(id.as_str())
    }

    /// Store default provider as string.
    pub fn set_default_provider(&mut self, id: ProviderId) {
        self.default_provider = Some(id.as_str().to_string());
    }

    /// Load config from the platform config directory, or defaults on first run.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    /// Load config from `path`, or return an empty default if it doesn't exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the platform config directory.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-skill", "weather-skill")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Set/replace a provider API key; the first configured provider becomes the default.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        let base_url = self
            .providers
            .get(provider_id.as_str())
            .and_then(|existing| existing.base_url.clone());
        self.providers
            .insert(provider_id.as_str().to_string(), ProviderConfig { api_key, base_url });

        if self.default_provider.is_none() {
            self.default_provider = Some(provider_id.to_string());
        }
    }

    /// Returns API key for a provider, if present.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.providers.get(provider_id.as_str()).map(|cfg| cfg.api_key.as_str())
    }

    pub fn is_provider_configured(&self, provider_id: ProviderId) -> bool {
        self.provider_api_key(provider_id).is_some()
    }

    /// Effective configuration for one request.
    pub fn weather_config(
        &self,
        lang: Option<&str>,
        coordinate_override: Option<Coordinate>,
    ) -> WeatherConfig {
        WeatherConfig::resolve(&self.device, &self.skill, lang, coordinate_override)
    }
}

/// Configuration in effect for a single request.
///
/// Computed fresh for every request and passed explicitly; nothing reads
/// device settings after this point.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherConfig {
    pub units: UnitSystem,
    pub lang: String,
    pub coordinate: Coordinate,
    pub home: Geolocation,
    pub time_format: TimeFormat,
}

impl WeatherConfig {
    /// Merge device settings, skill settings and the per-message overrides.
    ///
    /// A coordinate override replaces the stored coordinate; an explicit
    /// skill unit preference replaces the device unit; the request language
    /// replaces the device language.
    pub fn resolve(
        device: &DeviceConfig,
        skill: &SkillSettings,
        lang: Option<&str>,
        coordinate_override: Option<Coordinate>,
    ) -> Self {
        let stored = Coordinate {
            latitude: device.location.latitude,
            longitude: device.location.longitude,
        };

        Self {
            units: skill.units.explicit().unwrap_or(device.system_unit),
            lang: lang.unwrap_or(&device.lang).to_lowercase(),
            coordinate: coordinate_override.unwrap_or(stored),
            home: Geolocation {
                city: device.location.city.clone(),
                region: device.location.region.clone(),
                country: device.location.country.clone(),
            },
            time_format: device.time_format,
        }
    }

    /// Same configuration with a different unit system for this request only.
    pub fn with_units(&self, units: UnitSystem) -> Self {
        Self { units, ..self.clone() }
    }

    pub fn temperature_unit(&self) -> &'static str {
        self.units.temperature_unit()
    }

    pub fn speed_unit(&self) -> &'static str {
        self.units.speed_unit()
    }
}
