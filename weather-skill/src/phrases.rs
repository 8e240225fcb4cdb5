//! Locale phrase tables that turn dialog names into sentences.

use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};

use crate::dialog::Dialog;

const EN_US: &str = include_str!("../phrases/en-us.toml");
const FALLBACK_LANG: &str = "en-us";

/// Dialog name to template, e.g. `"current-humidity-local" = "Humidity is {percent}."`.
#[derive(Debug, Clone)]
pub struct PhraseTable {
    lang: String,
    phrases: HashMap<String, String>,
}

impl PhraseTable {
    /// Parse a TOML phrase table.
    pub fn from_toml(lang: &str, contents: &str) -> Result<Self> {
        let phrases: HashMap<String, String> = toml::from_str(contents)
            .with_context(|| format!("Failed to parse phrase table for '{lang}'"))?;
        Ok(Self { lang: lang.to_lowercase(), phrases })
    }

    /// Built-in table for `lang`; unknown languages get English.
    pub fn for_lang(lang: &str) -> Self {
        let lang = lang.to_lowercase();
        if lang != FALLBACK_LANG && !lang.starts_with("en") {
            tracing::warn!(%lang, "no phrase table for language, falling back to {FALLBACK_LANG}");
        }

        match Self::from_toml(FALLBACK_LANG, EN_US) {
            Ok(table) => table,
            Err(err) => {
                tracing::error!("built-in phrase table is invalid: {err:#}");
                Self { lang: FALLBACK_LANG.to_string(), phrases: HashMap::new() }
            }
        }
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    pub fn template(&self, name: &str) -> Option<&str> {
        self.phrases.get(name).map(String::as_str)
    }

    /// Render `name` with `data`; placeholders without data render empty.
    ///
    /// A missing template renders as the dialog name so nothing is silently
    /// dropped.
    pub fn translate(&self, name: &str, data: &BTreeMap<String, String>) -> String {
        match self.template(name) {
            Some(template) => fill(template, data),
            None => {
                tracing::warn!(name, lang = %self.lang, "no phrase for dialog");
                name.to_string()
            }
        }
    }

    pub fn render(&self, dialog: &Dialog) -> String {
        self.translate(&dialog.name, &dialog.data)
    }

    /// Look up a single word or short phrase without placeholders.
    pub fn word(&self, name: &str) -> String {
        self.translate(name, &BTreeMap::new())
    }
}

fn fill(template: &str, data: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                if let Some(value) = data.get(&after[..end]) {
                    out.push_str(value);
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn fills_placeholders() {
        let rendered = fill("It is {temperature} degrees {temperature_unit}.", &data(&[
            ("temperature", "72"),
            ("temperature_unit", "fahrenheit"),
        ]));
        assert_eq!(rendered, "It is 72 degrees fahrenheit.");
    }

    #[test]
    fn missing_values_render_empty_and_stray_braces_survive() {
        assert_eq!(fill("a {missing}b", &data(&[])), "a b");
        assert_eq!(fill("open { brace", &data(&[])), "open { brace");
    }

    #[test]
    fn built_in_table_has_fallback_phrases() {
        let table = PhraseTable::for_lang("en-us");
        for name in [
            "cant-get-forecast",
            "location-not-found",
            "forty-eight-hours-available",
            "seven-days-available",
            "days-available",
        ] {
            assert!(table.template(name).is_some(), "missing {name}");
        }
        assert_eq!(table.translate("percentage-number", &data(&[("number", "45")])), "45 percent");
    }

    #[test]
    fn unknown_language_falls_back_to_english() {
        let table = PhraseTable::for_lang("xx-yy");
        assert_eq!(table.lang(), "en-us");
        assert_eq!(table.word("tomorrow"), "tomorrow");
    }

    #[test]
    fn unknown_dialog_renders_its_name() {
        let table = PhraseTable::for_lang("en-us");
        assert_eq!(table.word("no-such-dialog"), "no-such-dialog");
    }

    #[test]
    fn custom_tables_parse_from_toml() {
        let table = PhraseTable::from_toml("de-de", r#""tomorrow" = "morgen""#).unwrap();
        assert_eq!(table.word("tomorrow"), "morgen");
        assert!(PhraseTable::from_toml("de-de", "not = [valid").is_err());
    }
}
