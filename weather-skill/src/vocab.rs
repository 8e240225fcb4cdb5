//! Vocabulary matching for utterances and slot values.
//!
//! Only English word lists ship with the skill. Phrases are matched on whole
//! words, case-insensitively.

/// A named list of words or phrases that mean the same thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vocab {
    RelativeTime,
    Later,
    RelativeDay,
    Today,
    Fahrenheit,
    Celsius,
    Couple,
    Few,
    Hot,
    Cold,
    Rain,
    Snow,
    Clear,
    Clouds,
    Fog,
    Thunderstorm,
}

impl Vocab {
    /// Phrases of this vocabulary, longest first so the most specific wins.
    pub fn phrases(&self) -> &'static [&'static str] {
        match self {
            Vocab::RelativeTime => &[
                "this morning",
                "this afternoon",
                "this evening",
                "overnight",
                "morning",
                "afternoon",
                "evening",
                "tonight",
                "night",
            ],
            Vocab::Later => &["next few hours", "later today", "later on", "later"],
            Vocab::RelativeDay => &[
                "day after tomorrow",
                "tomorrow",
                "today",
                "monday",
                "tuesday",
                "wednesday",
                "thursday",
                "friday",
                "saturday",
                "sunday",
            ],
            Vocab::Today => &["today"],
            Vocab::Fahrenheit => &["fahrenheit", "imperial"],
            Vocab::Celsius => &["celsius", "centigrade", "metric"],
            Vocab::Couple => &["couple"],
            Vocab::Few => &["few"],
            Vocab::Hot => &["hot", "warm", "heat"],
            Vocab::Cold => &["cold", "chilly", "cool", "freezing"],
            Vocab::Rain => {
                &["raining", "rainy", "rain", "drizzle", "showers", "shower", "umbrella"]
            }
            Vocab::Snow => &["snowing", "snow", "sleet", "flurries"],
            Vocab::Clear => &["clear", "sunny"],
            Vocab::Clouds => &["overcast", "cloudy", "clouds", "cloud"],
            Vocab::Fog => &["foggy", "fog", "misty", "mist", "haze"],
            Vocab::Thunderstorm => &["thunderstorm", "thunder", "lightning", "stormy", "storm"],
        }
    }
}

/// Lowercased words of `text`, punctuation stripped.
pub fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn contains_phrase(haystack: &[String], phrase: &str) -> bool {
    let needle: Vec<&str> = phrase.split_whitespace().collect();
    if needle.is_empty() || needle.len() > haystack.len() {
        return false;
    }
    haystack
        .windows(needle.len())
        .any(|window| window.iter().zip(&needle).all(|(w, n)| w == n))
}

/// First phrase of `vocab` found in `text`.
pub fn first_match(text: &str, vocab: Vocab) -> Option<&'static str> {
    let haystack = words(text);
    vocab.phrases().iter().copied().find(|phrase| contains_phrase(&haystack, phrase))
}

pub fn voc_match(text: &str, vocab: Vocab) -> bool {
    first_match(text, vocab).is_some()
}

const NUMBER_WORDS: [&str; 21] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen",
    "nineteen", "twenty",
];

/// Parse a single word as a number, digits or English number words.
pub fn parse_number(word: &str) -> Option<i64> {
    if let Ok(n) = word.parse::<i64>() {
        return Some(n);
    }
    match word {
        "a" | "an" => Some(1),
        _ => NUMBER_WORDS.iter().position(|w| *w == word).map(|n| n as i64),
    }
}

/// First number mentioned in `text`, ignoring the articles "a"/"an".
pub fn extract_number(text: &str) -> Option<i64> {
    words(text)
        .iter()
        .filter(|w| !matches!(w.as_str(), "a" | "an"))
        .find_map(|w| parse_number(w))
}

/// Hours in a phrase like "in 5 hours" or "in an hour".
pub fn extract_hours_from_now(text: &str) -> Option<i64> {
    let haystack = words(text);
    haystack.windows(3).find_map(|w| {
        if w[0] == "in" && (w[2] == "hour" || w[2] == "hours") {
            parse_number(&w[1])
        } else {
            None
        }
    })
}
