//! Room settings and the clamping rules applied to client input.
//!
//! Clients send a [`SettingsRequest`] with any subset of fields. The server
//! never trusts it as-is: [`Settings::from_request`] fills gaps with
//! defaults and clamps every number into its allowed range. The result is
//! fixed for the life of the room.

use std::collections::HashSet;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Chat messages are cut to this many characters.
pub const MAX_CHAT_LEN: usize = 200;

/// Display names are cut to this many characters.
pub const MAX_NAME_LEN: usize = 24;

/// At most this many custom words are kept.
pub const MAX_CUSTOM_WORDS: usize = 100;

const MAX_POINTS_RANGE: RangeInclusive<u32> = 50..=1000;
const ROUND_TIME_RANGE: RangeInclusive<u32> = 15..=300;
const WORDS_PER_ROUND_RANGE: RangeInclusive<usize> = 1..=5;
const MAX_PLAYERS_RANGE: RangeInclusive<usize> = 2..=20;
const MAX_LETTERS_REVEALED_RANGE: RangeInclusive<usize> = 0..=10;
const MAX_WORD_LENGTH_RANGE: RangeInclusive<usize> = 3..=30;
const TOTAL_ROUNDS_RANGE: RangeInclusive<u32> = 1..=10;

/// Validated settings for one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Points for the first correct guess of a turn.
    pub max_points: u32,
    /// Length of one drawer's turn.
    pub round_time_sec: u32,
    /// How many words the drawer chooses from.
    pub words_per_round: usize,
    pub max_players: usize,
    /// Cap on letters auto-revealed per turn.
    pub max_letters_revealed: usize,
    /// Longest word offered or accepted, in characters.
    pub max_word_length: usize,
    pub total_rounds: u32,
    /// Already trimmed, lower-cased, deduplicated and length-filtered.
    pub custom_words: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_points: 300,
            round_time_sec: 90,
            words_per_round: 3,
            max_players: 12,
            max_letters_revealed: 4,
            max_word_length: 10,
            total_rounds: 3,
            custom_words: Vec::new(),
        }
    }
}

/// Settings as a client proposes them. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsRequest {
    pub max_points: Option<u32>,
    pub round_time_sec: Option<u32>,
    pub words_per_round: Option<usize>,
    pub max_players: Option<usize>,
    pub max_letters_revealed: Option<usize>,
    pub max_word_length: Option<usize>,
    pub total_rounds: Option<u32>,
    pub custom_words: Option<Vec<String>>,
}

fn clamp<T: PartialOrd + Copy>(value: Option<T>, default: T, range: &RangeInclusive<T>) -> T {
    let value = value.unwrap_or(default);
    if value < *range.start() {
        *range.start()
    } else if value > *range.end() {
        *range.end()
    } else {
        value
    }
}

impl Settings {
    /// Builds settings from a client request, defaulting missing fields and
    /// clamping the rest.
    pub fn from_request(request: SettingsRequest) -> Self {
        let defaults = Self::default();
        let max_word_length = clamp(
            request.max_word_length,
            defaults.max_word_length,
            &MAX_WORD_LENGTH_RANGE,
        );
        Self {
            max_points: clamp(request.max_points, defaults.max_points, &MAX_POINTS_RANGE),
            round_time_sec: clamp(
                request.round_time_sec,
                defaults.round_time_sec,
                &ROUND_TIME_RANGE,
            ),
            words_per_round: clamp(
                request.words_per_round,
                defaults.words_per_round,
                &WORDS_PER_ROUND_RANGE,
            ),
            max_players: clamp(request.max_players, defaults.max_players, &MAX_PLAYERS_RANGE),
            max_letters_revealed: clamp(
                request.max_letters_revealed,
                defaults.max_letters_revealed,
                &MAX_LETTERS_REVEALED_RANGE,
            ),
            max_word_length,
            total_rounds: clamp(request.total_rounds, defaults.total_rounds, &TOTAL_ROUNDS_RANGE),
            custom_words: normalize_custom_words(
                request.custom_words.unwrap_or_default(),
                max_word_length,
            ),
        }
    }
}

/// Trims, lower-cases, drops empty or over-long entries, deduplicates and
/// caps the list at [`MAX_CUSTOM_WORDS`].
fn normalize_custom_words(words: Vec<String>, max_word_length: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    words
        .into_iter()
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty() && w.chars().count() <= max_word_length)
        .filter(|w| seen.insert(w.clone()))
        .take(MAX_CUSTOM_WORDS)
        .collect()
}

/// Cuts `text` to at most `max` characters (not bytes).
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Normalizes a display name: trimmed, cut to [`MAX_NAME_LEN`], and
/// replaced by `fallback` when empty.
pub fn normalize_name(name: Option<&str>, fallback: &str) -> String {
    let trimmed = name.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        truncate_chars(trimmed, MAX_NAME_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_request_yields_defaults() {
        assert_eq!(Settings::from_request(SettingsRequest::default()), Settings::default());
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let settings = Settings::from_request(SettingsRequest {
            max_points: Some(1_000_000),
            round_time_sec: Some(1),
            words_per_round: Some(0),
            max_players: Some(1),
            max_letters_revealed: Some(99),
            max_word_length: Some(500),
            total_rounds: Some(0),
            custom_words: None,
        });

        assert_eq!(settings.max_points, 1000);
        assert_eq!(settings.round_time_sec, 15);
        assert_eq!(settings.words_per_round, 1);
        assert_eq!(settings.max_players, 2);
        assert_eq!(settings.max_letters_revealed, 10);
        assert_eq!(settings.max_word_length, 30);
        assert_eq!(settings.total_rounds, 1);
    }

    #[test]
    fn test_custom_words_are_normalized() {
        let settings = Settings::from_request(SettingsRequest {
            max_word_length: Some(6),
            custom_words: Some(vec![
                "  Banjo ".into(),
                "banjo".into(),
                "".into(),
                "   ".into(),
                "accordion".into(),
                "Ice Cream".into(),
            ]),
            ..SettingsRequest::default()
        });

        assert_eq!(settings.custom_words, vec!["banjo".to_string()]);
    }

    #[test]
    fn test_custom_words_capped() {
        let words = (0..150).map(|i| format!("w{i}")).collect();
        let settings = Settings::from_request(SettingsRequest {
            custom_words: Some(words),
            ..SettingsRequest::default()
        });
        assert_eq!(settings.custom_words.len(), MAX_CUSTOM_WORDS);
    }

    #[test]
    fn test_settings_request_accepts_partial_camel_case_json() {
        let request: SettingsRequest =
            serde_json::from_str(r#"{"maxPlayers": 2, "roundTimeSec": 60}"#).unwrap();
        assert_eq!(request.max_players, Some(2));
        assert_eq!(request.round_time_sec, Some(60));
        assert_eq!(request.total_rounds, None);
    }

    #[test]
    fn test_truncate_chars_counts_characters() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name(None, "Player"), "Player");
        assert_eq!(normalize_name(Some("   "), "Host"), "Host");
        assert_eq!(normalize_name(Some("  Ada "), "Player"), "Ada");
        let long = "x".repeat(40);
        assert_eq!(normalize_name(Some(&long), "Player").len(), MAX_NAME_LEN);
    }
}
