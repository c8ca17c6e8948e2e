//! Two-way language tag from diacritic frequency.
//!
//! Not a language detector: it only separates French-looking text from
//! everything else, which is all the downstream consumers need.

use crate::output::Language;

/// Lowercase diacritics counted as French evidence.
pub const FRENCH_DIACRITICS: [char; 16] = [
    'à', 'â', 'ç', 'é', 'è', 'ê', 'ë', 'î', 'ï', 'ô', 'ù', 'û', 'ü', 'ÿ', 'æ', 'œ',
];

/// Diacritic ratio above which text is tagged French.
pub const FRENCH_RATIO_THRESHOLD: f64 = 0.02;

/// Share of diacritic characters in `text`, counted after lowercasing.
///
/// The denominator is the character count of the original text; empty text
/// has ratio 0.
pub fn diacritic_ratio(text: &str) -> f64 {
    let total = text.chars().count();
    if total == 0 {
        return 0.0;
    }
    let hits = text
        .to_lowercase()
        .chars()
        .filter(|c| FRENCH_DIACRITICS.contains(c))
        .count();
    hits as f64 / total as f64
}

/// `Fr` when more than 2% of characters are French diacritics, else `En`.
pub fn detect_language(text: &str) -> Language {
    if diacritic_ratio(text) > FRENCH_RATIO_THRESHOLD {
        Language::Fr
    } else {
        Language::En
    }
}
