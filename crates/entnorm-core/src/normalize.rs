//! Structural normalizer for identifier-like tokens (serial numbers, part codes).

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// Character placed where a run of formatting noise used to be.
pub const SEPARATOR: char = '-';
const SEPARATOR_STR: &str = "-";

// Combining marks are content: some capitals only exist as base letter plus mark.
static NOISE_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^\p{Alphabetic}\p{N}\p{M}]+").expect("noise pattern is a valid regex")
});

/// Maps a raw structured token to its canonical key.
///
/// The token is upper-cased and composed to NFC. Every maximal run of
/// characters that is not a letter, digit or combining mark becomes a single
/// [`SEPARATOR`], and separators at either end are dropped. Tokens that differ
/// only in punctuation, spacing or case share a key; tokens whose
/// alphanumeric content differs never do.
///
/// ```
/// use entnorm_core::normalize;
/// assert_eq!(normalize("XYZ 13423 / ILD"), "XYZ-13423-ILD");
/// assert_eq!(normalize("xyz--13423-ild"), "XYZ-13423-ILD");
/// ```
pub fn normalize(token: &str) -> String {
    let upper: String = token.to_uppercase().nfc().collect();
    let collapsed = NOISE_RUN.replace_all(&upper, SEPARATOR_STR);
    collapsed.trim_matches(SEPARATOR).to_string()
}

/// Lower-cased alphanumeric words of `text`, in order of appearance.
///
/// Used by the fuzzy scorers.
pub fn tokens(text: &str) -> Vec<String> {
    NOISE_RUN
        .split(&text.to_lowercase())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Lower-cases and collapses whitespace, keeping punctuation.
pub fn fold(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
