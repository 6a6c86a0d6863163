//! Token-set similarity scoring and the threshold policy used for free-text
//! categories (addresses) that have no reliable structure.
//!
//! Scores are on a 0–100 scale. Both scorers compare the sorted set of
//! lower-cased alphanumeric tokens of each side, so word order, punctuation
//! and repeated words do not matter.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use strsim::normalized_levenshtein;

use crate::normalize::tokens;

/// Default cutoff on the 0–100 scale.
pub const DEFAULT_THRESHOLD: f64 = 90.0;

/// Which token-set construction to score with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scorer {
    /// Full-string ratio between the shared-token core and each side.
    /// Stricter: extra tokens on either side lower the score.
    TokenSet,
    /// Sliding-window ratio: a shared core contained in both sides scores 100,
    /// so the same street in differently written cities merges.
    #[default]
    PartialTokenSet,
}

impl Scorer {
    pub fn score(&self, a: &str, b: &str) -> f64 {
        match self {
            Self::TokenSet => token_set_ratio(a, b),
            Self::PartialTokenSet => partial_token_set_ratio(a, b),
        }
    }

    /// Highest-scoring candidate for `text`. Ties keep the earliest candidate.
    pub fn best_match<'a, I>(&self, text: &str, candidates: I) -> Option<(&'a str, f64)>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut best: Option<(&'a str, f64)> = None;
        for candidate in candidates {
            let score = self.score(text, candidate);
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((candidate, score)),
            }
        }
        best
    }
}

/// Threshold policy for fuzzy resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FuzzyPolicy {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default)]
    pub scorer: Scorer,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

impl Default for FuzzyPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            scorer: Scorer::default(),
        }
    }
}

impl FuzzyPolicy {
    pub fn new(threshold: f64, scorer: Scorer) -> Self {
        Self { threshold, scorer }
    }

    /// Strictly greater than the threshold; a score equal to it does not merge.
    #[inline]
    pub fn accepts(&self, score: f64) -> bool {
        score > self.threshold
    }
}

/// Normalized Levenshtein similarity scaled to 0–100. Empty input scores 0.
pub fn ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    100.0 * normalized_levenshtein(a, b)
}

/// Best [`ratio`] of the shorter string against every same-length window of the longer.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let short_len = short.chars().count();
    if short_len == 0 {
        return 0.0;
    }
    let long_chars: Vec<char> = long.chars().collect();
    if long_chars.len() == short_len {
        return ratio(short, long);
    }

    let mut best = 0.0_f64;
    for start in 0..=(long_chars.len() - short_len) {
        let window: String = long_chars[start..start + short_len].iter().collect();
        best = best.max(ratio(short, &window));
        if best >= 100.0 {
            break;
        }
    }
    best
}

pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    token_set_with(a, b, ratio)
}

pub fn partial_token_set_ratio(a: &str, b: &str) -> f64 {
    token_set_with(a, b, partial_ratio)
}

fn token_set_with(a: &str, b: &str, pair: fn(&str, &str) -> f64) -> f64 {
    let ta: BTreeSet<String> = tokens(a).into_iter().collect();
    let tb: BTreeSet<String> = tokens(b).into_iter().collect();
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }

    let join = |set: Vec<&String>| {
        set.into_iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    };
    let sect = join(ta.intersection(&tb).collect());
    let only_a = join(ta.difference(&tb).collect());
    let only_b = join(tb.difference(&ta).collect());

    let combine = |rest: &str| match (sect.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (false, true) => sect.clone(),
        (false, false) => format!("{sect} {rest}"),
    };
    let combined_a = combine(&only_a);
    let combined_b = combine(&only_b);

    let mut best = pair(&combined_a, &combined_b);
    if !sect.is_empty() {
        best = best.max(pair(&sect, &combined_a)).max(pair(&sect, &combined_b));
    }
    best.clamp(0.0, 100.0)
}
