//! Name normalization and lexical similarity.
//!
//! Two normalizations are used: [`normalize_name`] (case and whitespace only)
//! decides whether sibling names collide, and [`match_key`] (alphanumeric
//! tokens only) feeds the similarity score. Both are Unicode-aware so Hebrew
//! display names behave like Latin ones.

use std::collections::BTreeSet;

use similar::TextDiff;

/// Lowercase, trim, and collapse internal whitespace.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Alphanumeric tokens of the lowercased name.
pub fn tokens(name: &str) -> Vec<String> {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Tokens joined by single spaces; punctuation and symbols dropped.
pub fn match_key(name: &str) -> String {
    tokens(name).join(" ")
}

/// Similarity of two names in [0, 1].
///
/// The best of a character-level diff ratio, the token Dice coefficient, and
/// a containment score when every token of one name appears in the other.
/// Identical match keys score exactly 1.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let key_a = match_key(a);
    let key_b = match_key(b);
    if key_a.is_empty() || key_b.is_empty() {
        return 0.0;
    }
    if key_a == key_b {
        return 1.0;
    }

    let char_ratio = f64::from(TextDiff::from_chars(key_a.as_str(), key_b.as_str()).ratio());

    let set_a: BTreeSet<&str> = key_a.split(' ').collect();
    let set_b: BTreeSet<&str> = key_b.split(' ').collect();
    let shared = set_a.intersection(&set_b).count();
    let dice = (2 * shared) as f64 / (set_a.len() + set_b.len()) as f64;

    let containment = if set_a.is_subset(&set_b) || set_b.is_subset(&set_a) {
        CONTAINMENT_SCORE
    } else {
        0.0
    };

    char_ratio.max(dice).max(containment).clamp(0.0, 1.0)
}

/// Score when one name's tokens are all contained in the other's.
const CONTAINMENT_SCORE: f64 = 0.8;

/// Best similarity between `name` and any of `candidates`.
pub fn best_similarity<'a>(name: &str, candidates: impl IntoIterator<Item = &'a str>) -> f64 {
    candidates
        .into_iter()
        .map(|candidate| similarity(name, candidate))
        .fold(0.0, f64::max)
}
