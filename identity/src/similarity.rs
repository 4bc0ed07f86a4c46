//! Token-set and field-equality signals between two profiles.

use std::collections::HashSet;

/// Lower-cased, whitespace-separated tokens of `text` with empties dropped.
pub fn tokenize(text: &str) -> HashSet<String> {
    text.split_whitespace().map(|t| t.to_lowercase()).collect()
}

/// Jaccard similarity over the token sets of `a` and `b`.
///
/// Returns a value in `[0, 1]`. Returns 0 when either side has no tokens.
/// Symmetric: `token_similarity(a, b) == token_similarity(b, a)`.
pub fn token_similarity(a: &str, b: &str) -> f64 {
    let ta = tokenize(a);
    let tb = tokenize(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let intersection = ta.intersection(&tb).count();
    let union = ta.len() + tb.len() - intersection;
    intersection as f64 / union as f64
}

/// [`token_similarity`] over optional text; a missing side scores 0.
pub fn optional_token_similarity(a: Option<&str>, b: Option<&str>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => token_similarity(a, b),
        _ => 0.0,
    }
}

/// Exact equality of trimmed fields. Case-sensitive.
///
/// Absent or blank fields never compare equal, not even to each other.
pub fn field_equals(a: Option<&str>, b: Option<&str>) -> bool {
    match (a.map(str::trim), b.map(str::trim)) {
        (Some(a), Some(b)) => !a.is_empty() && a == b,
        _ => false,
    }
}
