//! Text helpers.

/// Trims and splits a string on whitespace.
///
/// Used wherever an API accepts several space-separated event type names in
/// one string. An empty or all-whitespace input yields an empty vec.
pub fn split_words(s: &str) -> Vec<&str> {
    s.split_whitespace().collect()
}
