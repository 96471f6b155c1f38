//! Text canonicalization shared by candidate ranking and filename generation

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Lower-case `text` and strip its diacritics.
///
/// The text is decomposed (NFD), combining marks are dropped, and the remainder is
/// recomposed (NFC). Applying it twice gives the same result as applying it once.
///
/// ```
/// use trackdl::normalize::normalize;
///
/// assert_eq!(normalize("Café"), "cafe");
/// assert_eq!(normalize("Beyoncé"), normalize("BEYONCE"));
/// ```
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .nfc()
        .collect()
}

/// Remove hyphens and spaces.
///
/// Only used for the artist containment pre-check; some artists are hyphenated on one
/// provider and not on the other. Never used for scored similarity.
pub fn collapse_separators(text: &str) -> String {
    text.chars().filter(|c| !matches!(c, '-' | ' ')).collect()
}

/// Levenshtein similarity ratio: 1.0 for identical strings, 0.0 for fully disjoint ones.
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}
