//! Text helpers shared by the extractor and the normalizer.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// True if any character falls outside the 7-bit ASCII range.
///
/// Used only to pick which of two candidate names is in the source site's
/// native script. It is a heuristic, not script detection.
pub fn contains_non_ascii(text: &str) -> bool {
    text.chars().any(|c| !c.is_ascii())
}

/// Strip combining diacritics and any remaining non-ASCII code points.
///
/// Decomposes to NFD so base letters separate from their tone/accent marks,
/// drops the marks, drops whatever non-ASCII survives, and collapses the
/// leftover whitespace.
pub fn strip_diacritics(input: &str) -> String {
    let ascii: String = input
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(char::is_ascii)
        .collect();
    ascii.split_whitespace().collect::<Vec<_>>().join(" ")
}
