//! Name ordering for listings and tie sets.
//!
//! Names are compared on their NFD form with combining marks removed and
//! case folded, so `Érica` sorts between `Bruno` and `Fábio`.

use std::cmp::Ordering;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Accent- and case-insensitive comparison key.
pub fn fold(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Alphabetical order on the folded key, then on the raw text so the order is
/// total.
pub fn alpha(a: &str, b: &str) -> Ordering {
    fold(a)
        .cmp(&fold(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| a.cmp(b))
}
