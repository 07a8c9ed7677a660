//! Text normalization for queries and candidate names.
//!
//! All matching happens on normalized text: lowercased, trimmed, diacritics
//! stripped. Czech users routinely type "lahev" for "láhev" or "kelimek" for
//! "kelímek", so accents must never decide a match.

use unicode_normalization::UnicodeNormalization;

/// Lowercase, trim, and strip combining diacritical marks.
///
/// Decomposes to NFD and drops the U+0300..=U+036F combining range, so
/// "Láhev" and "lahev" come out identical. Idempotent; internal whitespace
/// is preserved as-is.
pub fn normalize(input: &str) -> String {
    input
        .to_lowercase()
        .trim()
        .nfd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .collect()
}
