//! Heuristic Czech stemmer.
//!
//! Plain suffix stripping tuned for household-waste vocabulary, not a
//! lexicon: "lahve", "lahvi" and "lahvemi" all reduce toward a shared root
//! so inflected queries can meet their dictionary forms.

/// Inflectional suffixes, tried in order. The first suffix that matches the
/// word ending and leaves a remainder of at least [`MIN_STEM_LEN`] characters
/// wins; the rest of the table is still consulted when the remainder would be
/// too short.
const SUFFIXES: [&str; 32] = [
    "ích", "ími", "ách", "ama", "ami", "ové", "ata", "ete", "ete", "ím", "ou", "ům", "em",
    "es", "ém", "mi", "ho", "ého", "ých", "a", "e", "i", "í", "ě", "y", "ý", "é", "ů", "u",
    "ú", "o", "ó",
];

/// Words at or below this many characters are never stemmed.
const MIN_STEM_LEN: usize = 3;

/// Stem a single word, returning a prefix of the input.
pub fn stem_word(word: &str) -> &str {
    let len = word.chars().count();
    if len <= MIN_STEM_LEN {
        return word;
    }
    for suffix in SUFFIXES {
        if len >= suffix.chars().count() + MIN_STEM_LEN && word.ends_with(suffix) {
            return &word[..word.len() - suffix.len()];
        }
    }
    word
}

/// Stem every whitespace-separated word of a phrase and rejoin with single
/// spaces.
pub fn stem_phrase(text: &str) -> String {
    text.split_whitespace()
        .map(stem_word)
        .collect::<Vec<_>>()
        .join(" ")
}
