//! Phonetic coding for typo-tolerant matching.
//!
//! A soundex-style scheme for Czech: acoustically confusable consonant
//! groups (b/p, d/t, k/g, f/v, ...) fold onto shared digits, vowels collapse
//! into a sentinel, and the result is a fixed six-character code. Words that
//! sound alike ("kelimek", "kelymek") code identically.

use crate::normalize::normalize;

/// Consonant classes folded onto a shared digit, tried in order; the first
/// class containing the character wins. Characters outside every class pass
/// through untouched. Vowels become a sentinel that never enters the code
/// body but still separates digit runs.
const PHONETIC_CLASSES: [(&str, char); 11] = [
    ("bp", '1'),
    ("dt", '2'),
    ("kg", '3'),
    ("fv", '4'),
    ("sz", '5'),
    ("cč", '6'),
    ("šs", '7'),
    ("žz", '8'),
    ("lr", '9'),
    ("mn", '0'),
    ("aeiouy", 'A'),
];

/// Phonetic codes are exactly this long, '0'-padded.
const CODE_LEN: usize = 6;

fn transform_char(c: char) -> char {
    for (class, code) in PHONETIC_CLASSES {
        if class.contains(c) {
            return code;
        }
    }
    c
}

/// Compute the six-character phonetic code of a word.
///
/// The code is the first transformed character followed by up to five
/// digits, each required to differ from the previously appended digit.
/// Vowel sentinels and unmapped characters are passed over without resetting
/// that check. Empty input yields an empty code.
pub fn phonetic_code(text: &str) -> String {
    let transformed: Vec<char> = normalize(text).chars().map(transform_char).collect();
    let (first, rest) = match transformed.split_first() {
        Some((first, rest)) => (*first, rest),
        None => return String::new(),
    };

    let mut code = vec![first];
    let mut prev: Option<char> = None;
    for &c in rest {
        if code.len() >= CODE_LEN {
            break;
        }
        if c.is_ascii_digit() && Some(c) != prev {
            code.push(c);
            prev = Some(c);
        }
    }
    while code.len() < CODE_LEN {
        code.push('0');
    }
    code.into_iter().collect()
}

/// Whether two strings are phonetically confusable: identical codes, or
/// codes differing in at most one aligned position. Anything that codes to
/// empty never sounds like anything.
pub fn sounds_like(a: &str, b: &str) -> bool {
    let code_a = phonetic_code(a);
    let code_b = phonetic_code(b);
    if code_a.is_empty() || code_b.is_empty() {
        return false;
    }
    if code_a == code_b {
        return true;
    }
    let differences = code_a
        .chars()
        .zip(code_b.chars())
        .filter(|(x, y)| x != y)
        .count();
    differences <= 1
}
