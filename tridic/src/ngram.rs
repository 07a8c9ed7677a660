//! Character n-gram Jaccard similarity for partial-word matching.

use std::collections::HashSet;

use crate::normalize::normalize;

/// Collect the set of character n-grams of the normalized text. The bigram
/// call additionally folds all trigrams into the same set; downstream score
/// thresholds are tuned against that combined set. Spaces count as
/// characters.
pub fn ngrams(text: &str, n: usize) -> HashSet<String> {
    let normalized = normalize(text);
    let chars: Vec<char> = normalized.chars().collect();
    let mut grams = HashSet::new();
    collect_windows(&chars, n, &mut grams);
    if n == 2 && chars.len() >= 3 {
        collect_windows(&chars, 3, &mut grams);
    }
    grams
}

fn collect_windows(chars: &[char], n: usize, grams: &mut HashSet<String>) {
    if n == 0 || chars.len() < n {
        return;
    }
    for window in chars.windows(n) {
        grams.insert(window.iter().collect());
    }
}

/// Jaccard similarity of the two n-gram sets, in [0, 1]. Returns 0 when
/// either set comes out empty.
pub fn ngram_similarity(a: &str, b: &str, n: usize) -> f64 {
    let grams_a = ngrams(a, n);
    let grams_b = ngrams(b, n);
    if grams_a.is_empty() || grams_b.is_empty() {
        return 0.0;
    }
    let intersection = grams_a.intersection(&grams_b).count();
    let union = grams_a.len() + grams_b.len() - intersection;
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gram_set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    // ── ngrams tests ─────────────────────────────────────────────

    #[test]
    fn test_bigrams_of_short_input() {
        // Two chars: a single bigram, too short for the trigram fold.
        assert_eq!(ngrams("ab", 2), gram_set(&["ab"]));
    }

    #[test]
    fn test_bigram_call_folds_trigrams() {
        assert_eq!(ngrams("abc", 2), gram_set(&["ab", "bc", "abc"]));
    }

    #[test]
    fn test_explicit_trigrams_only() {
        assert_eq!(ngrams("abcd", 3), gram_set(&["abc", "bcd"]));
    }

    #[test]
    fn test_ngrams_include_spaces_and_fold_diacritics() {
        let grams = ngrams("Pet láhev", 2);
        assert!(grams.contains("t "));
        assert!(grams.contains(" l"));
        assert!(grams.contains("ahe"));
        assert!(!grams.contains("áh"));
    }

    #[test]
    fn test_ngrams_input_shorter_than_n() {
        assert!(ngrams("a", 2).is_empty());
        assert!(ngrams("", 2).is_empty());
    }

    // ── ngram_similarity tests ───────────────────────────────────

    #[test]
    fn test_similarity_identical() {
        assert_eq!(ngram_similarity("plechovka", "plechovka", 2), 1.0);
        assert_eq!(ngram_similarity("láhev", "lahev", 2), 1.0);
    }

    #[test]
    fn test_similarity_disjoint() {
        assert_eq!(ngram_similarity("abc", "xyz", 2), 0.0);
    }

    #[test]
    fn test_similarity_empty_input() {
        assert_eq!(ngram_similarity("", "abc", 2), 0.0);
        assert_eq!(ngram_similarity("abc", "", 2), 0.0);
    }

    #[test]
    fn test_similarity_substring_value() {
        // "lahev" contributes 7 grams, all shared with "pet lahev" (15
        // grams): 7 / (7 + 15 - 7).
        let sim = ngram_similarity("lahev", "pet lahev", 2);
        assert!((sim - 7.0 / 15.0).abs() < 1e-9);
    }
}
