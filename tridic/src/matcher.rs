//! The local match cascade.
//!
//! Scores every (query variant, candidate) pair with a fixed-priority rule
//! ladder: exact, stemmed-exact, prefix, phonetic, n-gram, stemmed prefix,
//! containment both ways (raw and stemmed), then a Levenshtein fallback.
//! Lower scores are better; the first rule that applies decides the pair.
//! Every score carries the variant's penalty and the candidate's popularity
//! boost, and only a best score strictly under the threshold is a match.

use std::collections::HashMap;

use tracing::debug;

use crate::ngram::ngram_similarity;
use crate::normalize::normalize;
use crate::phonetic::sounds_like;
use crate::stem::stem_phrase;
use crate::synonyms::{expand_query, QueryVariant};

/// Score gate below which the best candidate is accepted.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 3.0;
/// Relaxed gate used when collecting ranked suggestions.
pub const SUGGESTION_THRESHOLD: f64 = 5.0;
/// Variants shorter than this many characters are never scored.
const MIN_VARIANT_LEN: usize = 2;
/// Minimum length for a single-word variant before phonetic codes count.
const PHONETIC_MIN_LEN: usize = 6;
/// Share of the candidate a multi-word prefix must cover.
const PREFIX_COVERAGE: f64 = 0.9;
/// Floor on the Levenshtein similarity ratio.
const MIN_LEVENSHTEIN_RATIO: f64 = 0.5;
/// Popularity can improve a score by at most this much.
const MAX_POPULARITY_BOOST: f64 = 0.5;

/// Anything the matcher can score. Knowledge-base records match on their
/// name; cache entries match on the query that produced them.
pub trait MatchCandidate {
    fn match_key(&self) -> &str;
}

impl<T: MatchCandidate + ?Sized> MatchCandidate for &T {
    fn match_key(&self) -> &str {
        (**self).match_key()
    }
}

/// Popularity-derived ranking boosts keyed by normalized name. Boosts are
/// zero or negative: names users keep asking about rank better.
#[derive(Debug, Clone, Default)]
pub struct PopularityBoosts {
    by_name: HashMap<String, f64>,
}

impl PopularityBoosts {
    /// Build from (query, count) pairs ordered most-frequent-first. When
    /// several queries normalize to the same text the first one wins.
    pub fn from_popular_queries<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, usize)>,
    {
        let mut by_name = HashMap::new();
        for (query, count) in pairs {
            let boost = -(count as f64 / 10.0).min(MAX_POPULARITY_BOOST);
            by_name.entry(normalize(query)).or_insert(boost);
        }
        Self { by_name }
    }

    /// Boost for a candidate name; zero when the name is not popular.
    pub fn boost_for(&self, name: &str) -> f64 {
        self.by_name.get(&normalize(name)).copied().unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// A candidate index paired with its best score, as produced by
/// [`rank_matches`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedMatch {
    pub index: usize,
    pub score: f64,
}

struct VariantText {
    text: String,
    chars: usize,
    words: usize,
    stemmed: String,
    stemmed_chars: usize,
    penalty: f64,
}

struct CandidateText {
    name: String,
    name_chars: usize,
    stemmed: String,
    stemmed_chars: usize,
    boost: f64,
}

fn prepare_variants(query: &str) -> Vec<VariantText> {
    expand_query(query)
        .into_iter()
        .filter(|v| v.text.chars().count() >= MIN_VARIANT_LEN)
        .map(|QueryVariant { text, penalty }| {
            let stemmed = stem_phrase(&text);
            VariantText {
                chars: text.chars().count(),
                words: text.split_whitespace().count(),
                stemmed_chars: stemmed.chars().count(),
                stemmed,
                text,
                penalty,
            }
        })
        .collect()
}

/// Candidates paired with their original index. Entries whose normalized
/// key is empty are dropped here and never scored.
fn prepare_candidates<C: MatchCandidate>(
    candidates: &[C],
    boosts: &PopularityBoosts,
) -> Vec<(usize, CandidateText)> {
    candidates
        .iter()
        .enumerate()
        .filter_map(|(index, candidate)| {
            let name = normalize(candidate.match_key());
            if name.is_empty() {
                return None;
            }
            let stemmed = stem_phrase(&name);
            Some((
                index,
                CandidateText {
                    name_chars: name.chars().count(),
                    stemmed_chars: stemmed.chars().count(),
                    boost: boosts.boost_for(candidate.match_key()),
                    name,
                    stemmed,
                },
            ))
        })
        .collect()
}

/// Multi-word prefix guard: the prefix must cover at least 90% of the full
/// string, or its last word and the full string's word at that position
/// must extend one another. Single-word prefixes always pass.
fn prefix_guard(prefix: &str, prefix_chars: usize, full: &str, full_chars: usize) -> bool {
    let prefix_words: Vec<&str> = prefix.split_whitespace().collect();
    if prefix_words.len() <= 1 {
        return true;
    }
    if prefix_chars as f64 / full_chars as f64 >= PREFIX_COVERAGE {
        return true;
    }
    let last = prefix_words[prefix_words.len() - 1];
    let full_words: Vec<&str> = full.split_whitespace().collect();
    let aligned = full_words.get(prefix_words.len() - 1).copied().unwrap_or("");
    aligned.starts_with(last) || last.starts_with(aligned)
}

/// Acceptance threshold for n-gram similarity by variant word count.
fn ngram_threshold(words: usize) -> f64 {
    match words {
        0 | 1 => 0.4,
        2 => 0.7,
        _ => 0.8,
    }
}

/// First applicable rule's base score for one (variant, candidate) pair.
/// Penalty and boost are added by the caller.
fn rule_score(variant: &VariantText, candidate: &CandidateText, threshold: f64) -> Option<f64> {
    let q = variant.text.as_str();
    let name = candidate.name.as_str();

    // 1. Exact.
    if name == q {
        return Some(0.0);
    }
    // 2. Exact after stemming.
    if candidate.stemmed == variant.stemmed {
        return Some(0.05);
    }
    // 3. Prefix. Multi-word variants are held to the guard; a rejected
    //    guard falls through to the later rules.
    if name.starts_with(q) && prefix_guard(q, variant.chars, name, candidate.name_chars) {
        return Some(0.1 + (candidate.name_chars - variant.chars) as f64 / 100.0);
    }
    // 4. Phonetic, for single sufficiently long words only.
    if variant.words == 1 && variant.chars >= PHONETIC_MIN_LEN && sounds_like(q, name) {
        return Some(0.2);
    }
    // 5. N-gram similarity over the adaptive threshold.
    let similarity = ngram_similarity(q, name, 2);
    if similarity > ngram_threshold(variant.words) {
        return Some(0.3 + (1.0 - similarity) / 2.0);
    }
    // 6. Prefix after stemming, with the same guard.
    if candidate.stemmed.starts_with(&variant.stemmed)
        && prefix_guard(
            &variant.stemmed,
            variant.stemmed_chars,
            &candidate.stemmed,
            candidate.stemmed_chars,
        )
    {
        return Some(0.4 + (candidate.stemmed_chars - variant.stemmed_chars) as f64 / 100.0);
    }
    // 7. Candidate contains the variant.
    if name.contains(q) {
        return Some(0.5 + (candidate.name_chars - variant.chars) as f64 / 100.0);
    }
    // 8. Same, stemmed.
    if candidate.stemmed.contains(&variant.stemmed) {
        return Some(0.6 + (candidate.stemmed_chars - variant.stemmed_chars) as f64 / 100.0);
    }
    // 9. Variant contains the candidate.
    if q.contains(name) {
        return Some(0.7 + (variant.chars - candidate.name_chars) as f64 / 100.0);
    }
    // 10. Same, stemmed.
    if variant.stemmed.contains(&candidate.stemmed) {
        return Some(0.8 + (variant.stemmed_chars - candidate.stemmed_chars) as f64 / 100.0);
    }
    // 11. Levenshtein fallback, raw then stemmed.
    levenshtein_score(variant, candidate, threshold)
}

/// Edit-distance fallback. The allowed distance adapts to the shorter
/// string and never exceeds the caller's threshold; matches additionally
/// need a similarity ratio of at least one half. The stemmed retry reuses
/// the adaptive cap computed from the unstemmed lengths.
fn levenshtein_score(
    variant: &VariantText,
    candidate: &CandidateText,
    threshold: f64,
) -> Option<f64> {
    let adaptive = threshold.min((variant.chars.min(candidate.name_chars) / 3) as f64);

    let distance = strsim::levenshtein(&variant.text, &candidate.name);
    let max_len = variant.chars.max(candidate.name_chars);
    let ratio = 1.0 - distance as f64 / max_len as f64;
    if distance as f64 <= adaptive && ratio >= MIN_LEVENSHTEIN_RATIO {
        return Some(1.0 + distance as f64 / 10.0);
    }

    let stemmed_distance = strsim::levenshtein(&variant.stemmed, &candidate.stemmed);
    let stemmed_max = variant.stemmed_chars.max(candidate.stemmed_chars);
    let stemmed_ratio = 1.0 - stemmed_distance as f64 / stemmed_max as f64;
    if stemmed_distance as f64 <= adaptive && stemmed_ratio >= MIN_LEVENSHTEIN_RATIO {
        return Some(1.1 + stemmed_distance as f64 / 10.0);
    }

    None
}

/// Find the single best match at the default threshold with no popularity
/// bias.
pub fn find_match<'a, C: MatchCandidate>(query: &str, candidates: &'a [C]) -> Option<&'a C> {
    find_match_with(query, candidates, DEFAULT_MATCH_THRESHOLD, &PopularityBoosts::default())
}

/// Find the single best match.
///
/// Scans variants in derivation order and candidates in list order; only a
/// strictly better score displaces the current best, so ties resolve to the
/// earliest pair. Returns the candidate only when the best score stays
/// strictly under `threshold`.
pub fn find_match_with<'a, C: MatchCandidate>(
    query: &str,
    candidates: &'a [C],
    threshold: f64,
    boosts: &PopularityBoosts,
) -> Option<&'a C> {
    let variants = prepare_variants(query);
    let prepared = prepare_candidates(candidates, boosts);

    let mut best_index = None;
    let mut best_score = f64::INFINITY;
    for variant in &variants {
        for (index, candidate) in &prepared {
            if let Some(rule) = rule_score(variant, candidate, threshold) {
                let score = rule + variant.penalty + candidate.boost;
                if score < best_score {
                    best_score = score;
                    best_index = Some(*index);
                }
            }
        }
    }

    match best_index {
        Some(index) if best_score < threshold => {
            let found = &candidates[index];
            debug!(query, score = best_score, key = found.match_key(), "local match accepted");
            Some(found)
        }
        _ => {
            debug!(query, "no local match under threshold");
            None
        }
    }
}

/// Best score per candidate across every variant, ascending.
///
/// Candidates that never score under `threshold` are omitted; ties keep
/// candidate list order. Used for suggestion lists.
pub fn rank_matches<C: MatchCandidate>(
    query: &str,
    candidates: &[C],
    threshold: f64,
    boosts: &PopularityBoosts,
) -> Vec<RankedMatch> {
    let variants = prepare_variants(query);
    let prepared = prepare_candidates(candidates, boosts);

    let mut ranked: Vec<RankedMatch> = prepared
        .iter()
        .filter_map(|(index, candidate)| {
            let mut best = f64::INFINITY;
            for variant in &variants {
                if let Some(rule) = rule_score(variant, candidate, threshold) {
                    let score = rule + variant.penalty + candidate.boost;
                    if score < best {
                        best = score;
                    }
                }
            }
            if best < threshold {
                Some(RankedMatch { index: *index, score: best })
            } else {
                None
            }
        })
        .collect();
    ranked.sort_by(|a, b| a.score.total_cmp(&b.score));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl MatchCandidate for Named {
        fn match_key(&self) -> &str {
            self.0
        }
    }

    fn db(names: &[&'static str]) -> Vec<Named> {
        names.iter().map(|n| Named(n)).collect()
    }

    fn sample_db() -> Vec<Named> {
        db(&[
            "PET láhev",
            "PET flaška",
            "plastová láhev",
            "kelímek od jogurtu",
            "sklenice",
            "plechovka",
            "papírová krabice",
            "karton od mléka",
        ])
    }

    fn best<'a>(query: &str, candidates: &'a [Named]) -> Option<&'a str> {
        find_match(query, candidates).map(|c| c.0)
    }

    // ── exact and near-exact matching ────────────────────────────

    #[test]
    fn test_exact_match() {
        let items = sample_db();
        assert_eq!(best("plechovka", &items), Some("plechovka"));
        assert_eq!(best("  PET LÁHEV ", &items), Some("PET láhev"));
    }

    #[test]
    fn test_exact_beats_every_other_rule() {
        let items = db(&["kelimek", "kelímek od jogurtu"]);
        assert_eq!(best("kelimek", &items), Some("kelimek"));
    }

    #[test]
    fn test_tie_keeps_earliest_candidate() {
        let items = db(&["Láhev", "LAHEV"]);
        assert_eq!(best("lahev", &items), Some("Láhev"));
    }

    #[test]
    fn test_stemmed_exact() {
        // "plastove lahve" and "plastová láhev" share the stem phrase
        // "plastov lahev" through the canonical-promoted variant.
        let items = db(&["plastová láhev"]);
        assert_eq!(best("plastové lahve", &items), Some("plastová láhev"));
    }

    // ── prefix and phonetic rules ────────────────────────────────

    #[test]
    fn test_single_word_prefix() {
        let items = db(&["kelímek od jogurtu"]);
        assert_eq!(best("kelimek", &items), Some("kelímek od jogurtu"));
        assert_eq!(best("kelímky", &items), Some("kelímek od jogurtu"));
    }

    #[test]
    fn test_multi_word_prefix() {
        let items = db(&["pet lahev od limonady"]);
        assert_eq!(best("pet lahev", &items), Some("pet lahev od limonady"));
    }

    #[test]
    fn test_phonetic_match() {
        // Same consonant classes, different vowels; too far apart for the
        // prefix or containment rules.
        assert!(sounds_like("kelimek", "kelymak"));
        assert_eq!(best("kelimek", &db(&["kelymak"])), Some("kelymak"));
    }

    // ── synonym and stem driven matching ─────────────────────────

    #[test]
    fn test_synonym_substitution() {
        let items = db(&["plechovka", "sklenice"]);
        assert_eq!(best("konzerva", &items), Some("plechovka"));
    }

    #[test]
    fn test_plural_reaches_record_via_stem_and_ngram() {
        let items = db(&["PET láhev"]);
        assert_eq!(best("lahve", &items), Some("PET láhev"));
    }

    #[test]
    fn test_canonical_variant_exact_hit_wins() {
        // "petka" promotes to "plastova lahev" (penalty 0.25), whose exact
        // hit at 0.25 undercuts the prefix score of the "pet" variant.
        let items = sample_db();
        assert_eq!(best("petka", &items), Some("plastová láhev"));
    }

    // ── misses, guards, thresholds ───────────────────────────────

    #[test]
    fn test_unrelated_query_is_none() {
        assert_eq!(best("xyzabc", &sample_db()), None);
    }

    #[test]
    fn test_short_variants_never_scored() {
        let items = db(&["pet lahev", "sklenice"]);
        assert_eq!(best("a", &items), None);
        assert_eq!(best("to", &items), None);
        assert_eq!(best("", &items), None);
    }

    #[test]
    fn test_empty_candidate_names_skipped() {
        let items = db(&["", "   ", "plechovka"]);
        assert_eq!(best("plechovka", &items), Some("plechovka"));
        assert_eq!(best("zzz", &items), None);
    }

    #[test]
    fn test_levenshtein_fallback() {
        // "ktabize" vs "krabice": two substitutions, no earlier rule
        // applies, so the pair scores exactly 1.2.
        let items = db(&["krabice"]);
        assert_eq!(best("ktabize", &items), Some("krabice"));
    }

    #[test]
    fn test_threshold_gates_the_best_score() {
        // The prefix rule scores this pair at exactly 0.21; acceptance
        // requires the score to stay strictly under the threshold.
        let items = db(&["kelímek od jogurtu"]);
        let boosts = PopularityBoosts::default();
        assert!(find_match_with("kelimek", &items, 0.21, &boosts).is_none());
        assert!(find_match_with("kelimek", &items, 0.22, &boosts).is_some());
    }

    #[test]
    fn test_threshold_caps_edit_distance() {
        // Lowering the threshold also tightens the adaptive distance cap,
        // so the distance-2 pair stops matching entirely.
        let items = db(&["krabice"]);
        let boosts = PopularityBoosts::default();
        assert!(find_match_with("ktabize", &items, 1.0, &boosts).is_none());
    }

    #[test]
    fn test_everything_over_threshold_is_none() {
        let items = db(&["karton od mléka"]);
        assert_eq!(best("plechovka", &items), None);
    }

    // ── popularity boosts ────────────────────────────────────────

    #[test]
    fn test_boost_values_and_cap() {
        let boosts = PopularityBoosts::from_popular_queries([("lahev", 2), ("sklo", 100)]);
        assert_eq!(boosts.boost_for("Láhev"), -0.2);
        assert_eq!(boosts.boost_for("sklo"), -0.5);
        assert_eq!(boosts.boost_for("papir"), 0.0);
    }

    #[test]
    fn test_boost_collision_keeps_first_entry() {
        let boosts = PopularityBoosts::from_popular_queries([("Láhev", 3), ("lahev", 9)]);
        assert_eq!(boosts.boost_for("lahev"), -0.3);
    }

    #[test]
    fn test_popularity_reorders_matches() {
        let items = db(&["PET flaška", "PET láhev"]);
        assert_eq!(best("pet", &items), Some("PET láhev"));

        let boosts = PopularityBoosts::from_popular_queries([("pet flaška", 10)]);
        let boosted = find_match_with("pet", &items, DEFAULT_MATCH_THRESHOLD, &boosts);
        assert_eq!(boosted.map(|c| c.0), Some("PET flaška"));
    }

    // ── ranked suggestions ───────────────────────────────────────

    #[test]
    fn test_rank_matches_orders_by_best_score() {
        let items = sample_db();
        let ranked = rank_matches("lahve", &items, SUGGESTION_THRESHOLD, &PopularityBoosts::default());

        let names: Vec<&str> = ranked.iter().map(|r| items[r.index].0).collect();
        assert_eq!(names, vec!["PET flaška", "PET láhev", "plastová láhev"]);
        for pair in ranked.windows(2) {
            assert!(pair[0].score <= pair[1].score);
        }
        // Best route for "PET flaška": n-gram on the "flaska" variant.
        let expected = 0.3 + (1.0 - 9.0 / 17.0) / 2.0 + 0.25;
        assert!((ranked[0].score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_rank_matches_empty_when_nothing_close() {
        let ranked = rank_matches(
            "xyzabc",
            &sample_db(),
            SUGGESTION_THRESHOLD,
            &PopularityBoosts::default(),
        );
        assert!(ranked.is_empty());
    }
}
