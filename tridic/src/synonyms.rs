//! Synonym expansion for Czech waste-vocabulary queries.
//!
//! A query is rewritten into a set of weighted variants before matching:
//! the query itself, its stemmed form, synonym substitutions per word (and
//! per adjacent word pair, for multi-word dictionary entries), and canonical
//! terms for any word whose stem lands in a synonym family. Each rewrite
//! carries a penalty so closer forms always outrank looser ones.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::normalize::normalize;
use crate::stem::stem_word;

/// A rewritten query plus the score penalty it carries into matching.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryVariant {
    pub text: String,
    pub penalty: f64,
}

/// Penalty for the stemmed form of the whole query.
const STEM_PENALTY: f64 = 0.1;
/// Penalty for substituting a word (or adjacent word pair) with a synonym.
const SYNONYM_PENALTY: f64 = 0.2;
/// Penalty for promoting a word to the canonical term of its family.
const CANONICAL_PENALTY: f64 = 0.25;
/// Penalty for substituting the stemmed form of a synonym.
const STEMMED_SYNONYM_PENALTY: f64 = 0.3;

/// Canonical waste terms mapped to the surface forms users actually type.
/// Calibration data: entry order fixes variant order and the penalties above
/// are tuned against it, so the table stays as-is. Values keep their
/// diacritics; normalization happens at scoring time.
static SYNONYMS: [(&str, &[&str]); 37] = [
    // Bottles and containers
    ("lahev", &["flaska", "lahve", "flase", "flasky", "lahvi", "lahvi", "lahvich", "lahvemi"]),
    ("flaska", &["lahev", "lahve", "lahvi", "flasky", "flasek", "flaskach"]),
    ("pet", &["petka", "petky", "plastova lahev", "plastova flaska", "pet lahev", "pet flaska"]),
    ("plastova lahev", &["pet", "pet lahev", "pet flaska", "petka", "plastova flaska"]),
    ("pet lahev", &["plastova lahev", "pet", "pet flaska", "petka", "plastova flaska"]),
    // Cartons and boxes
    ("karton", &["krabice", "tetrapack", "tetra pak", "tetrapak", "lepenka", "napojovy karton"]),
    ("krabice", &["karton", "box", "krabicka", "krabic", "krabicek", "lepenka"]),
    ("napojovy karton", &["karton od mleka", "karton od dzusu", "tetrapack", "tetrapak"]),
    ("tetrapack", &["karton", "napojovy karton", "tetrapak", "tetra pak"]),
    // Paper
    ("noviny", &["casopis", "deniky", "magazin", "tisk", "novin", "novinach"]),
    ("casopis", &["noviny", "magazin", "casopisy", "casopisu"]),
    ("papir", &["papirovy odpad", "papiry", "lepenka"]),
    // Glass
    ("sklenice", &["sklo", "zavařovačka", "zavarovacka", "sklenicka", "sklenic", "sklenicek"]),
    ("sklo", &["sklenice", "sklenenice", "lahev", "skleneny odpad"]),
    // Metal
    ("plechovka", &["konzerva", "plechovky", "konzervy", "plech", "plechovek"]),
    ("konzerva", &["plechovka", "konzervy", "plechovky", "konzervou"]),
    ("kov", &["kovy", "kovovy odpad", "kovove obaly", "plech"]),
    // Electronics
    ("baterie", &["baterk", "clankek", "akumulator", "baterii", "baterii"]),
    ("mobil", &["telefon", "smartphone", "mobily", "telefony", "mobilni telefon"]),
    ("telefon", &["mobil", "smartphone", "mobily", "telefony", "mobilni telefon"]),
    ("pocitac", &["notebook", "laptop", "pc", "computer", "pocitace"]),
    ("notebook", &["pocitac", "laptop", "pc", "notebooky"]),
    ("lednicka", &["chladnicka", "mrazak", "mraznicka", "lednicky"]),
    ("televize", &["televizor", "tv", "monitor", "televizi", "televizory"]),
    ("elektro", &["elektroodpad", "elektrozarizeni", "elektrospotrebice"]),
    // Textiles
    ("obleceni", &["saty", "textil", "hadry", "satstvo", "odevy", "oblečení"]),
    ("textil", &["obleceni", "hadry", "satstvo", "odevy", "textilie"]),
    ("hadry", &["obleceni", "textil", "utěrky", "hadru"]),
    // Cups and containers
    ("kelimek", &["kelímek", "pohar", "poharek", "kelimky", "kelímky"]),
    ("pohar", &["kelimek", "poharek", "pohary", "poharu"]),
    // Plastic types
    ("plast", &["plastovy odpad", "plasty", "plastove obaly", "plastika"]),
    ("igelit", &["igelitovy sacek", "igelitova taska", "mikroten", "sacek"]),
    ("folie", &["plastova folie", "igelit", "obalova folie"]),
    // Bio waste
    ("bio", &["bioodpad", "biologicky odpad", "organicky odpad", "kompost"]),
    ("bioodpad", &["bio", "organicky odpad", "biologicky odpad", "kompost"]),
    // Common items
    ("sacek", &["sacky", "taška", "igelit", "igelitovy sacek"]),
    ("taska", &["tasky", "sacek", "igelitova taska"]),
];

/// Direct canonical-term lookup.
static DIRECT: Lazy<HashMap<&'static str, &'static [&'static str]>> =
    Lazy::new(|| SYNONYMS.iter().copied().collect());

struct StemmedEntry {
    canonical: &'static str,
    canonical_stem: &'static str,
    synonym_stems: Vec<&'static str>,
}

/// Per-entry stems, precomputed once, in table order.
static STEM_INDEX: Lazy<Vec<StemmedEntry>> = Lazy::new(|| {
    SYNONYMS
        .iter()
        .map(|(canonical, synonyms)| StemmedEntry {
            canonical,
            canonical_stem: stem_word(canonical),
            synonym_stems: synonyms.iter().map(|s| stem_word(s)).collect(),
        })
        .collect()
});

/// Insertion-ordered variant accumulator. Re-inserting existing text keeps
/// its position and the smaller of the two penalties.
#[derive(Default)]
struct VariantSet {
    ordered: Vec<QueryVariant>,
    index: HashMap<String, usize>,
}

impl VariantSet {
    fn insert(&mut self, text: String, penalty: f64) {
        match self.index.get(&text) {
            Some(&slot) => {
                let existing = &mut self.ordered[slot];
                if penalty < existing.penalty {
                    existing.penalty = penalty;
                }
            }
            None => {
                self.index.insert(text.clone(), self.ordered.len());
                self.ordered.push(QueryVariant { text, penalty });
            }
        }
    }
}

fn replace_word(words: &[&str], at: usize, replacement: &str) -> String {
    words
        .iter()
        .enumerate()
        .map(|(i, w)| if i == at { replacement } else { *w })
        .collect::<Vec<_>>()
        .join(" ")
}

fn replace_pair(words: &[&str], at: usize, replacement: &str) -> String {
    let mut out: Vec<&str> = Vec::with_capacity(words.len() - 1);
    out.extend_from_slice(&words[..at]);
    out.push(replacement);
    out.extend_from_slice(&words[at + 2..]);
    out.join(" ")
}

/// Expand a raw query into its weighted variants.
///
/// The normalized query always comes first with penalty 0; every other
/// rewrite follows in derivation order. Variant text is taken verbatim from
/// the dictionary, diacritics included.
pub fn expand_query(query: &str) -> Vec<QueryVariant> {
    let normalized = normalize(query);
    let mut variants = VariantSet::default();
    variants.insert(normalized.clone(), 0.0);

    let words: Vec<&str> = normalized.split_whitespace().collect();
    let stemmed_words: Vec<&str> = words.iter().map(|w| stem_word(w)).collect();
    let stemmed_query = stemmed_words.join(" ");
    if stemmed_query != normalized {
        variants.insert(stemmed_query, STEM_PENALTY);
    }

    for i in 0..words.len() {
        // Direct synonyms of this word, raw and stemmed.
        if let Some(synonyms) = DIRECT.get(words[i]) {
            for &synonym in *synonyms {
                variants.insert(replace_word(&words, i, synonym), SYNONYM_PENALTY);
                variants.insert(
                    replace_word(&words, i, stem_word(synonym)),
                    STEMMED_SYNONYM_PENALTY,
                );
            }
        }

        // Any family whose stems cover this word promotes its canonical term.
        for entry in STEM_INDEX.iter() {
            if stemmed_words[i] == entry.canonical_stem
                || entry.synonym_stems.contains(&stemmed_words[i])
            {
                variants.insert(replace_word(&words, i, entry.canonical), CANONICAL_PENALTY);
            }
        }

        // Adjacent word pairs can hit multi-word dictionary entries.
        if i + 1 < words.len() {
            let phrase = format!("{} {}", words[i], words[i + 1]);
            if let Some(synonyms) = DIRECT.get(phrase.as_str()) {
                for &synonym in *synonyms {
                    variants.insert(replace_pair(&words, i, synonym), SYNONYM_PENALTY);
                    variants.insert(
                        replace_pair(&words, i, stem_word(synonym)),
                        STEMMED_SYNONYM_PENALTY,
                    );
                }
            }
        }
    }

    variants.ordered
}
