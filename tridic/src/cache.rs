//! TTL'd cache of provider answers.
//!
//! Every answer the external provider gives is remembered for thirty days,
//! keyed three ways: by the answer's name, by the query that produced it,
//! and by the positional fingerprint of the photographed image. Text
//! lookups try an exact normalized-query hit first and fall back to the
//! fuzzy matcher, so "lahve" can be served by an entry cached for
//! "pet lahev".

use serde::Serialize;
use tracing::{debug, warn};

use crate::matcher;
use crate::models::{now_ms, CacheEntry, ImagePayload, ProviderAnswer};
use crate::normalize::normalize;
use crate::storage::KeyValueStorage;

/// Storage slot holding the serialized entry list.
pub const STORAGE_KEY: &str = "recyklacni_asistent_ai_cache";

/// Entries older than this are expired.
const CACHE_TTL_MS: i64 = 30 * 24 * 60 * 60 * 1000;

/// The cache never grows past this many entries.
const CACHE_CAPACITY: usize = 500;

/// Queries shorter than this never hit the cache.
const MIN_QUERY_CHARS: usize = 2;

/// Entry counts bucketed by TTL state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total: usize,
    pub expired: usize,
    pub valid: usize,
}

/// Persistent cache of provider answers. Newest entries sit at the front;
/// every mutation is written back to storage before it returns.
pub struct ResponseCache<S> {
    storage: S,
    entries: Vec<CacheEntry>,
}

impl<S: KeyValueStorage> ResponseCache<S> {
    /// Loads the cache from storage, dropping entries that expired since
    /// the last session. A missing or unreadable slot starts empty.
    pub fn new(storage: S) -> Self {
        Self::load_at(storage, now_ms())
    }

    fn load_at(storage: S, now: i64) -> Self {
        let entries = match storage.get_string(STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<CacheEntry>>(&raw) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(error = %err, "discarding unreadable response cache");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(error = %err, "failed to read response cache");
                Vec::new()
            }
        };

        let mut cache = Self { storage, entries };
        let before = cache.entries.len();
        cache.entries.retain(|entry| is_valid_at(entry, now));
        let swept = before - cache.entries.len();
        if swept > 0 {
            debug!(swept, "dropped expired cache entries at load");
            cache.persist();
        }
        cache
    }

    /// Looks up a text query: exact normalized-query match first, fuzzy
    /// match second. An expired exact hit returns `None` without falling
    /// back to the fuzzy path; an expired fuzzy hit returns `None` too.
    pub fn find_by_query(&self, query: &str) -> Option<&CacheEntry> {
        self.find_by_query_at(query, now_ms())
    }

    fn find_by_query_at(&self, query: &str, now: i64) -> Option<&CacheEntry> {
        if query.chars().count() < MIN_QUERY_CHARS {
            return None;
        }

        let normalized = normalize(query);
        let exact = self.entries.iter().find(|entry| {
            entry
                .query
                .as_deref()
                .map_or(false, |q| !q.is_empty() && normalize(q) == normalized)
        });
        if let Some(entry) = exact {
            return is_valid_at(entry, now).then_some(entry);
        }

        let matched = matcher::find_match(query, &self.entries)?;
        is_valid_at(matched, now).then_some(matched)
    }

    /// Looks up a photographed image by its positional fingerprint.
    pub fn find_by_image(&self, image: &ImagePayload) -> Option<&CacheEntry> {
        self.find_by_image_at(image, now_ms())
    }

    fn find_by_image_at(&self, image: &ImagePayload, now: i64) -> Option<&CacheEntry> {
        let fingerprint = image.fingerprint();
        let entry = self
            .entries
            .iter()
            .find(|entry| entry.image_fingerprint.as_deref() == Some(fingerprint.as_str()))?;
        is_valid_at(entry, now).then_some(entry)
    }

    /// Remembers a provider answer.
    ///
    /// An existing entry with the same normalized name, the same normalized
    /// query, or the same image fingerprint is overwritten in place with a
    /// fresh timestamp; otherwise the answer is prepended and anything past
    /// capacity falls off the old end.
    pub fn add(
        &mut self,
        answer: &ProviderAnswer,
        query: Option<&str>,
        image: Option<&ImagePayload>,
    ) {
        self.add_at(answer, query, image, now_ms());
    }

    fn add_at(
        &mut self,
        answer: &ProviderAnswer,
        query: Option<&str>,
        image: Option<&ImagePayload>,
        now: i64,
    ) {
        let entry = CacheEntry {
            name: answer.name.clone(),
            category: answer.category,
            note: answer.note.clone().unwrap_or_default(),
            timestamp: now,
            query: query.map(str::to_string),
            image_fingerprint: image
                .map(ImagePayload::fingerprint)
                .filter(|fingerprint| !fingerprint.is_empty()),
        };

        match self.entries.iter().position(|cached| supersedes(&entry, cached)) {
            Some(slot) => self.entries[slot] = entry,
            None => {
                self.entries.insert(0, entry);
                self.entries.truncate(CACHE_CAPACITY);
            }
        }
        self.persist();
    }

    /// Entry counts by TTL state.
    pub fn stats(&self) -> CacheStats {
        self.stats_at(now_ms())
    }

    fn stats_at(&self, now: i64) -> CacheStats {
        let valid = self.entries.iter().filter(|entry| is_valid_at(entry, now)).count();
        CacheStats { total: self.entries.len(), expired: self.entries.len() - valid, valid }
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.persist();
    }

    pub fn entries(&self) -> &[CacheEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn persist(&mut self) {
        let json = match serde_json::to_string(&self.entries) {
            Ok(json) => json,
            Err(err) => {
                warn!(error = %err, "failed to serialize response cache");
                return;
            }
        };
        if let Err(err) = self.storage.set_string(STORAGE_KEY, &json) {
            warn!(error = %err, "failed to persist response cache");
        }
    }
}

fn is_valid_at(entry: &CacheEntry, now: i64) -> bool {
    now - entry.timestamp < CACHE_TTL_MS
}

/// Whether a new entry should replace `cached` instead of being prepended.
fn supersedes(entry: &CacheEntry, cached: &CacheEntry) -> bool {
    if normalize(&cached.name) == normalize(&entry.name) {
        return true;
    }

    let query_match = match (&entry.query, &cached.query) {
        (Some(new), Some(old)) if !new.is_empty() && !old.is_empty() => {
            normalize(new) == normalize(old)
        }
        _ => false,
    };
    if query_match {
        return true;
    }

    match &entry.image_fingerprint {
        Some(fingerprint) => cached.image_fingerprint.as_deref() == Some(fingerprint.as_str()),
        None => false,
    }
}
