//! Tiered resolution.
//!
//! One front door for the host: text and image inputs walk the local tiers
//! (knowledge base, then response cache, then near-miss suggestions) and
//! only report [`Resolution::NeedsProvider`] when nothing local will do.
//! Provider answers come back through
//! [`Resolver::record_provider_answer`], which caches them and promotes
//! brand-new names into the user knowledge base. All tier outcomes and
//! suggestion verdicts are tracked, so popularity feeds back into ranking
//! on the next call.

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::analytics::{EventKind, Metadata, PopularityTracker};
use crate::cache::ResponseCache;
use crate::knowledge::KnowledgeBase;
use crate::matcher::{self, DEFAULT_MATCH_THRESHOLD, SUGGESTION_THRESHOLD};
use crate::models::{CacheEntry, ImagePayload, ProviderAnswer, WasteRecord};
use crate::storage::{FileStorage, KeyValueStorage, MemoryStorage, StorageResult};

/// At most this many suggestions are offered.
const MAX_SUGGESTIONS: usize = 3;

/// A near-miss offered to the user. Lower scores are closer.
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub record: WasteRecord,
    pub score: f64,
}

/// Where a resolution attempt landed.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A knowledge-base record matched outright.
    Local { record: WasteRecord, user_added: bool },
    /// A previous provider answer covers the input.
    Cached(CacheEntry),
    /// Nothing matched outright; these near-misses might, best first.
    Suggestions(Vec<Suggestion>),
    /// Nothing local applies; ask the external provider.
    NeedsProvider,
}

/// Why the user dismissed a suggestion list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    ChoseProvider,
    Cancelled,
}

impl RejectionReason {
    fn as_str(self) -> &'static str {
        match self {
            RejectionReason::ChoseProvider => "user_chose_ai",
            RejectionReason::Cancelled => "user_cancelled",
        }
    }
}

/// The resolution engine: knowledge base, response cache, and usage
/// tracker behind one API. All three persist through the same storage
/// type, each under its own slot.
pub struct Resolver<S> {
    knowledge: KnowledgeBase<S>,
    cache: ResponseCache<S>,
    tracker: PopularityTracker<S>,
}

impl Resolver<MemoryStorage> {
    /// Fully volatile resolver; nothing survives drop.
    pub fn in_memory() -> Self {
        Self::new(
            KnowledgeBase::new(MemoryStorage::new()),
            ResponseCache::new(MemoryStorage::new()),
            PopularityTracker::new(MemoryStorage::new()),
        )
    }
}

impl Resolver<FileStorage> {
    /// File-backed resolver; the three slots live as JSON files under
    /// `dir`, which is created if missing.
    pub fn open(dir: impl AsRef<Path>) -> StorageResult<Self> {
        let dir = dir.as_ref();
        Ok(Self::new(
            KnowledgeBase::new(FileStorage::open(dir)?),
            ResponseCache::new(FileStorage::open(dir)?),
            PopularityTracker::new(FileStorage::open(dir)?),
        ))
    }
}

impl<S: KeyValueStorage> Resolver<S> {
    pub fn new(
        knowledge: KnowledgeBase<S>,
        cache: ResponseCache<S>,
        tracker: PopularityTracker<S>,
    ) -> Self {
        Self { knowledge, cache, tracker }
    }

    /// Resolves a text query against the local tiers.
    pub fn resolve_text(&mut self, query: &str) -> Resolution {
        let boosts = self.tracker.ranking_boosts();
        let candidates = self.knowledge.records();

        if let Some(record) =
            matcher::find_match_with(query, &candidates, DEFAULT_MATCH_THRESHOLD, &boosts)
        {
            let record = record.clone();
            let user_added = self.knowledge.is_user_record(&record.name);
            let mut metadata = meta([("query", Value::from(query))]);
            if user_added {
                metadata.insert("userAdded".to_string(), Value::from(true));
            }
            self.tracker.track_with(EventKind::SearchLocalHit, metadata);
            debug!(query, name = %record.name, "resolved from knowledge base");
            return Resolution::Local { record, user_added };
        }

        let cached = self.cache.find_by_query(query).cloned();
        if let Some(entry) = cached {
            self.tracker
                .track_with(EventKind::SearchCacheHit, meta([("query", Value::from(query))]));
            debug!(query, name = %entry.name, "resolved from response cache");
            return Resolution::Cached(entry);
        }

        let ranked = matcher::rank_matches(query, &candidates, SUGGESTION_THRESHOLD, &boosts);
        let suggestions: Vec<Suggestion> = ranked
            .into_iter()
            .take(MAX_SUGGESTIONS)
            .map(|ranked| Suggestion {
                record: candidates[ranked.index].clone(),
                score: ranked.score,
            })
            .collect();
        if !suggestions.is_empty() {
            self.tracker.track_with(
                EventKind::SearchSuggestionShown,
                meta([("query", Value::from(query)), ("count", Value::from(suggestions.len()))]),
            );
            debug!(query, count = suggestions.len(), "offering suggestions");
            return Resolution::Suggestions(suggestions);
        }

        debug!(query, "nothing local, provider needed");
        Resolution::NeedsProvider
    }

    /// Resolves a photographed image against the response cache.
    pub fn resolve_image(&mut self, image: &ImagePayload) -> Resolution {
        let cached = self.cache.find_by_image(image).cloned();
        if let Some(entry) = cached {
            self.tracker.track(EventKind::ImageCacheHit);
            debug!(name = %entry.name, "resolved image from response cache");
            return Resolution::Cached(entry);
        }

        debug!("image unknown locally, provider needed");
        Resolution::NeedsProvider
    }

    /// Feeds a provider answer back: caches it under the query and image
    /// that produced it, and promotes the name into the user knowledge
    /// base unless either list already has it. Returns whether the
    /// promotion happened.
    pub fn record_provider_answer(
        &mut self,
        answer: &ProviderAnswer,
        query: Option<&str>,
        image: Option<&ImagePayload>,
    ) -> bool {
        self.cache.add(answer, query, image);
        let record = WasteRecord::new(
            answer.name.clone(),
            answer.category,
            answer.note.clone().unwrap_or_default(),
        );
        let promoted = self.knowledge.insert(record);
        debug!(name = %answer.name, promoted, "recorded provider answer");
        promoted
    }

    /// Adds a record on the user's behalf; tracked when it sticks.
    pub fn add_user_record(&mut self, record: WasteRecord) -> bool {
        let name = record.name.clone();
        let category = record.category;
        if !self.knowledge.insert(record) {
            return false;
        }
        self.tracker.track_with(
            EventKind::UserAddedItem,
            meta([
                ("itemName", Value::from(name)),
                ("category", Value::from(category.label())),
            ]),
        );
        true
    }

    /// The user picked one of the offered suggestions.
    pub fn suggestion_accepted(&mut self, query: &str, selected: &str) {
        self.tracker.track_with(
            EventKind::SearchSuggestionAccepted,
            meta([
                ("query", Value::from(query)),
                ("selectedSuggestion", Value::from(selected)),
            ]),
        );
    }

    /// The user dismissed the offered suggestions.
    pub fn suggestion_rejected(&mut self, query: &str, reason: RejectionReason) {
        self.tracker.track_with(
            EventKind::SearchSuggestionRejected,
            meta([("query", Value::from(query)), ("reason", Value::from(reason.as_str()))]),
        );
    }

    pub fn knowledge(&self) -> &KnowledgeBase<S> {
        &self.knowledge
    }

    pub fn cache(&self) -> &ResponseCache<S> {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut ResponseCache<S> {
        &mut self.cache
    }

    pub fn tracker(&self) -> &PopularityTracker<S> {
        &self.tracker
    }

    /// Mutable tracker access for host-driven events: image capture and
    /// compression, feedback, provider calls and their failures.
    pub fn tracker_mut(&mut self) -> &mut PopularityTracker<S> {
        &mut self.tracker
    }
}

fn meta(pairs: impl IntoIterator<Item = (&'static str, Value)>) -> Metadata {
    pairs.into_iter().map(|(key, value)| (key.to_string(), value)).collect()
}
