//! Tridic - local resolution engine for a Czech waste-sorting assistant
//!
//! Answers "where does this waste go?" without a network round-trip
//! wherever it can: a fuzzy, phonetic and synonym-aware matcher over a
//! built-in knowledge base, a TTL'd cache of previous provider answers,
//! and a usage tracker whose popularity data biases ranking and plans
//! cache warming. The external identification provider stays host-side;
//! this crate decides when it is needed and remembers what it said.

pub mod analytics;
pub mod cache;
pub mod knowledge;
pub mod matcher;
pub mod models;
pub mod ngram;
pub mod normalize;
pub mod phonetic;
pub mod prefetch;
pub mod resolver;
pub mod stem;
pub mod storage;
pub mod synonyms;

pub use analytics::{
    CompressionSavings, ErrorCounts, EventKind, Metadata, PopularQuery, PopularityEvent,
    PopularityTracker, UsageStats,
};
pub use cache::{CacheStats, ResponseCache};
pub use knowledge::{built_in_records, KnowledgeBase};
pub use matcher::{
    find_match, find_match_with, rank_matches, MatchCandidate, PopularityBoosts, RankedMatch,
    DEFAULT_MATCH_THRESHOLD, SUGGESTION_THRESHOLD,
};
pub use models::{CacheEntry, ImagePayload, ProviderAnswer, WasteCategory, WasteRecord};
pub use prefetch::{
    prefetch_list, prefetch_stats, should_prefetch, PrefetchStats, DEFAULT_PREFETCH_ITEMS,
};
pub use resolver::{RejectionReason, Resolution, Resolver, Suggestion};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, StorageError, StorageResult};
