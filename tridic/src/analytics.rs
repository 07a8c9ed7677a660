//! Append-only usage tracking.
//!
//! Every interaction worth counting lands here as a timestamped event with
//! optional JSON metadata. The log is the single source for session
//! statistics, for the popular-query list, and for the popularity boosts
//! that bias the matcher toward things people actually ask about. Events
//! older than thirty days are dropped when the tracker loads.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::matcher::PopularityBoosts;
use crate::models::now_ms;
use crate::storage::KeyValueStorage;

/// Storage slot holding the serialized event log.
pub const STORAGE_KEY: &str = "recyklacni_asistent_analytics";

/// Events older than this are dropped at load.
const EVENT_TTL_MS: i64 = 30 * 24 * 60 * 60 * 1000;

/// How many popular queries feed the ranking boosts.
const BOOSTED_QUERY_COUNT: usize = 50;

/// How many popular queries an export carries.
const EXPORT_QUERY_COUNT: usize = 20;

/// Everything the tracker can count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SearchLocalHit,
    SearchCacheHit,
    SearchAiCall,
    SearchSuggestionShown,
    SearchSuggestionAccepted,
    SearchSuggestionRejected,
    ImageCaptured,
    ImageCompressed,
    ImageCacheHit,
    UserAddedItem,
    UserFeedbackPositive,
    UserFeedbackNegative,
    ErrorOffline,
    ErrorNoApiKey,
    ErrorAiFailed,
}

/// Free-form event payload. The `query` key, when present, feeds the
/// popular-query aggregation.
pub type Metadata = serde_json::Map<String, Value>;

/// One logged interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopularityEvent {
    pub kind: EventKind,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// A query and how many times it was asked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopularQuery {
    pub query: String,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorCounts {
    pub offline: usize,
    pub no_api_key: usize,
    pub ai_failed: usize,
}

/// Byte totals reported by image-compressed events.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionSavings {
    pub total_original_size: u64,
    pub total_compressed_size: u64,
    pub average_reduction: f64,
}

/// Counters and rates over a time window. Rates are percentages rounded to
/// one decimal; a zero denominator reads as `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    pub total_searches: usize,
    pub local_hits: usize,
    pub cache_hits: usize,
    pub ai_calls: usize,
    pub suggestions_shown: usize,
    pub suggestions_accepted: usize,
    pub suggestions_rejected: usize,
    pub images_captured: usize,
    pub images_compressed: usize,
    pub image_cache_hits: usize,
    pub user_added_items: usize,
    pub positive_feedback: usize,
    pub negative_feedback: usize,
    pub errors: ErrorCounts,
    pub cache_hit_rate: f64,
    pub suggestion_acceptance_rate: f64,
    pub ai_usage_rate: f64,
    pub image_cache_hit_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_savings: Option<CompressionSavings>,
}

/// Persistent event log plus the aggregations derived from it. Every track
/// call is written back to storage before it returns.
pub struct PopularityTracker<S> {
    storage: S,
    events: Vec<PopularityEvent>,
    session_start: i64,
}

impl<S: KeyValueStorage> PopularityTracker<S> {
    /// Loads the event log, dropping events older than thirty days. A
    /// missing or unreadable slot starts empty.
    pub fn new(storage: S) -> Self {
        Self::load_at(storage, now_ms())
    }

    fn load_at(storage: S, now: i64) -> Self {
        let events = match storage.get_string(STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<PopularityEvent>>(&raw) {
                Ok(events) => events,
                Err(err) => {
                    warn!(error = %err, "discarding unreadable event log");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(error = %err, "failed to read event log");
                Vec::new()
            }
        };

        let mut tracker = Self { storage, events, session_start: now };
        let before = tracker.events.len();
        tracker.events.retain(|event| event.timestamp > now - EVENT_TTL_MS);
        let swept = before - tracker.events.len();
        if swept > 0 {
            debug!(swept, "dropped expired usage events at load");
            tracker.persist();
        }
        tracker
    }

    /// Logs an event with no payload.
    pub fn track(&mut self, kind: EventKind) {
        self.track_at(kind, None, now_ms());
    }

    /// Logs an event with metadata.
    pub fn track_with(&mut self, kind: EventKind, metadata: Metadata) {
        self.track_at(kind, Some(metadata), now_ms());
    }

    fn track_at(&mut self, kind: EventKind, metadata: Option<Metadata>, now: i64) {
        self.events.push(PopularityEvent { kind, timestamp: now, metadata });
        debug!(kind = ?kind, "tracked usage event");
        self.persist();
    }

    /// Statistics since this tracker was constructed.
    pub fn stats(&self) -> UsageStats {
        self.stats_since(self.session_start)
    }

    /// Statistics over events at or after `from` (epoch milliseconds).
    pub fn stats_since(&self, from: i64) -> UsageStats {
        let mut local_hits = 0;
        let mut cache_hits = 0;
        let mut ai_calls = 0;
        let mut suggestions_shown = 0;
        let mut suggestions_accepted = 0;
        let mut suggestions_rejected = 0;
        let mut images_captured = 0;
        let mut images_compressed = 0;
        let mut image_cache_hits = 0;
        let mut user_added_items = 0;
        let mut positive_feedback = 0;
        let mut negative_feedback = 0;
        let mut errors = ErrorCounts::default();
        let mut sized_compressions = 0;
        let mut original_size: u64 = 0;
        let mut compressed_size: u64 = 0;

        for event in self.events.iter().filter(|event| event.timestamp >= from) {
            match event.kind {
                EventKind::SearchLocalHit => local_hits += 1,
                EventKind::SearchCacheHit => cache_hits += 1,
                EventKind::SearchAiCall => ai_calls += 1,
                EventKind::SearchSuggestionShown => suggestions_shown += 1,
                EventKind::SearchSuggestionAccepted => suggestions_accepted += 1,
                EventKind::SearchSuggestionRejected => suggestions_rejected += 1,
                EventKind::ImageCaptured => images_captured += 1,
                EventKind::ImageCompressed => {
                    images_compressed += 1;
                    if let Some(meta) = &event.metadata {
                        sized_compressions += 1;
                        original_size += size_field(meta, "originalSize");
                        compressed_size += size_field(meta, "compressedSize");
                    }
                }
                EventKind::ImageCacheHit => image_cache_hits += 1,
                EventKind::UserAddedItem => user_added_items += 1,
                EventKind::UserFeedbackPositive => positive_feedback += 1,
                EventKind::UserFeedbackNegative => negative_feedback += 1,
                EventKind::ErrorOffline => errors.offline += 1,
                EventKind::ErrorNoApiKey => errors.no_api_key += 1,
                EventKind::ErrorAiFailed => errors.ai_failed += 1,
            }
        }

        let total_searches = local_hits + cache_hits + ai_calls;
        let compression_savings = if sized_compressions > 0 {
            let average_reduction = if original_size > 0 {
                round_tenth(
                    (original_size as f64 - compressed_size as f64) / original_size as f64
                        * 100.0,
                )
            } else {
                0.0
            };
            Some(CompressionSavings {
                total_original_size: original_size,
                total_compressed_size: compressed_size,
                average_reduction,
            })
        } else {
            None
        };

        UsageStats {
            total_searches,
            local_hits,
            cache_hits,
            ai_calls,
            suggestions_shown,
            suggestions_accepted,
            suggestions_rejected,
            images_captured,
            images_compressed,
            image_cache_hits,
            user_added_items,
            positive_feedback,
            negative_feedback,
            errors,
            cache_hit_rate: rate(cache_hits, total_searches),
            suggestion_acceptance_rate: rate(suggestions_accepted, suggestions_shown),
            ai_usage_rate: rate(ai_calls, total_searches),
            image_cache_hit_rate: rate(image_cache_hits, images_captured),
            compression_savings,
        }
    }

    /// The most-asked queries across the whole retained log, most frequent
    /// first. Queries fold by lowercase only; ties keep first-seen order.
    pub fn popular_queries(&self, limit: usize) -> Vec<PopularQuery> {
        let mut tallies: Vec<PopularQuery> = Vec::new();
        let mut slots: std::collections::HashMap<String, usize> = std::collections::HashMap::new();

        for event in &self.events {
            let query = event
                .metadata
                .as_ref()
                .and_then(|meta| meta.get("query"))
                .and_then(Value::as_str);
            let query = match query {
                Some(query) => query.to_lowercase(),
                None => continue,
            };
            match slots.get(&query) {
                Some(&slot) => tallies[slot].count += 1,
                None => {
                    slots.insert(query.clone(), tallies.len());
                    tallies.push(PopularQuery { query, count: 1 });
                }
            }
        }

        tallies.sort_by(|a, b| b.count.cmp(&a.count));
        tallies.truncate(limit);
        tallies
    }

    /// Ranking boosts derived from the top popular queries.
    pub fn ranking_boosts(&self) -> PopularityBoosts {
        let top = self.popular_queries(BOOSTED_QUERY_COUNT);
        PopularityBoosts::from_popular_queries(
            top.iter().map(|popular| (popular.query.as_str(), popular.count)),
        )
    }

    /// Pretty-printed JSON dump of the log, session statistics, and the
    /// popular-query list, stamped with the export time.
    pub fn export_data(&self) -> String {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct ExportPayload<'a> {
            events: &'a [PopularityEvent],
            stats: UsageStats,
            popular_queries: Vec<PopularQuery>,
            exported_at: String,
        }

        let payload = ExportPayload {
            events: &self.events,
            stats: self.stats(),
            popular_queries: self.popular_queries(EXPORT_QUERY_COUNT),
            exported_at: chrono::Utc::now().to_rfc3339(),
        };
        serde_json::to_string_pretty(&payload).unwrap_or_else(|_| String::from("{}"))
    }

    /// Drops every event.
    pub fn clear(&mut self) {
        self.events.clear();
        self.persist();
    }

    pub fn events(&self) -> &[PopularityEvent] {
        &self.events
    }

    /// Epoch milliseconds of this tracker's construction; the default
    /// statistics window starts here.
    pub fn session_start(&self) -> i64 {
        self.session_start
    }

    fn persist(&mut self) {
        let json = match serde_json::to_string(&self.events) {
            Ok(json) => json,
            Err(err) => {
                warn!(error = %err, "failed to serialize event log");
                return;
            }
        };
        if let Err(err) = self.storage.set_string(STORAGE_KEY, &json) {
            warn!(error = %err, "failed to persist event log");
        }
    }
}

fn size_field(meta: &Metadata, key: &str) -> u64 {
    meta.get(key).and_then(Value::as_f64).map(|size| size as u64).unwrap_or(0)
}

fn rate(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round_tenth(part as f64 / whole as f64 * 100.0)
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
