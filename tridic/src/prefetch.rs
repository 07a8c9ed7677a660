//! Cache warming decisions.
//!
//! Pure planning helpers over the tracker and the cache: which popular
//! queries the cache cannot serve yet, and whether warming them is worth
//! it this session. Actually fetching provider answers is host business.

use serde::Serialize;

use crate::analytics::{PopularQuery, PopularityTracker};
use crate::cache::ResponseCache;
use crate::storage::KeyValueStorage;

/// Default number of popular queries a warming pass considers.
pub const DEFAULT_PREFETCH_ITEMS: usize = 20;

/// Sessions with fewer searches than this never prefetch.
const MIN_SESSION_SEARCHES: usize = 10;

/// Prefetch only while the session cache-hit rate sits below this.
const MAX_WARM_HIT_RATE: f64 = 50.0;

/// How many popular queries the coverage report scans.
const COVERAGE_SCAN: usize = 50;

/// Cache coverage of the most popular queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefetchStats {
    pub popular_queries: usize,
    pub already_cached: usize,
    pub to_be_prefetched: usize,
}

/// The top `max_items` popular queries the cache cannot serve, most
/// popular first. Fuzzy-aware: a query some existing entry already matches
/// needs no warming.
pub fn prefetch_list<S: KeyValueStorage>(
    tracker: &PopularityTracker<S>,
    cache: &ResponseCache<S>,
    max_items: usize,
) -> Vec<PopularQuery> {
    tracker
        .popular_queries(max_items)
        .into_iter()
        .filter(|popular| cache.find_by_query(&popular.query).is_none())
        .collect()
}

/// Whether warming is worth it: a session with real search volume whose
/// cache serves less than half of it.
pub fn should_prefetch<S: KeyValueStorage>(tracker: &PopularityTracker<S>) -> bool {
    let stats = tracker.stats();
    stats.total_searches >= MIN_SESSION_SEARCHES && stats.cache_hit_rate < MAX_WARM_HIT_RATE
}

/// Coverage of the top popular queries.
pub fn prefetch_stats<S: KeyValueStorage>(
    tracker: &PopularityTracker<S>,
    cache: &ResponseCache<S>,
) -> PrefetchStats {
    let popular = tracker.popular_queries(COVERAGE_SCAN);
    let already_cached = popular
        .iter()
        .filter(|popular| cache.find_by_query(&popular.query).is_some())
        .count();
    PrefetchStats {
        popular_queries: popular.len(),
        already_cached,
        to_be_prefetched: popular.len() - already_cached,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{EventKind, Metadata};
    use crate::models::{ProviderAnswer, WasteCategory};
    use crate::storage::MemoryStorage;
    use serde_json::Value;

    fn tracker() -> PopularityTracker<MemoryStorage> {
        PopularityTracker::new(MemoryStorage::new())
    }

    fn cache() -> ResponseCache<MemoryStorage> {
        ResponseCache::new(MemoryStorage::new())
    }

    fn searched(tracker: &mut PopularityTracker<MemoryStorage>, kind: EventKind, query: &str) {
        let mut meta = Metadata::new();
        meta.insert("query".to_string(), Value::from(query));
        tracker.track_with(kind, meta);
    }

    fn cached(cache: &mut ResponseCache<MemoryStorage>, name: &str, query: &str) {
        let answer =
            ProviderAnswer { name: name.to_string(), category: WasteCategory::Plast, note: None };
        cache.add(&answer, Some(query), None);
    }

    // ── prefetch_list tests ──────────────────────────────────────

    #[test]
    fn test_list_skips_queries_the_cache_already_serves() {
        let mut tracker = tracker();
        for _ in 0..3 {
            searched(&mut tracker, EventKind::SearchAiCall, "plechovka");
        }
        searched(&mut tracker, EventKind::SearchAiCall, "sklenice");
        searched(&mut tracker, EventKind::SearchAiCall, "lahve");

        let mut cache = cache();
        cached(&mut cache, "Sklenice", "sklenice");
        // fuzzy coverage: "lahve" resolves against this entry's query
        cached(&mut cache, "PET láhev", "pet lahev");

        let list = prefetch_list(&tracker, &cache, DEFAULT_PREFETCH_ITEMS);
        let queries: Vec<&str> = list.iter().map(|popular| popular.query.as_str()).collect();
        assert_eq!(queries, vec!["plechovka"]);
    }

    #[test]
    fn test_list_limit_applies_before_coverage_filter() {
        let mut tracker = tracker();
        let by_popularity = ["plechovka", "sklenice", "noviny", "kelimek", "alobal"];
        for (rank, query) in by_popularity.iter().enumerate() {
            for _ in 0..(by_popularity.len() - rank) {
                searched(&mut tracker, EventKind::SearchAiCall, query);
            }
        }

        let mut cache = cache();
        cached(&mut cache, "Plechovka", "plechovka");
        cached(&mut cache, "Sklenice", "sklenice");
        cached(&mut cache, "Noviny", "noviny");

        // the top three are all covered, so a three-item pass finds nothing
        assert!(prefetch_list(&tracker, &cache, 3).is_empty());

        let wider: Vec<String> = prefetch_list(&tracker, &cache, 5)
            .into_iter()
            .map(|popular| popular.query)
            .collect();
        assert_eq!(wider, vec!["kelimek".to_string(), "alobal".to_string()]);
    }

    // ── should_prefetch tests ────────────────────────────────────

    #[test]
    fn test_quiet_sessions_never_prefetch() {
        let mut tracker = tracker();
        for _ in 0..9 {
            searched(&mut tracker, EventKind::SearchAiCall, "plechovka");
        }
        assert!(!should_prefetch(&tracker));
    }

    #[test]
    fn test_busy_session_with_cold_cache_prefetches() {
        let mut tracker = tracker();
        for _ in 0..10 {
            searched(&mut tracker, EventKind::SearchAiCall, "plechovka");
        }
        assert!(should_prefetch(&tracker));

        // push the hit rate to exactly 50%: no longer worth warming
        for _ in 0..10 {
            searched(&mut tracker, EventKind::SearchCacheHit, "plechovka");
        }
        assert!(!should_prefetch(&tracker));
    }

    // ── prefetch_stats tests ─────────────────────────────────────

    #[test]
    fn test_stats_report_coverage() {
        let mut tracker = tracker();
        searched(&mut tracker, EventKind::SearchAiCall, "plechovka");
        searched(&mut tracker, EventKind::SearchAiCall, "sklenice");

        let mut cache = cache();
        cached(&mut cache, "Sklenice", "sklenice");

        let stats = prefetch_stats(&tracker, &cache);
        assert_eq!(
            stats,
            PrefetchStats { popular_queries: 2, already_cached: 1, to_be_prefetched: 1 },
        );
    }
}
