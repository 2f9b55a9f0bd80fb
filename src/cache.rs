use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::clock::{Clock, duration_ms};
use crate::metrics::CACHE_SWEPT;
use crate::models::FeatureType;
use crate::store::KeyValueStore;

/// Entries older than this are treated as absent: 365 days.
pub const DEFAULT_TTL: Duration = Duration::from_millis(365 * 24 * 60 * 60 * 1000);

// Cache entry with creation timestamp (epoch millis)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    pub timestamp: i64,
}

// Trim + lowercase so trivially different queries share an entry
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

// 32-bit rolling hash over UTF-16 code units, `hash * 31 + unit` with wrapping.
// The absolute value is rendered in base 36.
pub fn query_hash(normalized: &str) -> String {
    let hash = normalized.encode_utf16().fold(0i32, |hash, unit| {
        (hash << 5).wrapping_sub(hash).wrapping_add(i32::from(unit))
    });
    to_base36(u64::from(hash.unsigned_abs()))
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

pub fn cache_prefix(feature: FeatureType) -> String {
    format!("cache_{}_", feature)
}

// Create a cache key (feature tag + hash of the normalized query)
pub fn make_cache_key(feature: FeatureType, query: &str) -> String {
    format!(
        "{}{}",
        cache_prefix(feature),
        query_hash(&normalize_query(query))
    )
}

fn is_cache_key(key: &str) -> bool {
    FeatureType::ALL
        .iter()
        .any(|feature| key.starts_with(&cache_prefix(*feature)))
}

/// Read-through cache of parsed completion results, backed by a
/// [`KeyValueStore`]. Expired entries are evicted lazily when read; store
/// failures never reach the caller.
pub struct QueryCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    ttl_ms: i64,
}

impl QueryCache {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            ttl_ms: duration_ms(DEFAULT_TTL),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_ms = duration_ms(ttl);
        self
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms.unsigned_abs())
    }

    fn is_expired(&self, timestamp: i64, now: i64) -> bool {
        now.saturating_sub(timestamp) >= self.ttl_ms
    }

    /// Look up a cached result. Returns None if absent, expired, or unreadable.
    pub fn get<T: DeserializeOwned>(&self, feature: FeatureType, query: &str) -> Option<T> {
        let key = make_cache_key(feature, query);
        let raw = match self.store.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(%key, error = %e, "cache read failed");
                return None;
            }
        };

        let entry: CacheEntry<Value> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(%key, error = %e, "unreadable cache entry");
                return None;
            }
        };

        if self.is_expired(entry.timestamp, self.clock.now_ms()) {
            debug!(%key, "cache entry expired");
            if let Err(e) = self.store.delete(&key) {
                warn!(%key, error = %e, "failed to evict expired cache entry");
            }
            return None;
        }

        match serde_json::from_value(entry.data) {
            Ok(data) => Some(data),
            Err(e) => {
                warn!(%key, error = %e, "cache entry has unexpected shape");
                None
            }
        }
    }

    /// Store a result. On failure the write is dropped and expired entries
    /// are swept to free room for later writes.
    pub fn set<T: Serialize>(&self, feature: FeatureType, query: &str, data: &T) {
        let key = make_cache_key(feature, query);
        let entry = CacheEntry {
            data,
            timestamp: self.clock.now_ms(),
        };

        let result = serde_json::to_string(&entry)
            .map_err(Into::into)
            .and_then(|raw| self.store.set(&key, &raw));

        if let Err(e) = result {
            warn!(%key, error = %e, "cache write failed, sweeping expired entries");
            self.sweep_expired();
        }
    }

    /// Remove every expired or unparsable cache entry. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let keys = match self.store.keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "cache sweep could not list keys");
                return 0;
            }
        };
        let now = self.clock.now_ms();

        let doomed: Vec<String> = keys
            .into_iter()
            .filter(|key| is_cache_key(key))
            .filter(|key| match self.store.get(key) {
                Ok(Some(raw)) => match serde_json::from_str::<CacheEntry<Value>>(&raw) {
                    Ok(entry) => self.is_expired(entry.timestamp, now),
                    Err(_) => true,
                },
                Ok(None) => false,
                Err(e) => {
                    warn!(%key, error = %e, "cache sweep could not read entry");
                    false
                }
            })
            .collect();

        let removed = self.remove_all(&doomed);
        CACHE_SWEPT.inc_by(removed as f64);
        info!(removed, "cleared expired cache entries");
        removed
    }

    /// Remove every cache entry regardless of age. Rate-limit records are untouched.
    pub fn clear_all(&self) -> usize {
        let keys = match self.store.keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "cache clear could not list keys");
                return 0;
            }
        };
        let doomed: Vec<String> = keys.into_iter().filter(|key| is_cache_key(key)).collect();

        let removed = self.remove_all(&doomed);
        info!(removed, "cleared cache entries");
        removed
    }

    fn remove_all(&self, keys: &[String]) -> usize {
        keys.iter()
            .filter(|key| match self.store.delete(key) {
                Ok(()) => true,
                Err(e) => {
                    warn!(%key, error = %e, "failed to remove cache entry");
                    false
                }
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000_000;

    fn fixture() -> (Arc<MemoryStore>, Arc<ManualClock>, QueryCache) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(NOW));
        let cache = QueryCache::new(store.clone(), clock.clone());
        (store, clock, cache)
    }

    fn ttl_ms() -> i64 {
        duration_ms(DEFAULT_TTL)
    }

    #[test]
    fn hash_matches_known_values() {
        assert_eq!(query_hash(""), "0");
        assert_eq!(query_hash("a"), "2p");
        assert_eq!(query_hash("ab"), "2e9");
        assert_eq!(query_hash("hello"), "1n1e4y");
        assert_eq!(query_hash("break a leg"), "15uglu");
        assert_eq!(query_hash("日本"), "hwbr");
    }

    #[test]
    fn keys_ignore_case_and_surrounding_whitespace() {
        let key = make_cache_key(FeatureType::Phrase, "Break a Leg");
        assert_eq!(key, "cache_phrase_15uglu");
        assert_eq!(make_cache_key(FeatureType::Phrase, "  break a leg\n"), key);
        assert_eq!(make_cache_key(FeatureType::Phrase, "BREAK A LEG"), key);
        assert_ne!(make_cache_key(FeatureType::Writing, "break a leg"), key);
    }

    #[test]
    fn set_then_get_returns_the_same_payload() {
        let (_, _, cache) = fixture();
        let data = json!({"phrase": "hola", "examples": [{"sentence": "¡Hola!"}], "inflections": null});

        cache.set(FeatureType::Phrase, "hola", &data);

        assert_eq!(cache.get::<Value>(FeatureType::Phrase, " HOLA "), Some(data));
        assert_eq!(cache.get::<Value>(FeatureType::Writing, "hola"), None);
    }

    #[test]
    fn stored_entries_use_the_documented_layout() {
        let (store, _, cache) = fixture();
        cache.set(FeatureType::Writing, "hello", &json!({"summary": "hi"}));

        let raw = store.get("cache_writing_1n1e4y").unwrap().unwrap();
        let stored: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored, json!({"data": {"summary": "hi"}, "timestamp": NOW}));
    }

    #[test]
    fn expired_entry_is_absent_and_evicted_on_read() {
        let (store, _, cache) = fixture();
        let key = make_cache_key(FeatureType::Phrase, "old");
        store
            .set(&key, &json!({"data": 1, "timestamp": NOW - ttl_ms() - 1}).to_string())
            .unwrap();

        assert_eq!(cache.get::<Value>(FeatureType::Phrase, "old"), None);
        assert_eq!(store.get(&key).unwrap(), None);
    }

    #[test]
    fn entry_expires_exactly_at_ttl() {
        let (_, clock, cache) = fixture();
        cache.set(FeatureType::Panglish, "telephone", &json!({"translation": "far speaker"}));

        clock.advance(DEFAULT_TTL - Duration::from_millis(1));
        assert!(cache.get::<Value>(FeatureType::Panglish, "telephone").is_some());

        clock.advance(Duration::from_millis(1));
        assert!(cache.get::<Value>(FeatureType::Panglish, "telephone").is_none());
    }

    #[test]
    fn corrupt_entry_reads_as_miss_but_stays_until_swept() {
        let (store, _, cache) = fixture();
        let key = make_cache_key(FeatureType::Phrase, "broken");
        store.set(&key, "{not json").unwrap();

        assert_eq!(cache.get::<Value>(FeatureType::Phrase, "broken"), None);
        assert!(store.get(&key).unwrap().is_some());
    }

    #[test]
    fn extreme_timestamps_do_not_overflow() {
        let (store, _, cache) = fixture();
        let ancient = make_cache_key(FeatureType::Phrase, "ancient");
        let future = make_cache_key(FeatureType::Writing, "future");
        store
            .set(&ancient, &json!({"data": 1, "timestamp": i64::MIN}).to_string())
            .unwrap();
        store
            .set(&future, &json!({"data": 2, "timestamp": i64::MAX}).to_string())
            .unwrap();

        assert_eq!(cache.get::<Value>(FeatureType::Phrase, "ancient"), None);
        assert_eq!(store.get(&ancient).unwrap(), None);
        assert_eq!(cache.get::<Value>(FeatureType::Writing, "future"), Some(json!(2)));

        store
            .set(&ancient, &json!({"data": 1, "timestamp": i64::MIN}).to_string())
            .unwrap();
        assert_eq!(cache.sweep_expired(), 1);
        assert!(store.get(&future).unwrap().is_some());
    }

    #[test]
    fn oversized_ttl_never_expires() {
        let (_, clock, cache) = fixture();
        let cache = cache.with_ttl(Duration::MAX);
        cache.set(FeatureType::Phrase, "forever", &json!("kept"));
        clock.advance(DEFAULT_TTL * 100);
        assert_eq!(cache.get::<Value>(FeatureType::Phrase, "forever"), Some(json!("kept")));
    }

    #[test]
    fn sweep_removes_only_expired_and_corrupt_entries() {
        let (store, _, cache) = fixture();
        cache.set(FeatureType::Phrase, "fresh", &json!({"ok": true}));
        cache.set(FeatureType::Writing, "also fresh", &json!({"ok": true}));
        store
            .set(
                &make_cache_key(FeatureType::Phrase, "stale"),
                &json!({"data": {}, "timestamp": NOW - ttl_ms()}).to_string(),
            )
            .unwrap();
        store
            .set(
                &make_cache_key(FeatureType::Panglish, "stale"),
                &json!({"data": {}, "timestamp": 0}).to_string(),
            )
            .unwrap();
        store
            .set(&make_cache_key(FeatureType::Writing, "garbage"), "][")
            .unwrap();
        store
            .set(&make_cache_key(FeatureType::Writing, "no timestamp"), r#"{"data":1}"#)
            .unwrap();
        store.set("rateLimit_phrase", "0").unwrap();
        store.set("unrelated", "][").unwrap();

        assert_eq!(cache.sweep_expired(), 4);

        assert_eq!(store.len(), 4);
        assert!(cache.get::<Value>(FeatureType::Phrase, "fresh").is_some());
        assert!(cache.get::<Value>(FeatureType::Writing, "also fresh").is_some());
        assert!(store.get("rateLimit_phrase").unwrap().is_some());
        assert!(store.get("unrelated").unwrap().is_some());
        assert_eq!(cache.sweep_expired(), 0);
    }

    #[test]
    fn clear_all_removes_cache_entries_of_every_age() {
        let (store, clock, cache) = fixture();
        cache.set(FeatureType::Phrase, "one", &json!(1));
        clock.advance(DEFAULT_TTL);
        cache.set(FeatureType::Writing, "two", &json!(2));
        cache.set(FeatureType::Panglish, "three", &json!(3));
        store.set("rateLimit_writing", "0").unwrap();

        assert_eq!(cache.clear_all(), 3);
        assert_eq!(store.keys().unwrap(), vec!["rateLimit_writing".to_string()]);
    }

    #[test]
    fn later_write_to_the_same_key_wins() {
        let (_, _, cache) = fixture();
        cache.set(FeatureType::Phrase, "Tab One", &json!({"from": "first"}));
        cache.set(FeatureType::Phrase, "tab one", &json!({"from": "second"}));

        assert_eq!(
            cache.get::<Value>(FeatureType::Phrase, "TAB ONE"),
            Some(json!({"from": "second"}))
        );
    }

    #[test]
    fn failed_write_sweeps_expired_entries_to_free_room() {
        let store = Arc::new(MemoryStore::with_max_entries(2));
        let clock = Arc::new(ManualClock::new(NOW));
        let cache = QueryCache::new(store.clone(), clock.clone());

        cache.set(FeatureType::Phrase, "first", &json!(1));
        cache.set(FeatureType::Phrase, "second", &json!(2));
        clock.advance(DEFAULT_TTL);

        // store is full: this write is dropped, but the sweep empties it
        cache.set(FeatureType::Phrase, "third", &json!(3));
        assert_eq!(cache.get::<Value>(FeatureType::Phrase, "third"), None);
        assert!(store.is_empty());

        cache.set(FeatureType::Phrase, "third", &json!(3));
        assert_eq!(cache.get::<Value>(FeatureType::Phrase, "third"), Some(json!(3)));
    }

    #[test]
    fn typed_reads_treat_shape_mismatch_as_miss() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct Translation {
            translation: String,
            explanation: String,
        }

        let (_, _, cache) = fixture();
        cache.set(
            FeatureType::Panglish,
            "panda",
            &json!({"translation": "bear cat", "explanation": "calque"}),
        );
        cache.set(FeatureType::Panglish, "task", &json!({"translation": 7}));

        assert_eq!(
            cache.get::<Translation>(FeatureType::Panglish, "panda"),
            Some(Translation {
                translation: "bear cat".into(),
                explanation: "calque".into(),
            })
        );
        assert_eq!(cache.get::<Translation>(FeatureType::Panglish, "task"), None);
    }
}
