use std::sync::Arc;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::{debug, info};
use crate::cache::QueryCache;

// Periodic expired-entry sweep. Reads still evict lazily; this only keeps
// entries that are never read again from piling up.
pub async fn sweeper(cache: Arc<QueryCache>, sweep_interval: Duration) {
    let mut interval = interval(sweep_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(interval = ?sweep_interval, "cache sweeper started");

    // first tick completes immediately
    interval.tick().await;

    loop {
        interval.tick().await;
        let removed = cache.sweep_expired();
        debug!(removed, "periodic cache sweep finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DEFAULT_TTL;
    use crate::clock::ManualClock;
    use crate::models::FeatureType;
    use crate::store::{KeyValueStore, MemoryStore};

    #[tokio::test(start_paused = true)]
    async fn sweeps_on_every_tick() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(0));
        let cache = Arc::new(QueryCache::new(store.clone(), clock.clone()));

        cache.set(FeatureType::Phrase, "old", &serde_json::json!(1));
        clock.advance(DEFAULT_TTL);

        let task = tokio::spawn(sweeper(cache, Duration::from_secs(60)));
        tokio::time::sleep(Duration::from_secs(61)).await;

        assert!(store.keys().unwrap().is_empty());
        task.abort();
    }
}
