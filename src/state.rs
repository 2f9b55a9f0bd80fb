use std::sync::Arc;
use tokio::sync::mpsc;
use crate::cache::QueryCache;
use crate::clock::Clock;
use crate::llm::Completion;
use crate::models::BatchedRequest;
use crate::rate_limit::RateLimiter;
use crate::store::KeyValueStore;
use crate::worker::batch_worker;

// app's shared state
pub struct AppState {
    pub cache: Arc<QueryCache>,
    pub rate_limiter: RateLimiter,
    pub batch_tx: mpsc::Sender<BatchedRequest>,
    pub admin_token: Option<String>,
}

// Everything needed to assemble the state
pub struct Components {
    pub store: Arc<dyn KeyValueStore>,
    pub clock: Arc<dyn Clock>,
    pub completion: Arc<dyn Completion>,
    pub cache_ttl: std::time::Duration,
    pub cooldown: std::time::Duration,
    pub queue_depth: usize,
    pub admin_token: Option<String>,
}

impl AppState {
    /// Build the state and spawn the batch worker. Must run inside a Tokio runtime.
    pub fn start(components: Components) -> Arc<Self> {
        let Components {
            store,
            clock,
            completion,
            cache_ttl,
            cooldown,
            queue_depth,
            admin_token,
        } = components;

        let cache = Arc::new(QueryCache::new(store.clone(), clock.clone()).with_ttl(cache_ttl));
        let rate_limiter = RateLimiter::new(store, clock).with_cooldown(cooldown);
        let (batch_tx, batch_rx) = mpsc::channel::<BatchedRequest>(queue_depth.max(1));

        tokio::spawn(batch_worker(batch_rx, Arc::clone(&cache), completion));

        Arc::new(Self {
            cache,
            rate_limiter,
            batch_tx,
            admin_token,
        })
    }
}
