use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use crate::cache::QueryCache;
use crate::error::CompletionError;
use crate::llm::{Completion, parse_json_reply};
use crate::metrics::{CACHE_HITS, CACHE_MISSES, COMPLETION_FAILURES};
use crate::models::{AnalysisResponse, BatchedRequest};
use crate::prompts;


pub async fn batch_worker(
    mut rx: mpsc::Receiver<BatchedRequest>,
    cache: Arc<QueryCache>,
    completion: Arc<dyn Completion>,
) {
    info!("batch worker started, processing submissions sequentially");

    // keep receiving submissions from the queue
    while let Some(batched_req) = rx.recv().await {
        let BatchedRequest { feature, query, cancel, response_tx } = batched_req;

        if cancel.is_cancelled() {
            debug!(%feature, "submission abandoned before processing");
            continue;
        }

        // check cache first
        if let Some(data) = cache.get(feature, &query) {
            CACHE_HITS.inc();
            debug!(%feature, "cache hit");
            let _ = response_tx.send(Ok(AnalysisResponse { feature, cached: true, data }));
            continue;
        }
        CACHE_MISSES.inc();
        debug!(%feature, "cache miss, calling completion service");

        let request = prompts::build(feature, &query);
        let result = completion
            .complete(&request, &cancel)
            .await
            .and_then(|reply| parse_json_reply(&reply));

        let response = match result {
            Ok(data) => {
                cache.set(feature, &query, &data);
                Ok(AnalysisResponse { feature, cached: false, data })
            }
            Err(CompletionError::Cancelled) => {
                debug!(%feature, "completion cancelled by client");
                Err(CompletionError::Cancelled)
            }
            Err(e) => {
                COMPLETION_FAILURES.inc();
                error!(%feature, error = %e, "completion failed");
                Err(e)
            }
        };
        // send response back to the handler
        let _ = response_tx.send(response);
    }

    info!("batch worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::llm::CompletionRequest;
    use crate::models::FeatureType;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;
    use tokio_util::sync::CancellationToken;

    // Replies `{"ok":true}`, except for prompts mentioning "hang", which wait
    // for cancellation.
    #[derive(Default)]
    struct Scripted {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Completion for Scripted {
        async fn complete(
            &self,
            request: &CompletionRequest,
            cancel: &CancellationToken,
        ) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if request.prompt.contains("hang") {
                cancel.cancelled().await;
                return Err(CompletionError::Cancelled);
            }
            Ok(r#"{"ok":true}"#.to_string())
        }
    }

    type Reply = oneshot::Receiver<Result<AnalysisResponse, CompletionError>>;

    fn submission(query: &str, cancel: &CancellationToken) -> (BatchedRequest, Reply) {
        let (response_tx, response_rx) = oneshot::channel();
        let req = BatchedRequest {
            feature: FeatureType::Panglish,
            query: query.to_string(),
            cancel: cancel.clone(),
            response_tx,
        };
        (req, response_rx)
    }

    fn spawn_worker() -> (mpsc::Sender<BatchedRequest>, Arc<QueryCache>, Arc<Scripted>) {
        let cache = Arc::new(QueryCache::new(
            Arc::new(MemoryStore::new()),
            Arc::new(ManualClock::new(0)),
        ));
        let completion = Arc::new(Scripted::default());
        let (tx, rx) = mpsc::channel(8);
        tokio::spawn(batch_worker(rx, cache.clone(), completion.clone()));
        (tx, cache, completion)
    }

    #[tokio::test]
    async fn abandoned_submission_is_skipped() {
        let (tx, _, completion) = spawn_worker();

        let abandoned = CancellationToken::new();
        abandoned.cancel();
        let (req, skipped) = submission("gone", &abandoned);
        tx.send(req).await.unwrap();

        let (req, served) = submission("kept", &CancellationToken::new());
        tx.send(req).await.unwrap();

        assert!(skipped.await.is_err());
        assert!(served.await.unwrap().is_ok());
        assert_eq!(completion.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancelled_call_is_not_cached_and_worker_moves_on() {
        let (tx, cache, _) = spawn_worker();

        let cancel = CancellationToken::new();
        let (req, hung) = submission("hang on", &cancel);
        tx.send(req).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        cancel.cancel();

        assert!(matches!(hung.await.unwrap(), Err(CompletionError::Cancelled)));
        assert_eq!(cache.get::<Value>(FeatureType::Panglish, "hang on"), None);

        let (req, next) = submission("next", &CancellationToken::new());
        tx.send(req).await.unwrap();
        let response = next.await.unwrap().unwrap();
        assert!(!response.cached);
        assert_eq!(response.data, json!({"ok": true}));
    }
}
