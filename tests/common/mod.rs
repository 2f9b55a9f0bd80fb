//! Shared helpers: a gateway on an ephemeral port, backed by a wiremock
//! completion endpoint and a manual clock.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use keywords_gateway::clock::ManualClock;
use keywords_gateway::handlers::router;
use keywords_gateway::llm::GroqClient;
use keywords_gateway::state::{AppState, Components};
use keywords_gateway::store::KeyValueStore;
use serde_json::{Value, json};
use wiremock::MockServer;

pub const START_MS: i64 = 1_700_000_000_000;

pub struct TestGateway {
    pub base_url: String,
    pub clock: Arc<ManualClock>,
    pub state: Arc<AppState>,
    pub http: reqwest::Client,
}

impl TestGateway {
    pub async fn start(
        llm: &MockServer,
        store: Arc<dyn KeyValueStore>,
        admin_token: Option<&str>,
    ) -> Self {
        let clock = Arc::new(ManualClock::new(START_MS));
        let completion = GroqClient::new("test-key")
            .expect("client builds")
            .with_base_url(llm.uri());

        let state = AppState::start(Components {
            store,
            clock: clock.clone(),
            completion: Arc::new(completion),
            cache_ttl: Duration::from_secs(365 * 24 * 60 * 60),
            cooldown: Duration::from_secs(300),
            queue_depth: 8,
            admin_token: admin_token.map(str::to_string),
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        let app = router(Arc::clone(&state));
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("server runs");
        });

        Self {
            base_url: format!("http://{addr}"),
            clock,
            state,
            http: reqwest::Client::new(),
        }
    }

    pub async fn post(&self, path: &str, body: Value) -> reqwest::Response {
        self.http
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await
            .expect("request reaches gateway")
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.http
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("request reaches gateway")
    }
}

/// A chat-completion body whose first choice carries `content`.
pub fn completion_body(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 20, "total_tokens": 30}
    })
}
