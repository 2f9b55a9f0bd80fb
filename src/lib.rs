//! Caching, rate-limited gateway in front of an LLM completion service.
//!
//! Three features share it: phrase etymology (`phrase`), writing difficulty
//! (`writing`) and the Germanic-roots translator (`panglish`). Every
//! submission passes a per-feature cooldown ([`rate_limit::RateLimiter`]),
//! then a one-year query cache ([`cache::QueryCache`]), and only on a miss
//! reaches the completion service. Both components keep their state in an
//! injected [`store::KeyValueStore`].

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod llm;
pub mod metrics;
pub mod models;
pub mod prompts;
pub mod rate_limit;
pub mod state;
pub mod store;
pub mod sweeper;
pub mod worker;
