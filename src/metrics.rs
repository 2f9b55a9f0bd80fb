use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Histogram, register_counter, register_counter_vec, register_histogram};


lazy_static! {
    pub static ref REQUEST_TOTAL: CounterVec = register_counter_vec!(
        "keywords_requests_total",
        "Total number of submissions",
        &["feature"]
    )
    .unwrap();
    pub static ref CACHE_HITS: Counter =
        register_counter!("keywords_cache_hits_total", "Total cache hits").unwrap();
    pub static ref CACHE_MISSES: Counter =
        register_counter!("keywords_cache_misses_total", "Total cache misses").unwrap();
    pub static ref RATE_LIMITED: CounterVec = register_counter_vec!(
        "keywords_rate_limited_total",
        "Submissions rejected by the cooldown",
        &["feature"]
    )
    .unwrap();
    pub static ref COMPLETION_FAILURES: Counter = register_counter!(
        "keywords_completion_failures_total",
        "Completion calls that failed or returned unusable JSON"
    )
    .unwrap();
    pub static ref CACHE_SWEPT: Counter = register_counter!(
        "keywords_cache_swept_total",
        "Cache entries removed by sweeps"
    )
    .unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "keywords_request_latency_seconds",
        "Request latency in seconds"
    )
    .unwrap();
}
