use axum::{Json, extract::{Path, State}};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::info;
use crate::error::{ApiError, CompletionError};
use crate::metrics::{RATE_LIMITED, REQUEST_LATENCY, REQUEST_TOTAL};
use crate::models::{
    AnalysisResponse, BatchedRequest, FeatureType, PanglishRequest, PhraseRequest,
    RateLimitStatus, WritingRequest,
};
use crate::rate_limit::{Admission, format_remaining};
use crate::state::AppState;

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

// Validate, gate on the cooldown, then hand the submission to the worker
async fn submit(
    state: &AppState,
    feature: FeatureType,
    input: Option<String>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    REQUEST_TOTAL.with_label_values(&[feature.as_str()]).inc();

    let query = input
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .ok_or(ApiError::MissingInput(feature))?;

    let limit = feature.max_words();
    if word_count(&query) > limit {
        return Err(ApiError::TooManyWords { feature, limit });
    }

    if feature.is_throttled() {
        if let Admission::Throttled { remaining_secs } = state.rate_limiter.try_admit(feature) {
            RATE_LIMITED.with_label_values(&[feature.as_str()]).inc();
            info!(%feature, remaining_secs, "submission rejected by cooldown");
            return Err(ApiError::RateLimited { feature, remaining_secs });
        }
    }

    let start_time = Instant::now();

    // cancelled if this handler is dropped (client went away)
    let cancel = CancellationToken::new();
    let _abandon_guard = cancel.clone().drop_guard();

    let (response_tx, response_rx) = oneshot::channel();

    let batched = BatchedRequest {
        feature,
        query,
        cancel,
        response_tx,
    };

    state.batch_tx.send(batched).await
        .map_err(|_| ApiError::WorkerUnavailable)?;

    // wait for response from worker
    let result = response_rx.await
        .map_err(|_| ApiError::WorkerUnavailable)?;

    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());

    result
        .map(Json)
        .map_err(|source: CompletionError| ApiError::Completion { feature, source })
}

pub async fn analyze_phrase_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PhraseRequest>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    submit(&state, FeatureType::Phrase, payload.phrase).await
}

pub async fn analyze_writing_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<WritingRequest>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    submit(&state, FeatureType::Writing, payload.text).await
}

pub async fn panglish_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PanglishRequest>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    submit(&state, FeatureType::Panglish, payload.query).await
}

// Read-only view of the cooldown, for showing a countdown before submitting
pub async fn rate_limit_handler(
    State(state): State<Arc<AppState>>,
    Path(feature): Path<String>,
) -> Result<Json<RateLimitStatus>, ApiError> {
    let feature: FeatureType = feature.parse().map_err(ApiError::UnknownFeature)?;

    let admission = if feature.is_throttled() {
        state.rate_limiter.check(feature)
    } else {
        Admission::Allowed
    };

    Ok(Json(RateLimitStatus {
        feature,
        allowed: admission.is_allowed(),
        time_remaining_secs: admission.remaining_secs(),
        message: admission.remaining_secs().map(format_remaining),
    }))
}
