use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::models::FeatureType;
use crate::rate_limit::format_remaining;

/// Failures of the backing key-value store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store quota exceeded (limit {limit})")]
    QuotaExceeded { limit: usize },
}

/// Failures talking to the completion service or reading its reply.
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("completion service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("no response from AI")]
    EmptyReply,

    #[error("reply is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("reply is JSON but not an object")]
    NotAnObject,

    #[error("request cancelled")]
    Cancelled,
}

/// Errors surfaced by the HTTP handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{} is required", .0.input_label())]
    MissingInput(FeatureType),

    #[error("{} exceeds {limit} word limit", .feature.input_label())]
    TooManyWords { feature: FeatureType, limit: usize },

    #[error("{}", wait_message(.feature, .remaining_secs))]
    RateLimited {
        feature: FeatureType,
        remaining_secs: u64,
    },

    #[error("{}", .feature.failure_message())]
    Completion {
        feature: FeatureType,
        #[source]
        source: CompletionError,
    },

    #[error("unknown feature: {0}")]
    UnknownFeature(String),

    #[error("analysis worker is unavailable")]
    WorkerUnavailable,

    #[error("unauthorized")]
    Unauthorized,
}

fn wait_message(feature: &FeatureType, remaining_secs: &u64) -> String {
    format!(
        "Please wait {} before analyzing another {}.",
        format_remaining(*remaining_secs),
        feature.subject()
    )
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingInput(_) | ApiError::TooManyWords { .. } => StatusCode::BAD_REQUEST,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Completion { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::UnknownFeature(_) => StatusCode::NOT_FOUND,
            ApiError::WorkerUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = serde_json::json!({ "error": self.to_string() });
        match &self {
            ApiError::Completion { source, .. } => {
                body["details"] = source.to_string().into();
            }
            ApiError::RateLimited { remaining_secs, .. } => {
                body["retry_after_secs"] = (*remaining_secs).into();
            }
            _ => {}
        }

        let mut response = (status, Json(body)).into_response();
        if let ApiError::RateLimited { remaining_secs, .. } = self {
            if let Ok(value) = HeaderValue::from_str(&remaining_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
