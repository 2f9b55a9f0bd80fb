use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::error::CompletionError;

// Feature tag shared by the cache and the rate limiter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureType {
    Phrase,
    Writing,
    Panglish,
}

impl FeatureType {
    pub const ALL: [FeatureType; 3] = [
        FeatureType::Phrase,
        FeatureType::Writing,
        FeatureType::Panglish,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureType::Phrase => "phrase",
            FeatureType::Writing => "writing",
            FeatureType::Panglish => "panglish",
        }
    }

    /// Whether submissions for this feature go through the rate limiter.
    /// The translator is cached but never throttled.
    pub fn is_throttled(&self) -> bool {
        !matches!(self, FeatureType::Panglish)
    }

    pub fn max_words(&self) -> usize {
        match self {
            FeatureType::Phrase => 10,
            FeatureType::Writing => 50,
            FeatureType::Panglish => 20,
        }
    }

    pub fn input_label(&self) -> &'static str {
        match self {
            FeatureType::Phrase => "Phrase",
            FeatureType::Writing => "Text",
            FeatureType::Panglish => "Query",
        }
    }

    // Noun used in the "please wait" message
    pub fn subject(&self) -> &'static str {
        match self {
            FeatureType::Phrase => "phrase",
            FeatureType::Writing => "text sample",
            FeatureType::Panglish => "translation",
        }
    }

    pub fn failure_message(&self) -> &'static str {
        match self {
            FeatureType::Phrase => "Failed to analyze phrase. Please try again.",
            FeatureType::Writing => "Failed to analyze writing. Please try again.",
            FeatureType::Panglish => "Failed to generate translation",
        }
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureType::ALL
            .into_iter()
            .find(|feature| feature.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

// Request bodies, one per feature. Field names follow the website's forms.
#[derive(Deserialize, Default)]
pub struct PhraseRequest {
    #[serde(default)]
    pub phrase: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct WritingRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct PanglishRequest {
    #[serde(default)]
    pub query: Option<String>,
}

// What the worker hands back for a submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub feature: FeatureType,
    pub cached: bool,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub feature: FeatureType,
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_remaining_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub removed: usize,
}

// Batched request - holds the submission, its cancellation token and the response channel
pub struct BatchedRequest {
    pub feature: FeatureType,
    pub query: String,
    pub cancel: CancellationToken,
    pub response_tx: oneshot::Sender<Result<AnalysisResponse, CompletionError>>,
}
