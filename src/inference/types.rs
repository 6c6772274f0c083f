//! Shared types for the hosted inference endpoints.

use crate::retry::ErrorClass;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned while calling a hosted model endpoint.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid inference URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before a usable response arrived.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The model behind the endpoint is still cold-starting.
    #[error("Model is still loading: {0}")]
    ModelLoading(String),
    /// Endpoint responded with an unexpected status code.
    #[error("Unexpected inference response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the endpoint.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Response parsed but did not match the documented shape.
    #[error("Malformed inference response: {0}")]
    MalformedResponse(String),
}

impl InferenceError {
    /// Classify this failure for the retry loop.
    ///
    /// Retryable: HTTP 503 and cold-start "loading" bodies. Everything else, including
    /// 4xx responses and shape mismatches, is fatal.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::ModelLoading(_) => ErrorClass::Transient,
            Self::UnexpectedStatus { status, .. }
                if *status == StatusCode::SERVICE_UNAVAILABLE =>
            {
                ErrorClass::Transient
            }
            _ => ErrorClass::Fatal,
        }
    }
}

/// Generation parameters sent with every summarization request.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct GenerationParams {
    /// Upper token bound for each chunk summary.
    pub max_length: u32,
    /// Lower token bound for each chunk summary.
    pub min_length: u32,
    /// Whether the endpoint samples instead of decoding greedily.
    pub do_sample: bool,
    /// Sampling pool restricted to the top-k logits.
    pub top_k: u32,
    /// Nucleus sampling cumulative probability threshold.
    pub top_p: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_length: 200,
            min_length: 50,
            do_sample: true,
            top_k: 50,
            top_p: 0.95,
        }
    }
}

/// One element of a captioning response: `[{"generated_text": "..."}]`.
#[derive(Debug, Deserialize)]
pub(crate) struct CaptionResponse {
    pub generated_text: String,
}

/// One element of a summarization response: `[{"summary_text": "..."}]`.
#[derive(Debug, Deserialize)]
pub(crate) struct SummaryResponse {
    pub summary_text: String,
}

/// Extractive QA response body: `{"answer": "..."}`.
#[derive(Debug, Deserialize)]
pub(crate) struct AnswerResponse {
    pub answer: String,
}
