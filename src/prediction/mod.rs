//! Client for the external prediction service: therapy pathline scoring
//! and free-text treatment narratives.
//!
//! Calls are synchronous (`reqwest::blocking`); async callers run them
//! inside `tokio::task::spawn_blocking`.

pub mod client;
pub mod types;

use thiserror::Error;

pub use client::{HttpPredictionClient, MockPredictionClient};
pub use types::*;

#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("Prediction service is not reachable at {0}")]
    Connection(String),

    #[error("Prediction request timed out after {0}s")]
    Timeout(u64),

    #[error("Prediction service returned error (status {status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Failed to parse prediction response: {0}")]
    ResponseParsing(String),
}

/// Seam between the API and the prediction service.
pub trait PredictionClient: Send + Sync {
    fn therapy_pathline(&self, features: &PathlineFeatures) -> Result<PathlineResult, PredictionError>;

    fn treatment_recommendation(&self, query: &TreatmentQuery) -> Result<TreatmentReply, PredictionError>;

    fn treatment_chat(&self, query: &TreatmentQuery) -> Result<TreatmentReply, PredictionError>;
}
