use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::types::{PathlineFeatures, PathlineResult, TreatmentQuery, TreatmentReply};
use super::{PredictionClient, PredictionError};

/// HTTP client for the prediction service.
///
/// The blocking `reqwest` client is built per call so this type can be
/// created and dropped on async threads.
pub struct HttpPredictionClient {
    base_url: String,
    timeout: Duration,
}

impl HttpPredictionClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn post_json<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, PredictionError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| PredictionError::HttpClient(e.to_string()))?;

        let url = format!("{}{path}", self.base_url);
        tracing::debug!(%url, "Calling prediction service");

        let response = client.post(&url).json(body).send().map_err(|e| {
            if e.is_connect() {
                PredictionError::Connection(self.base_url.clone())
            } else if e.is_timeout() {
                PredictionError::Timeout(self.timeout.as_secs())
            } else {
                PredictionError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(PredictionError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .map_err(|e| PredictionError::ResponseParsing(e.to_string()))
    }
}

impl PredictionClient for HttpPredictionClient {
    fn therapy_pathline(&self, features: &PathlineFeatures) -> Result<PathlineResult, PredictionError> {
        self.post_json("/predict-therapy-pathline", features)
    }

    fn treatment_recommendation(&self, query: &TreatmentQuery) -> Result<TreatmentReply, PredictionError> {
        self.post_json("/treatment-recommendation", query)
    }

    fn treatment_chat(&self, query: &TreatmentQuery) -> Result<TreatmentReply, PredictionError> {
        self.post_json("/treatment-chat", query)
    }
}

/// Mock prediction client for testing: returns canned results or a
/// connection failure.
pub struct MockPredictionClient {
    pathline: PathlineResult,
    reply: String,
    unavailable: bool,
}

impl MockPredictionClient {
    pub fn new(pathline: PathlineResult, reply: &str) -> Self {
        Self {
            pathline,
            reply: reply.to_string(),
            unavailable: false,
        }
    }

    /// A client whose every call fails as if the service were down.
    pub fn unavailable() -> Self {
        Self {
            pathline: PathlineResult {
                effectiveness: super::types::Effectiveness {
                    score: 0.0,
                    label: String::new(),
                    components: serde_json::Value::Null,
                },
                model_probability: 0.0,
                forecast_hba1c: Vec::new(),
                summary: String::new(),
            },
            reply: String::new(),
            unavailable: true,
        }
    }

    fn check(&self) -> Result<(), PredictionError> {
        if self.unavailable {
            Err(PredictionError::Connection("mock://prediction".into()))
        } else {
            Ok(())
        }
    }
}

impl PredictionClient for MockPredictionClient {
    fn therapy_pathline(&self, _features: &PathlineFeatures) -> Result<PathlineResult, PredictionError> {
        self.check()?;
        Ok(self.pathline.clone())
    }

    fn treatment_recommendation(&self, _query: &TreatmentQuery) -> Result<TreatmentReply, PredictionError> {
        self.check()?;
        Ok(TreatmentReply {
            response: self.reply.clone(),
            context_used: Some("mock".into()),
        })
    }

    fn treatment_chat(&self, query: &TreatmentQuery) -> Result<TreatmentReply, PredictionError> {
        self.check()?;
        Ok(TreatmentReply {
            response: format!("{} ({})", self.reply, query.question),
            context_used: None,
        })
    }
}
