//! Proxies to the prediction service.
//!
//! - `POST /api/patients/:id/therapy-pathline`
//! - `POST /api/patients/:id/treatment-recommendation`
//! - `POST /api/patients/:id/treatment-chat`
//!
//! The patient is loaded here and sent upstream; the service's reply is
//! passed back typed. Upstream failures surface as 502.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db;
use crate::models::{Patient, ValidationError};
use crate::prediction::{PathlineFeatures, PathlineResult, TreatmentQuery, TreatmentReply};

const DEFAULT_TREATMENT_QUESTION: &str =
    "Based on this patient's data, what treatment adjustments do you recommend?";

#[derive(Deserialize)]
pub struct TreatmentRequest {
    #[serde(default)]
    pub question: String,
}

async fn load_patient(ctx: &ApiContext, id: i64) -> Result<Patient, ApiError> {
    ctx.with_db(move |conn| Ok(db::get_patient(conn, id)?)).await
}

fn treatment_query(patient: &Patient, question: String) -> Result<TreatmentQuery, ApiError> {
    let question = if question.trim().is_empty() {
        DEFAULT_TREATMENT_QUESTION.to_string()
    } else {
        question.trim().to_string()
    };
    let patient = serde_json::to_value(patient).map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(TreatmentQuery { patient, question })
}

/// `POST /api/patients/:id/therapy-pathline`
pub async fn therapy_pathline(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<PathlineResult>, ApiError> {
    let patient = load_patient(&ctx, id).await?;
    let features = PathlineFeatures::from(&patient);
    let client = ctx.core.prediction();

    let result = tokio::task::spawn_blocking(move || client.therapy_pathline(&features)).await??;
    tracing::info!(
        patient_id = id,
        label = %result.effectiveness.label,
        "Therapy pathline predicted"
    );
    Ok(Json(result))
}

/// `POST /api/patients/:id/treatment-recommendation`
pub async fn treatment_recommendation(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
    body: Option<Json<TreatmentRequest>>,
) -> Result<Json<TreatmentReply>, ApiError> {
    let patient = load_patient(&ctx, id).await?;
    let question = body.map(|Json(b)| b.question).unwrap_or_default();
    let query = treatment_query(&patient, question)?;
    let client = ctx.core.prediction();

    let reply = tokio::task::spawn_blocking(move || client.treatment_recommendation(&query)).await??;
    Ok(Json(reply))
}

/// `POST /api/patients/:id/treatment-chat`
pub async fn treatment_chat(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
    Json(body): Json<TreatmentRequest>,
) -> Result<Json<TreatmentReply>, ApiError> {
    if body.question.trim().is_empty() {
        return Err(ValidationError::single("question", "Question is required").into());
    }
    let patient = load_patient(&ctx, id).await?;
    let query = treatment_query(&patient, body.question)?;
    let client = ctx.core.prediction();

    let reply = tokio::task::spawn_blocking(move || client.treatment_chat(&query)).await??;
    Ok(Json(reply))
}
