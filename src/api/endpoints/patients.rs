//! Patient endpoints.
//!
//! Records are validated on every write and their derived visit metrics
//! recomputed before they reach the database. Reads attach the computed
//! therapy trend.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::config::DEFAULT_RISK_MODEL_VERSION;
use crate::db;
use crate::models::{
    AgeBand, FieldError, Page, PageRequest, Patient, PatientFilter, PatientRecord,
    PatientTrendFilter, RiskSnapshot, TrendStatus, UserRole, ValidationError,
};
use crate::therapy::{self, PatientWithTrend, TrendAssessment};

/// Patient with the full trend assessment behind its label.
#[derive(Serialize)]
pub struct PatientDetail {
    #[serde(flatten)]
    pub patient: Patient,
    pub trend_status: TrendStatus,
    pub age_band: AgeBand,
    pub trend: TrendAssessment,
}

impl From<Patient> for PatientDetail {
    fn from(patient: Patient) -> Self {
        let trend = therapy::assess(&patient.record);
        Self {
            trend_status: trend.status,
            age_band: AgeBand::for_age(patient.record.age),
            trend,
            patient,
        }
    }
}

#[derive(Deserialize)]
pub struct PatientListQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub insulin: Option<String>,
    pub gender: Option<String>,
    pub age_band: Option<String>,
    pub doctor_id: Option<i64>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty() && !v.eq_ignore_ascii_case("all"))
}

/// The user must exist (404) and hold the doctor role (422).
fn ensure_doctor(conn: &rusqlite::Connection, doctor_id: i64) -> Result<(), ApiError> {
    let user = db::get_user(conn, doctor_id)?;
    if user.role != UserRole::Doctor {
        return Err(ValidationError::single("doctor_id", "User is not a doctor").into());
    }
    Ok(())
}

/// `POST /api/patients`: an `assigned_doctor_id` in the body must name a
/// doctor.
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(record): Json<PatientRecord>,
) -> Result<(StatusCode, Json<PatientDetail>), ApiError> {
    record.validate()?;
    let derived = therapy::derived::compute(&record);
    let now = ctx.now();

    let patient = ctx
        .with_db(move |conn| {
            if let Some(doctor_id) = record.assigned_doctor_id {
                ensure_doctor(conn, doctor_id)?;
            }
            let id = db::insert_patient(conn, &record, &derived, now)?;
            Ok(db::get_patient(conn, id)?)
        })
        .await?;

    tracing::info!(patient_id = patient.id, "Patient created");
    Ok((StatusCode::CREATED, Json(patient.into())))
}

/// `GET /api/patients`: filtered, paginated list with trend labels.
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<PatientListQuery>,
) -> Result<Json<Page<PatientWithTrend>>, ApiError> {
    let trend_filter = PatientTrendFilter {
        status: non_empty(query.status).map(|s| s.parse()).transpose()?,
        age_band: non_empty(query.age_band).map(|s| s.parse()).transpose()?,
    };
    let filter = PatientFilter {
        search: non_empty(query.search),
        insulin: non_empty(query.insulin),
        gender: non_empty(query.gender),
        doctor_id: query.doctor_id,
    };
    let page = PageRequest::new(query.page, query.per_page);

    let patients = ctx.with_db(move |conn| Ok(db::list_patients(conn, &filter)?)).await?;
    let rows = therapy::with_trends(patients, &trend_filter);
    Ok(Json(Page::from_items(rows, page)))
}

/// `GET /api/patients/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<PatientDetail>, ApiError> {
    let patient = ctx.with_db(move |conn| Ok(db::get_patient(conn, id)?)).await?;
    Ok(Json(patient.into()))
}

/// `GET /api/patients/by-user/:user_id`
pub async fn by_user(
    State(ctx): State<ApiContext>,
    Path(user_id): Path<i64>,
) -> Result<Json<PatientDetail>, ApiError> {
    let patient = ctx
        .with_db(move |conn| Ok(db::get_patient_by_user(conn, user_id)?))
        .await?;
    Ok(Json(patient.into()))
}

/// `PUT /api/patients/:id`: replace the clinician-entered record. The
/// doctor assignment only changes through `assign-doctor`.
pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
    Json(record): Json<PatientRecord>,
) -> Result<Json<PatientDetail>, ApiError> {
    record.validate()?;
    let derived = therapy::derived::compute(&record);
    let now = ctx.now();

    let patient = ctx
        .with_db(move |conn| {
            db::update_patient(conn, id, &record, &derived, now)?;
            Ok(db::get_patient(conn, id)?)
        })
        .await?;

    tracing::info!(patient_id = id, "Patient updated");
    Ok(Json(patient.into()))
}

/// `DELETE /api/patients/:id`: appointments go with it.
pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    ctx.with_db(move |conn| Ok(db::delete_patient(conn, id)?)).await?;
    tracing::info!(patient_id = id, "Patient deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct AssignDoctorRequest {
    pub doctor_id: Option<i64>,
}

/// `PATCH /api/patients/:id/assign-doctor`: `null` clears the assignment.
pub async fn assign_doctor(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
    Json(body): Json<AssignDoctorRequest>,
) -> Result<Json<PatientDetail>, ApiError> {
    let now = ctx.now();
    let patient = ctx
        .with_db(move |conn| {
            db::get_patient(conn, id)?;
            if let Some(doctor_id) = body.doctor_id {
                ensure_doctor(conn, doctor_id)?;
            }
            db::assign_doctor(conn, id, body.doctor_id, now)?;
            Ok(db::get_patient(conn, id)?)
        })
        .await?;
    Ok(Json(patient.into()))
}

#[derive(Deserialize)]
pub struct RiskRequest {
    pub score: f64,
    pub label: Option<String>,
    pub model_version: Option<String>,
}

/// `POST /api/patients/:id/risk`: store the latest risk prediction.
pub async fn save_risk(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
    Json(body): Json<RiskRequest>,
) -> Result<Json<PatientDetail>, ApiError> {
    if !body.score.is_finite() {
        return Err(ValidationError::single("score", "must be a number").into());
    }
    let now = ctx.now();
    let snapshot = RiskSnapshot {
        last_risk_score: Some(body.score),
        last_risk_label: Some(
            body.label
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| therapy::risk_label(body.score).to_string()),
        ),
        risk_model_version: Some(
            body.model_version
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_RISK_MODEL_VERSION.to_string()),
        ),
        last_predicted_at: Some(now),
    };

    let patient = ctx
        .with_db(move |conn| {
            db::save_risk_snapshot(conn, id, &snapshot, now)?;
            Ok(db::get_patient(conn, id)?)
        })
        .await?;
    tracing::info!(patient_id = id, score = body.score, "Risk snapshot stored");
    Ok(Json(patient.into()))
}

#[derive(Deserialize)]
pub struct ApplyHba1cRequest {
    pub value: f64,
}

/// `POST /api/patients/:id/apply-prediction-hba1c3`: write a predicted
/// HbA1c into visit 3.
pub async fn apply_prediction_hba1c3(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
    Json(body): Json<ApplyHba1cRequest>,
) -> Result<Json<PatientDetail>, ApiError> {
    let value = body.value;
    if !value.is_finite() || value <= 0.0 || value > 25.0 {
        return Err(ValidationError {
            fields: vec![FieldError::new("value", "must be between 0 and 25")],
        }
        .into());
    }
    let now = ctx.now();

    let patient = ctx
        .with_db(move |conn| {
            let current = db::get_patient(conn, id)?;
            let reduction = therapy::derived::reduction_2_3(&current.record, value);
            db::apply_predicted_hba1c3(conn, id, value, reduction, now)?;
            Ok(db::get_patient(conn, id)?)
        })
        .await?;
    tracing::info!(patient_id = id, "Predicted HbA1c applied to visit 3");
    Ok(Json(patient.into()))
}
