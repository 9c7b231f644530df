//! Dashboard rollups. Both accept an optional `doctor_id` to scope the
//! population to one clinician.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db;
use crate::models::{Appointment, AppointmentFilter, PatientFilter};
use crate::schedule::{self, AppointmentMetrics};
use crate::therapy::{self, CohortSummary};

#[derive(Deserialize)]
pub struct DashboardQuery {
    pub doctor_id: Option<i64>,
}

fn load_appointments(
    conn: &rusqlite::Connection,
    doctor_id: Option<i64>,
) -> Result<Vec<Appointment>, ApiError> {
    let filter = AppointmentFilter {
        doctor_id,
        ..Default::default()
    };
    Ok(db::list_appointments(conn, &filter)?
        .into_iter()
        .map(|a| a.appointment)
        .collect())
}

/// `GET /api/dashboard/appointments`
pub async fn appointments(
    State(ctx): State<ApiContext>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<AppointmentMetrics>, ApiError> {
    let appointments = ctx
        .with_db(move |conn| load_appointments(conn, query.doctor_id))
        .await?;
    Ok(Json(schedule::compute_metrics(&appointments, ctx.now())))
}

/// `GET /api/dashboard/therapy`
pub async fn therapy(
    State(ctx): State<ApiContext>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<CohortSummary>, ApiError> {
    let (patients, appointments) = ctx
        .with_db(move |conn| {
            let filter = PatientFilter {
                doctor_id: query.doctor_id,
                ..Default::default()
            };
            let patients = db::list_patients(conn, &filter)?;
            let appointments = load_appointments(conn, query.doctor_id)?;
            Ok((patients, appointments))
        })
        .await?;
    Ok(Json(therapy::summarize(&patients, &appointments, ctx.now().date())))
}
