//! Appointment endpoints.
//!
//! Every appointment returned carries `late`, computed against the
//! server's local clock at response time.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db;
use crate::db::repository::DATE_FORMAT;
use crate::models::{
    AppointmentFilter, AppointmentStatus, AppointmentUpdate, NewAppointment, Page, PageRequest,
};
use crate::schedule::AppointmentView;

#[derive(Deserialize)]
pub struct AppointmentListQuery {
    pub doctor_id: Option<i64>,
    pub patient_id: Option<i64>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Bare list unless the caller asked for a page.
#[derive(Serialize)]
#[serde(untagged)]
pub enum AppointmentList {
    All(Vec<AppointmentView>),
    Paged(Page<AppointmentView>),
}

fn parse_date_param(name: &str, value: Option<String>) -> Result<Option<NaiveDate>, ApiError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, DATE_FORMAT)
            .map(Some)
            .map_err(|_| ApiError::BadRequest(format!("{name} must be a YYYY-MM-DD date"))),
    }
}

fn parse_status(
    raw: Option<&str>,
    fallback: AppointmentStatus,
) -> Result<AppointmentStatus, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(fallback),
        Some(raw) => Ok(raw.parse()?),
    }
}

/// Both referenced rows must exist.
fn ensure_participants(conn: &rusqlite::Connection, appt: &NewAppointment) -> Result<(), ApiError> {
    db::get_patient(conn, appt.patient_id)?;
    db::get_user(conn, appt.doctor_id)?;
    Ok(())
}

/// `POST /api/appointments`
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(body): Json<NewAppointment>,
) -> Result<(StatusCode, Json<AppointmentView>), ApiError> {
    let status = parse_status(body.status.as_deref(), AppointmentStatus::default())?;
    body.validate()?;
    let now = ctx.now();

    let appointment = ctx
        .with_db(move |conn| {
            ensure_participants(conn, &body)?;
            let id = db::insert_appointment(conn, &body, status, now)?;
            Ok(db::get_appointment(conn, id)?)
        })
        .await?;

    tracing::info!(
        appointment_id = appointment.appointment.id,
        patient_id = appointment.appointment.patient_id,
        "Appointment scheduled"
    );
    Ok((StatusCode::CREATED, Json(AppointmentView::new(appointment, now))))
}

/// `GET /api/appointments`
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<AppointmentList>, ApiError> {
    let filter = AppointmentFilter {
        doctor_id: query.doctor_id,
        patient_id: query.patient_id,
        date_from: parse_date_param("from", query.from)?,
        date_to: parse_date_param("to", query.to)?,
        search: query.search.filter(|s| !s.trim().is_empty()),
    };
    let paged = query.page.is_some() || query.per_page.is_some();
    let page = PageRequest::new(query.page, query.per_page);

    let rows = ctx
        .with_db(move |conn| Ok(db::list_appointments(conn, &filter)?))
        .await?;
    let now = ctx.now();
    let views: Vec<AppointmentView> = rows
        .into_iter()
        .map(|a| AppointmentView::new(a, now))
        .collect();

    if paged {
        Ok(Json(AppointmentList::Paged(Page::from_items(views, page))))
    } else {
        Ok(Json(AppointmentList::All(views)))
    }
}

/// `GET /api/appointments/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<AppointmentView>, ApiError> {
    let appointment = ctx
        .with_db(move |conn| Ok(db::get_appointment(conn, id)?))
        .await?;
    Ok(Json(AppointmentView::new(appointment, ctx.now())))
}

/// `PUT /api/appointments/:id`: partial update, e.g. a reschedule.
pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
    Json(body): Json<AppointmentUpdate>,
) -> Result<Json<AppointmentView>, ApiError> {
    let now = ctx.now();

    let appointment = ctx
        .with_db(move |conn| {
            let current = db::get_appointment(conn, id)?.appointment;
            let merged = body.merge(&current);
            let status = parse_status(merged.status.as_deref(), current.status)?;
            merged.validate()?;
            ensure_participants(conn, &merged)?;
            db::update_appointment(conn, id, &merged, status, now)?;
            Ok(db::get_appointment(conn, id)?)
        })
        .await?;

    tracing::info!(appointment_id = id, "Appointment updated");
    Ok(Json(AppointmentView::new(appointment, now)))
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

/// `PATCH /api/appointments/:id/status`: mark completed, no-show, or
/// back to scheduled.
pub async fn update_status(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<AppointmentView>, ApiError> {
    let status: AppointmentStatus = body.status.parse()?;
    let now = ctx.now();

    let appointment = ctx
        .with_db(move |conn| {
            db::update_appointment_status(conn, id, status, now)?;
            Ok(db::get_appointment(conn, id)?)
        })
        .await?;

    tracing::info!(appointment_id = id, status = status.as_str(), "Appointment status changed");
    Ok(Json(AppointmentView::new(appointment, now)))
}

/// `DELETE /api/appointments/:id`
pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    ctx.with_db(move |conn| Ok(db::delete_appointment(conn, id)?)).await?;
    Ok(StatusCode::NO_CONTENT)
}
