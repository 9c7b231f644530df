//! Appointment scheduling logic: lateness detection and dashboard metrics.

pub mod lateness;
pub mod metrics;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::models::AppointmentWithPatient;

pub use lateness::is_late;
pub use metrics::{compute as compute_metrics, AppointmentMetrics};

/// Appointment as returned by the API, flagged when it is running late.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentView {
    #[serde(flatten)]
    pub appointment: AppointmentWithPatient,
    pub late: bool,
}

impl AppointmentView {
    pub fn new(appointment: AppointmentWithPatient, now: NaiveDateTime) -> Self {
        let late = is_late(&appointment.appointment, now);
        Self { appointment, late }
    }
}
