use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::enums::AppointmentStatus;
use super::validation::{check_max_len, FieldError, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub date: NaiveDate,
    pub time: Option<String>,
    #[serde(rename = "type")]
    pub appointment_type: Option<String>,
    pub notes: Option<String>,
    pub duration_minutes: Option<i64>,
    pub status: AppointmentStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Appointment joined with its patient's name, as returned by listings.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentWithPatient {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub patient_name: Option<String>,
}

/// Body of `POST /api/appointments`. Status is kept as text so that
/// alias spellings parse the same way as on the status endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAppointment {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub date: NaiveDate,
    pub time: Option<String>,
    #[serde(rename = "type")]
    pub appointment_type: Option<String>,
    pub notes: Option<String>,
    pub duration_minutes: Option<i64>,
    pub status: Option<String>,
}

impl NewAppointment {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = Vec::new();
        check_max_len(&mut errors, "time", self.time.as_deref(), 10);
        check_max_len(&mut errors, "type", self.appointment_type.as_deref(), 50);
        if let Some(minutes) = self.duration_minutes {
            if minutes < 1 {
                errors.push(FieldError::new("duration_minutes", "must be at least 1"));
            }
        }
        ValidationError::from_fields(errors)
    }
}

/// Body of `PUT /api/appointments/:id`. Absent fields keep their stored
/// value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppointmentUpdate {
    pub patient_id: Option<i64>,
    pub doctor_id: Option<i64>,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    #[serde(rename = "type")]
    pub appointment_type: Option<String>,
    pub notes: Option<String>,
    pub duration_minutes: Option<i64>,
    pub status: Option<String>,
}

impl AppointmentUpdate {
    /// Overlay the supplied fields on `current`. The result validates with
    /// the same rules as a new appointment; its status is only set when the
    /// caller sent one.
    pub fn merge(self, current: &Appointment) -> NewAppointment {
        NewAppointment {
            patient_id: self.patient_id.unwrap_or(current.patient_id),
            doctor_id: self.doctor_id.unwrap_or(current.doctor_id),
            date: self.date.unwrap_or(current.date),
            time: self.time.or_else(|| current.time.clone()),
            appointment_type: self
                .appointment_type
                .or_else(|| current.appointment_type.clone()),
            notes: self.notes.or_else(|| current.notes.clone()),
            duration_minutes: self.duration_minutes.or(current.duration_minutes),
            status: self.status,
        }
    }
}
