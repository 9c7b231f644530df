use chrono::{Duration, NaiveDateTime, NaiveTime};

use crate::models::{Appointment, AppointmentStatus};

/// Grace period after the scheduled time before a visit counts as late.
pub const LATE_GRACE_MINUTES: i64 = 5;

/// Parse an `HH:MM` or `HH:MM:SS` appointment time.
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

/// A scheduled appointment for today whose time passed more than the grace
/// period ago. Missing or unreadable times are never late.
pub fn is_late(appointment: &Appointment, now: NaiveDateTime) -> bool {
    if appointment.status != AppointmentStatus::Scheduled || appointment.date != now.date() {
        return false;
    }
    let Some(time) = appointment.time.as_deref().and_then(parse_time) else {
        return false;
    };
    now - appointment.date.and_time(time) > Duration::minutes(LATE_GRACE_MINUTES)
}
