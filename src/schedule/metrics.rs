use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use super::lateness::is_late;
use crate::models::{Appointment, AppointmentStatus};

const TRAILING_WINDOW_DAYS: i64 = 30;
const UPCOMING_WINDOW_DAYS: i64 = 14;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AppointmentMetrics {
    pub last_30_days: usize,
    pub next_14_days: usize,
    pub completed: usize,
    pub no_show: usize,
    pub show_rate: Option<u32>,
    pub no_show_rate: Option<u32>,
    pub today: usize,
    pub late_now: usize,
}

fn rate(part: usize, whole: usize) -> Option<u32> {
    (whole > 0).then(|| (100.0 * part as f64 / whole as f64).round() as u32)
}

/// Dashboard rollup over a set of appointments as of `now`.
///
/// Completed and no-show counts only cover the trailing 30-day window.
pub fn compute(appointments: &[Appointment], now: NaiveDateTime) -> AppointmentMetrics {
    let today = now.date();
    let window_start = today - Duration::days(TRAILING_WINDOW_DAYS);
    let horizon = today + Duration::days(UPCOMING_WINDOW_DAYS);

    let mut metrics = AppointmentMetrics::default();
    for appt in appointments {
        if appt.date >= window_start && appt.date <= today {
            metrics.last_30_days += 1;
            match appt.status {
                AppointmentStatus::Completed => metrics.completed += 1,
                AppointmentStatus::NoShow => metrics.no_show += 1,
                AppointmentStatus::Scheduled => {}
            }
        }
        if appt.date > today && appt.date <= horizon {
            metrics.next_14_days += 1;
        }
        if appt.date == today {
            metrics.today += 1;
        }
        if is_late(appt, now) {
            metrics.late_now += 1;
        }
    }

    let attended = metrics.completed + metrics.no_show;
    metrics.show_rate = rate(metrics.completed, attended);
    metrics.no_show_rate = rate(metrics.no_show, attended);
    metrics
}
