use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

use super::status::assess;
use crate::models::{AgeBand, Appointment, Patient, TrendStatus};

/// Latest HbA1c at or under this value counts as on target.
pub const HBA1C_TARGET: f64 = 7.0;
const INSULIN_MIX_SIZE: usize = 3;
const PRIORITY_LIST_SIZE: usize = 4;
const FOLLOWUP_WINDOW_DAYS: i64 = 14;
const UNSPECIFIED: &str = "Unspecified";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub improving: usize,
    pub stable: usize,
    pub worsening: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
    pub percent: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriorityPatient {
    pub id: i64,
    pub name: String,
    pub assigned_doctor_id: Option<i64>,
    pub latest_hba1c: Option<f64>,
    pub worsening_ratio: f64,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct CohortSummary {
    pub total_patients: usize,
    pub status_counts: StatusCounts,
    pub improving_share: u32,
    pub stable_share: u32,
    pub age_cohorts: Vec<LabelCount>,
    pub insulin_mix: Vec<LabelCount>,
    pub gender_counts: Vec<LabelCount>,
    pub priority_patients: Vec<PriorityPatient>,
    pub hba1c_at_target_pct: Option<u32>,
    pub pending_followup: usize,
}

fn percent(count: usize, total: usize) -> u32 {
    if total == 0 {
        0
    } else {
        (count as f64 * 100.0 / total as f64).round() as u32
    }
}

fn label_or_unspecified(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => UNSPECIFIED.to_string(),
    }
}

/// Count labels, largest first. Ties keep alphabetical order.
fn ranked_counts(labels: impl Iterator<Item = String>, total: usize) -> Vec<LabelCount> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for label in labels {
        *counts.entry(label).or_default() += 1;
    }
    let mut ranked: Vec<LabelCount> = counts
        .into_iter()
        .map(|(label, count)| LabelCount {
            label,
            count,
            percent: percent(count, total),
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked
}

/// Roll a patient population up into the therapy dashboard summary.
pub fn summarize(patients: &[Patient], appointments: &[Appointment], today: NaiveDate) -> CohortSummary {
    let total = patients.len();
    let assessed: Vec<_> = patients.iter().map(|p| (p, assess(&p.record))).collect();

    let mut status_counts = StatusCounts::default();
    for (_, assessment) in &assessed {
        match assessment.status {
            TrendStatus::Improving => status_counts.improving += 1,
            TrendStatus::Stable => status_counts.stable += 1,
            TrendStatus::Worsening => status_counts.worsening += 1,
        }
    }

    let age_cohorts = AgeBand::ALL
        .iter()
        .map(|band| {
            let count = patients
                .iter()
                .filter(|p| AgeBand::for_age(p.record.age) == *band)
                .count();
            LabelCount {
                label: band.as_str().to_string(),
                count,
                percent: percent(count, total),
            }
        })
        .collect();

    let mut insulin_mix = ranked_counts(
        patients
            .iter()
            .map(|p| label_or_unspecified(p.record.insulin_regimen_type.as_deref())),
        total,
    );
    insulin_mix.truncate(INSULIN_MIX_SIZE);

    let gender_counts = ranked_counts(
        patients
            .iter()
            .map(|p| label_or_unspecified(p.record.gender.as_deref())),
        total,
    );

    let mut worsening: Vec<_> = assessed
        .iter()
        .filter(|(_, a)| a.status == TrendStatus::Worsening)
        .collect();
    worsening.sort_by(|(a, _), (b, _)| b.updated_at.cmp(&a.updated_at));
    let priority_patients = worsening
        .into_iter()
        .take(PRIORITY_LIST_SIZE)
        .map(|(p, a)| PriorityPatient {
            id: p.id,
            name: p.record.name.clone(),
            assigned_doctor_id: p.record.assigned_doctor_id,
            latest_hba1c: p.record.latest_hba1c(),
            worsening_ratio: a.worsening_ratio,
            updated_at: p.updated_at,
        })
        .collect();

    let latest: Vec<f64> = patients.iter().filter_map(|p| p.record.latest_hba1c()).collect();
    let hba1c_at_target_pct = if latest.is_empty() {
        None
    } else {
        let on_target = latest.iter().filter(|v| **v <= HBA1C_TARGET).count();
        Some(percent(on_target, latest.len()))
    };

    let horizon = today + Duration::days(FOLLOWUP_WINDOW_DAYS);
    let pending_followup = patients
        .iter()
        .filter(|p| {
            !appointments
                .iter()
                .any(|a| a.patient_id == p.id && a.date > today && a.date <= horizon)
        })
        .count();

    CohortSummary {
        total_patients: total,
        improving_share: percent(status_counts.improving, total),
        stable_share: percent(status_counts.stable, total),
        status_counts,
        age_cohorts,
        insulin_mix,
        gender_counts,
        priority_patients,
        hba1c_at_target_pct,
        pending_followup,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppointmentStatus, DerivedMetrics, PatientRecord, RiskSnapshot};

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 4, day)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn patient(id: i64, record: PatientRecord, updated_day: u32) -> Patient {
        Patient {
            id,
            record,
            derived: DerivedMetrics::default(),
            risk: RiskSnapshot::default(),
            created_at: at(1),
            updated_at: at(updated_day),
        }
    }

    fn worsening(name: &str) -> PatientRecord {
        PatientRecord {
            name: name.into(),
            gender: Some("Male".into()),
            hba1c_1st_visit: Some(7.0),
            hba1c_3rd_visit: Some(8.0),
            ..Default::default()
        }
    }

    fn appointment(patient_id: i64, date: NaiveDate) -> Appointment {
        Appointment {
            id: patient_id * 10,
            patient_id,
            doctor_id: 1,
            date,
            time: None,
            appointment_type: None,
            notes: None,
            duration_minutes: None,
            status: AppointmentStatus::Scheduled,
            created_at: at(1),
            updated_at: at(1),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 20).unwrap()
    }

    #[test]
    fn empty_population() {
        let summary = summarize(&[], &[], today());
        assert_eq!(summary.total_patients, 0);
        assert_eq!(summary.improving_share, 0);
        assert_eq!(summary.hba1c_at_target_pct, None);
        assert_eq!(summary.age_cohorts.len(), 6);
        assert!(summary.insulin_mix.is_empty());
    }

    #[test]
    fn status_counts_and_shares() {
        let improving = PatientRecord {
            name: "Imp".into(),
            gender: Some("Female".into()),
            hba1c_1st_visit: Some(9.0),
            hba1c_3rd_visit: Some(7.0),
            ..Default::default()
        };
        let stable = PatientRecord {
            name: "Sta".into(),
            gender: Some("Female".into()),
            ..Default::default()
        };
        let patients = vec![
            patient(1, improving, 2),
            patient(2, stable.clone(), 2),
            patient(3, stable, 2),
        ];
        let summary = summarize(&patients, &[], today());
        assert_eq!(
            summary.status_counts,
            StatusCounts { improving: 1, stable: 2, worsening: 0 }
        );
        assert_eq!(summary.improving_share, 33);
        assert_eq!(summary.stable_share, 67);
    }

    #[test]
    fn age_cohorts_keep_fixed_order() {
        let ages = [Some(12), Some(30), Some(31), Some(75), None];
        let patients: Vec<Patient> = ages
            .iter()
            .enumerate()
            .map(|(i, age)| {
                patient(
                    i as i64 + 1,
                    PatientRecord { name: "P".into(), age: *age, ..Default::default() },
                    2,
                )
            })
            .collect();
        let summary = summarize(&patients, &[], today());
        let counts: Vec<(&str, usize)> = summary
            .age_cohorts
            .iter()
            .map(|c| (c.label.as_str(), c.count))
            .collect();
        assert_eq!(
            counts,
            vec![("Under 18", 1), ("18-30", 1), ("31-45", 1), ("46-60", 0), ("60+", 1), ("Unknown", 1)]
        );
    }

    #[test]
    fn insulin_mix_is_top_three_with_unspecified() {
        let regimens = [Some("Basal"), Some("Basal"), Some("Basal"), None, None, Some("Premix"), Some("Pump")];
        let patients: Vec<Patient> = regimens
            .iter()
            .enumerate()
            .map(|(i, r)| {
                patient(
                    i as i64 + 1,
                    PatientRecord {
                        name: "P".into(),
                        insulin_regimen_type: r.map(String::from),
                        ..Default::default()
                    },
                    2,
                )
            })
            .collect();
        let summary = summarize(&patients, &[], today());
        let labels: Vec<&str> = summary.insulin_mix.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["Basal", "Unspecified", "Premix"]);
        assert_eq!(summary.gender_counts[0].label, "Unspecified");
    }

    #[test]
    fn priority_patients_are_newest_worsening_first() {
        let patients: Vec<Patient> = (1..=6)
            .map(|i| patient(i, worsening(&format!("W{i}")), i as u32))
            .collect();
        let summary = summarize(&patients, &[], today());
        let ids: Vec<i64> = summary.priority_patients.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![6, 5, 4, 3]);
        assert_eq!(summary.status_counts.worsening, 6);
    }

    #[test]
    fn hba1c_target_uses_latest_value() {
        let mut on_target = worsening("A");
        on_target.hba1c_3rd_visit = Some(6.8);
        let mut only_first = worsening("B");
        only_first.hba1c_3rd_visit = None;
        only_first.hba1c_1st_visit = Some(7.0);
        let off_target = worsening("C");
        let no_data = PatientRecord { name: "D".into(), ..Default::default() };
        let patients = vec![
            patient(1, on_target, 2),
            patient(2, only_first, 2),
            patient(3, off_target, 2),
            patient(4, no_data, 2),
        ];
        let summary = summarize(&patients, &[], today());
        assert_eq!(summary.hba1c_at_target_pct, Some(67));
    }

    #[test]
    fn pending_followup_counts_patients_without_upcoming_visit() {
        let patients: Vec<Patient> = (1..=4)
            .map(|i| patient(i, PatientRecord { name: "P".into(), ..Default::default() }, 2))
            .collect();
        let appointments = vec![
            appointment(1, today() + Duration::days(14)),
            appointment(2, today()),
            appointment(3, today() + Duration::days(15)),
            appointment(4, today() + Duration::days(1)),
        ];
        let summary = summarize(&patients, &appointments, today());
        // patient 2 only has a visit today, patient 3 only beyond the window
        assert_eq!(summary.pending_followup, 2);
    }
}
