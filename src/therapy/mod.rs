//! Therapy-effectiveness domain logic: trend classification, derived visit
//! metrics, risk banding and the cohort rollup behind the therapy dashboard.

pub mod cohort;
pub mod derived;
pub mod risk;
pub mod status;

use serde::Serialize;

use crate::models::{AgeBand, Patient, PatientTrendFilter, TrendStatus};

pub use cohort::{summarize, CohortSummary};
pub use risk::risk_label;
pub use status::{assess, classify, TrendAssessment};

/// A patient row as listed, with its computed trend label and age band.
#[derive(Debug, Clone, Serialize)]
pub struct PatientWithTrend {
    #[serde(flatten)]
    pub patient: Patient,
    pub trend_status: TrendStatus,
    pub age_band: AgeBand,
}

/// Classify each patient and keep those matching the trend and age filters.
pub fn with_trends(patients: Vec<Patient>, filter: &PatientTrendFilter) -> Vec<PatientWithTrend> {
    patients
        .into_iter()
        .map(|patient| PatientWithTrend {
            trend_status: classify(&patient.record),
            age_band: AgeBand::for_age(patient.record.age),
            patient,
        })
        .filter(|row| filter.status.map_or(true, |s| row.trend_status == s))
        .filter(|row| filter.age_band.map_or(true, |b| row.age_band == b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DerivedMetrics, PatientRecord, RiskSnapshot};
    use chrono::NaiveDate;

    fn patient(id: i64, age: Option<i64>, hba1c: Option<(f64, f64)>) -> Patient {
        let ts = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        Patient {
            id,
            record: PatientRecord {
                name: format!("P{id}"),
                age,
                hba1c_1st_visit: hba1c.map(|h| h.0),
                hba1c_3rd_visit: hba1c.map(|h| h.1),
                ..Default::default()
            },
            derived: DerivedMetrics::default(),
            risk: RiskSnapshot::default(),
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn unfiltered_rows_carry_labels() {
        let rows = with_trends(vec![patient(1, Some(40), Some((9.0, 7.0)))], &PatientTrendFilter::default());
        assert_eq!(rows[0].trend_status, TrendStatus::Improving);
        assert_eq!(rows[0].age_band, AgeBand::From31To45);
    }

    #[test]
    fn filters_by_status_and_age_band() {
        let patients = vec![
            patient(1, Some(40), Some((9.0, 7.0))),
            patient(2, Some(70), Some((9.0, 7.0))),
            patient(3, Some(40), None),
        ];
        let filter = PatientTrendFilter {
            status: Some(TrendStatus::Improving),
            age_band: Some(AgeBand::From31To45),
        };
        let rows = with_trends(patients, &filter);
        let ids: Vec<i64> = rows.iter().map(|r| r.patient.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn serialized_row_is_flat() {
        let rows = with_trends(vec![patient(5, None, None)], &PatientTrendFilter::default());
        let json = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(json["id"], 5);
        assert_eq!(json["trend_status"], "Stable");
        assert_eq!(json["age_band"], "Unknown");
    }
}
