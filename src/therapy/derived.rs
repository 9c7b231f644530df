use chrono::NaiveDate;

use crate::models::{DerivedMetrics, PatientRecord};

fn days_between(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Option<f64> {
    Some((to? - from?).num_days() as f64)
}

/// Recompute the derived visit metrics from a record's raw measurements.
pub fn compute(record: &PatientRecord) -> DerivedMetrics {
    let both = |a: Option<f64>, b: Option<f64>| a.zip(b);

    let reduction_a = both(record.hba1c_1st_visit, record.hba1c_2nd_visit).map(|(h1, h2)| h1 - h2);
    let gap_1_2_days = days_between(record.first_visit_date, record.second_visit_date);
    let reduction_a_per_day = match (reduction_a, gap_1_2_days) {
        (Some(r), Some(gap)) if gap > 0.0 => Some(r / gap),
        _ => None,
    };

    DerivedMetrics {
        avg_fvg_1_2: both(record.fvg_1, record.fvg_2).map(|(a, b)| (a + b) / 2.0),
        fvg_delta_1_2: both(record.fvg_1, record.fvg_2).map(|(a, b)| b - a),
        reduction_a,
        reduction_a_per_day,
        gap_1_2_days,
        gap_2_3_days: days_between(record.second_visit_date, record.third_visit_date),
        dds_trend_1_3: both(record.dds_1, record.dds_3).map(|(first, last)| last - first),
        reduction_a_2_3: record
            .hba1c_3rd_visit
            .and_then(|h3| reduction_2_3(record, h3)),
    }
}

/// HbA1c reduction from visit 2 to a predicted visit-3 value.
pub fn reduction_2_3(record: &PatientRecord, predicted_hba1c3: f64) -> Option<f64> {
    record.hba1c_2nd_visit.map(|h2| h2 - predicted_hba1c3)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> PatientRecord {
        PatientRecord {
            name: "Efua".into(),
            gender: Some("Female".into()),
            fvg_1: Some(9.0),
            fvg_2: Some(7.0),
            hba1c_1st_visit: Some(8.5),
            hba1c_2nd_visit: Some(7.5),
            dds_1: Some(3.0),
            dds_3: Some(2.0),
            first_visit_date: NaiveDate::from_ymd_opt(2025, 1, 1),
            second_visit_date: NaiveDate::from_ymd_opt(2025, 3, 2),
            third_visit_date: NaiveDate::from_ymd_opt(2025, 6, 1),
            ..Default::default()
        }
    }

    #[test]
    fn computes_all_metrics_from_complete_record() {
        let d = compute(&record());
        assert_eq!(d.avg_fvg_1_2, Some(8.0));
        assert_eq!(d.fvg_delta_1_2, Some(-2.0));
        assert_eq!(d.reduction_a, Some(1.0));
        assert_eq!(d.gap_1_2_days, Some(60.0));
        assert_eq!(d.gap_2_3_days, Some(91.0));
        assert_eq!(d.reduction_a_per_day, Some(1.0 / 60.0));
        assert_eq!(d.dds_trend_1_3, Some(-1.0));
        assert_eq!(d.reduction_a_2_3, None);
    }

    #[test]
    fn missing_inputs_leave_metrics_unset() {
        let d = compute(&PatientRecord::default());
        assert_eq!(d, DerivedMetrics::default());
    }

    #[test]
    fn same_day_visits_have_no_per_day_rate() {
        let mut r = record();
        r.second_visit_date = r.first_visit_date;
        let d = compute(&r);
        assert_eq!(d.gap_1_2_days, Some(0.0));
        assert_eq!(d.reduction_a_per_day, None);
    }

    #[test]
    fn visit_three_reduction_follows_recorded_values() {
        let mut r = record();
        r.hba1c_3rd_visit = Some(6.9);
        let d = compute(&r);
        assert!((d.reduction_a_2_3.unwrap() - 0.6).abs() < 1e-9);

        r.hba1c_2nd_visit = None;
        assert_eq!(compute(&r).reduction_a_2_3, None);
    }

    #[test]
    fn reduction_2_3_needs_visit_two() {
        let mut r = record();
        assert_eq!(reduction_2_3(&r, 7.0), Some(0.5));
        r.hba1c_2nd_visit = None;
        assert_eq!(reduction_2_3(&r, 7.0), None);
    }
}
