//! Therapy-status classifier.
//!
//! Compares visit-1 and visit-3 values of six markers. Each marker with
//! both endpoints present contributes its weight to the total, and to the
//! improving or worsening side when its change strictly passes the
//! marker's threshold. A side wins when it holds more than 40% of the
//! considered weight; improvement is checked first.

use serde::Serialize;

use crate::models::{PatientRecord, TrendStatus};

/// Share of considered weight a side must exceed to set the label.
pub const DECISION_RATIO: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    LowerIsBetter,
    HigherIsBetter,
}

struct MetricRule {
    name: &'static str,
    weight: u32,
    improve_above: f64,
    worsen_below: f64,
    direction: Direction,
    endpoints: fn(&PatientRecord) -> (Option<f64>, Option<f64>),
}

const METRICS: [MetricRule; 6] = [
    MetricRule {
        name: "hba1c",
        weight: 3,
        improve_above: 0.5,
        worsen_below: -0.3,
        direction: Direction::LowerIsBetter,
        endpoints: |p| (p.hba1c_1st_visit, p.hba1c_3rd_visit),
    },
    MetricRule {
        name: "fvg",
        weight: 2,
        improve_above: 1.0,
        worsen_below: -1.0,
        direction: Direction::LowerIsBetter,
        endpoints: |p| (p.fvg_1, p.fvg_3),
    },
    MetricRule {
        name: "bmi",
        weight: 1,
        improve_above: 1.0,
        worsen_below: -1.0,
        direction: Direction::LowerIsBetter,
        endpoints: |p| (p.bmi1, p.bmi3),
    },
    MetricRule {
        name: "egfr",
        weight: 1,
        improve_above: 5.0,
        worsen_below: -5.0,
        direction: Direction::HigherIsBetter,
        endpoints: |p| (p.egfr1, p.egfr3),
    },
    MetricRule {
        name: "uacr",
        weight: 1,
        improve_above: 10.0,
        worsen_below: -10.0,
        direction: Direction::LowerIsBetter,
        endpoints: |p| (p.uacr1, p.uacr3),
    },
    MetricRule {
        name: "dds",
        weight: 1,
        improve_above: 0.5,
        worsen_below: -0.5,
        direction: Direction::LowerIsBetter,
        endpoints: |p| (p.dds_1, p.dds_3),
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricOutcome {
    Improved,
    Worsened,
    Unchanged,
}

/// How one marker moved between visit 1 and visit 3.
#[derive(Debug, Clone, Serialize)]
pub struct MetricContribution {
    pub metric: &'static str,
    pub weight: u32,
    /// Change oriented so that positive means better.
    pub improvement: f64,
    pub outcome: MetricOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendAssessment {
    pub status: TrendStatus,
    pub improving_weight: u32,
    pub worsening_weight: u32,
    pub total_weight: u32,
    pub improving_ratio: f64,
    pub worsening_ratio: f64,
    pub metrics: Vec<MetricContribution>,
}

/// A stored measurement counts only when it is set to a real, non-zero number.
/// Zero is how blank form inputs reach the database.
fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v != 0.0)
}

pub fn assess(record: &PatientRecord) -> TrendAssessment {
    let mut improving_weight = 0;
    let mut worsening_weight = 0;
    let mut total_weight = 0;
    let mut metrics = Vec::new();

    for rule in &METRICS {
        let (first, last) = (rule.endpoints)(record);
        let (Some(first), Some(last)) = (present(first), present(last)) else {
            continue;
        };

        let improvement = match rule.direction {
            Direction::LowerIsBetter => first - last,
            Direction::HigherIsBetter => last - first,
        };

        let outcome = if improvement > rule.improve_above {
            improving_weight += rule.weight;
            MetricOutcome::Improved
        } else if improvement < rule.worsen_below {
            worsening_weight += rule.weight;
            MetricOutcome::Worsened
        } else {
            MetricOutcome::Unchanged
        };
        total_weight += rule.weight;

        metrics.push(MetricContribution {
            metric: rule.name,
            weight: rule.weight,
            improvement,
            outcome,
        });
    }

    let (improving_ratio, worsening_ratio) = if total_weight == 0 {
        (0.0, 0.0)
    } else {
        (
            improving_weight as f64 / total_weight as f64,
            worsening_weight as f64 / total_weight as f64,
        )
    };

    let status = if total_weight == 0 {
        TrendStatus::Stable
    } else if improving_ratio > DECISION_RATIO {
        TrendStatus::Improving
    } else if worsening_ratio > DECISION_RATIO {
        TrendStatus::Worsening
    } else {
        TrendStatus::Stable
    };

    TrendAssessment {
        status,
        improving_weight,
        worsening_weight,
        total_weight,
        improving_ratio,
        worsening_ratio,
        metrics,
    }
}

pub fn classify(record: &PatientRecord) -> TrendStatus {
    assess(record).status
}
