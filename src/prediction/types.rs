use serde::{Deserialize, Serialize};

use crate::models::Patient;

/// Feature vector posted to `/predict-therapy-pathline`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathlineFeatures {
    pub insulin_regimen: String,
    pub hba1c1: Option<f64>,
    pub hba1c2: Option<f64>,
    pub hba1c3: Option<f64>,
    pub hba1c_delta_1_2: Option<f64>,
    pub gap_initial_visit: Option<f64>,
    pub gap_first_clinical: Option<f64>,
    pub egfr: Option<f64>,
    pub reduction_percent: Option<f64>,
    pub fvg1: Option<f64>,
    pub fvg2: Option<f64>,
    pub fvg3: Option<f64>,
    pub fvg_delta_1_2: Option<f64>,
    pub dds1: Option<f64>,
    pub dds3: Option<f64>,
    pub dds_trend_1_3: Option<f64>,
    pub age: Option<f64>,
    pub sex: String,
    pub ethnicity: String,
    pub height_cm: Option<f64>,
    pub weight1: Option<f64>,
    pub weight2: Option<f64>,
    pub weight3: Option<f64>,
    pub bmi1: Option<f64>,
    pub bmi3: Option<f64>,
    pub sbp: Option<f64>,
    pub dbp: Option<f64>,
    pub egfr1: Option<f64>,
    pub egfr3: Option<f64>,
    pub uacr1: Option<f64>,
    pub uacr3: Option<f64>,
    pub gap_1_2_days: Option<f64>,
    pub gap_2_3_days: Option<f64>,
}

impl From<&Patient> for PathlineFeatures {
    fn from(patient: &Patient) -> Self {
        let r = &patient.record;
        let d = &patient.derived;
        Self {
            insulin_regimen: r.insulin_regimen_type.clone().unwrap_or_default(),
            hba1c1: r.hba1c_1st_visit,
            hba1c2: r.hba1c_2nd_visit,
            hba1c3: r.hba1c_3rd_visit,
            hba1c_delta_1_2: d.reduction_a,
            gap_initial_visit: r.gap_from_initial_visit,
            gap_first_clinical: r.gap_from_first_clinical_visit,
            egfr: r.egfr,
            reduction_percent: d.reduction_a,
            fvg1: r.fvg_1,
            fvg2: r.fvg_2,
            fvg3: r.fvg_3,
            fvg_delta_1_2: d.fvg_delta_1_2,
            dds1: r.dds_1,
            dds3: r.dds_3,
            dds_trend_1_3: d.dds_trend_1_3,
            age: r.age.map(|a| a as f64),
            sex: r.gender.clone().unwrap_or_default(),
            ethnicity: r.ethnicity.clone().unwrap_or_default(),
            height_cm: r.height_cm,
            weight1: r.weight1,
            weight2: r.weight2,
            weight3: r.weight3,
            bmi1: r.bmi1,
            bmi3: r.bmi3,
            sbp: r.sbp,
            dbp: r.dbp,
            egfr1: r.egfr1,
            egfr3: r.egfr3,
            uacr1: r.uacr1,
            uacr3: r.uacr3,
            gap_1_2_days: d.gap_1_2_days,
            gap_2_3_days: d.gap_2_3_days,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effectiveness {
    pub score: f64,
    pub label: String,
    #[serde(default)]
    pub components: serde_json::Value,
}

/// Response of `/predict-therapy-pathline`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathlineResult {
    pub effectiveness: Effectiveness,
    pub model_probability: f64,
    #[serde(default)]
    pub forecast_hba1c: Vec<Option<f64>>,
    #[serde(default)]
    pub summary: String,
}

/// Body of the treatment recommendation and chat calls.
#[derive(Debug, Clone, Serialize)]
pub struct TreatmentQuery {
    pub patient: serde_json::Value,
    pub question: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentReply {
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_used: Option<String>,
}
