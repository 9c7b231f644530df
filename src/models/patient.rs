use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::validation::{check_min, check_range, FieldError, ValidationError};

/// Clinician-entered patient data: demographics plus the three-visit
/// measurement series. This is the body of create and replace requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientRecord {
    pub name: String,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub ethnicity: Option<String>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub physical_activity: Option<String>,
    pub medical_history: Option<String>,
    pub medications: Option<String>,
    pub remarks: Option<String>,
    pub insulin_regimen_type: Option<String>,

    pub fvg: Option<f64>,
    pub fvg_1: Option<f64>,
    pub fvg_2: Option<f64>,
    pub fvg_3: Option<f64>,
    pub hba1c_1st_visit: Option<f64>,
    pub hba1c_2nd_visit: Option<f64>,
    pub hba1c_3rd_visit: Option<f64>,
    pub weight1: Option<f64>,
    pub weight2: Option<f64>,
    pub weight3: Option<f64>,
    pub bmi1: Option<f64>,
    pub bmi3: Option<f64>,
    pub sbp: Option<f64>,
    pub dbp: Option<f64>,
    pub egfr: Option<f64>,
    pub egfr1: Option<f64>,
    pub egfr3: Option<f64>,
    pub uacr1: Option<f64>,
    pub uacr3: Option<f64>,
    pub dds_1: Option<f64>,
    pub dds_3: Option<f64>,
    pub freq_smbg: Option<i64>,
    pub first_visit_date: Option<NaiveDate>,
    pub second_visit_date: Option<NaiveDate>,
    pub third_visit_date: Option<NaiveDate>,
    pub gap_from_initial_visit: Option<f64>,
    pub gap_from_first_clinical_visit: Option<f64>,

    pub user_id: Option<i64>,
    pub assigned_doctor_id: Option<i64>,
}

impl PatientRecord {
    /// Check required fields and clinical ranges, collecting every violation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "Name is required"));
        }
        if self.gender.as_deref().map_or(true, |g| g.trim().is_empty()) {
            errors.push(FieldError::new("gender", "Gender is required"));
        }

        check_range(&mut errors, "age", self.age.map(|a| a as f64), 0.0, 150.0);
        check_range(&mut errors, "height_cm", self.height_cm, 30.0, 250.0);
        for (field, value) in [
            ("weight_kg", self.weight_kg),
            ("weight1", self.weight1),
            ("weight2", self.weight2),
            ("weight3", self.weight3),
        ] {
            check_range(&mut errors, field, value, 10.0, 400.0);
        }
        check_range(&mut errors, "bmi1", self.bmi1, 10.0, 100.0);
        check_range(&mut errors, "bmi3", self.bmi3, 10.0, 100.0);
        check_range(&mut errors, "sbp", self.sbp, 50.0, 300.0);
        check_range(&mut errors, "dbp", self.dbp, 30.0, 200.0);
        check_min(&mut errors, "uacr1", self.uacr1, 0.0);
        check_min(&mut errors, "uacr3", self.uacr3, 0.0);
        check_range(&mut errors, "freq_smbg", self.freq_smbg.map(|f| f as f64), 0.0, 1000.0);

        ValidationError::from_fields(errors)
    }

    /// Most recent HbA1c on record: visit 3, else visit 2, else visit 1.
    pub fn latest_hba1c(&self) -> Option<f64> {
        self.hba1c_3rd_visit
            .or(self.hba1c_2nd_visit)
            .or(self.hba1c_1st_visit)
    }
}

/// Values computed from the measurement series on every write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub avg_fvg_1_2: Option<f64>,
    pub fvg_delta_1_2: Option<f64>,
    pub reduction_a: Option<f64>,
    pub reduction_a_per_day: Option<f64>,
    pub gap_1_2_days: Option<f64>,
    pub gap_2_3_days: Option<f64>,
    pub dds_trend_1_3: Option<f64>,
    pub reduction_a_2_3: Option<f64>,
}

/// Last risk prediction stored against the patient.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskSnapshot {
    pub last_risk_score: Option<f64>,
    pub last_risk_label: Option<String>,
    pub risk_model_version: Option<String>,
    pub last_predicted_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    #[serde(flatten)]
    pub record: PatientRecord,
    #[serde(flatten)]
    pub derived: DerivedMetrics,
    #[serde(flatten)]
    pub risk: RiskSnapshot,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
