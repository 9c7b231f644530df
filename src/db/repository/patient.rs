use chrono::NaiveDateTime;
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{format_date, format_timestamp, like_pattern, map_constraint, parse_date, parse_timestamp};
use crate::db::DatabaseError;
use crate::models::*;

fn col<T: ToSql + 'static>(name: &'static str, value: T) -> (&'static str, Box<dyn ToSql>) {
    (name, Box::new(value))
}

/// Writable columns paired with their bound values, in table order.
fn record_values(
    record: &PatientRecord,
    derived: &DerivedMetrics,
) -> Vec<(&'static str, Box<dyn ToSql>)> {
    let date = |d: Option<chrono::NaiveDate>| d.as_ref().map(format_date);
    vec![
        col("name", record.name.trim().to_string()),
        col("age", record.age),
        col("gender", record.gender.clone()),
        col("ethnicity", record.ethnicity.clone()),
        col("height_cm", record.height_cm),
        col("weight_kg", record.weight_kg),
        col("weight1", record.weight1),
        col("weight2", record.weight2),
        col("weight3", record.weight3),
        col("bmi1", record.bmi1),
        col("bmi3", record.bmi3),
        col("physical_activity", record.physical_activity.clone()),
        col("medical_history", record.medical_history.clone()),
        col("medications", record.medications.clone()),
        col("remarks", record.remarks.clone()),
        col("insulin_regimen_type", record.insulin_regimen_type.clone()),
        col("fvg", record.fvg),
        col("fvg_1", record.fvg_1),
        col("fvg_2", record.fvg_2),
        col("fvg_3", record.fvg_3),
        col("hba1c_1st_visit", record.hba1c_1st_visit),
        col("hba1c_2nd_visit", record.hba1c_2nd_visit),
        col("hba1c_3rd_visit", record.hba1c_3rd_visit),
        col("sbp", record.sbp),
        col("dbp", record.dbp),
        col("egfr", record.egfr),
        col("egfr1", record.egfr1),
        col("egfr3", record.egfr3),
        col("uacr1", record.uacr1),
        col("uacr3", record.uacr3),
        col("dds_1", record.dds_1),
        col("dds_3", record.dds_3),
        col("freq_smbg", record.freq_smbg),
        col("first_visit_date", date(record.first_visit_date)),
        col("second_visit_date", date(record.second_visit_date)),
        col("third_visit_date", date(record.third_visit_date)),
        col("gap_from_initial_visit", record.gap_from_initial_visit),
        col("gap_from_first_clinical_visit", record.gap_from_first_clinical_visit),
        col("avg_fvg_1_2", derived.avg_fvg_1_2),
        col("fvg_delta_1_2", derived.fvg_delta_1_2),
        col("reduction_a", derived.reduction_a),
        col("reduction_a_per_day", derived.reduction_a_per_day),
        col("gap_1_2_days", derived.gap_1_2_days),
        col("gap_2_3_days", derived.gap_2_3_days),
        col("dds_trend_1_3", derived.dds_trend_1_3),
        col("reduction_a_2_3", derived.reduction_a_2_3),
        col("user_id", record.user_id),
    ]
}

fn opt_date(row: &Row, column: &str) -> rusqlite::Result<Option<chrono::NaiveDate>> {
    let idx = row.as_ref().column_index(column)?;
    row.get::<_, Option<String>>(idx)?
        .map(|raw| parse_date(idx, &raw))
        .transpose()
}

fn timestamp(row: &Row, column: &str) -> rusqlite::Result<NaiveDateTime> {
    let idx = row.as_ref().column_index(column)?;
    parse_timestamp(idx, &row.get::<_, String>(idx)?)
}

fn opt_timestamp(row: &Row, column: &str) -> rusqlite::Result<Option<NaiveDateTime>> {
    let idx = row.as_ref().column_index(column)?;
    row.get::<_, Option<String>>(idx)?
        .map(|raw| parse_timestamp(idx, &raw))
        .transpose()
}

fn patient_from_row(row: &Row) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get("id")?,
        record: PatientRecord {
            name: row.get("name")?,
            age: row.get("age")?,
            gender: row.get("gender")?,
            ethnicity: row.get("ethnicity")?,
            height_cm: row.get("height_cm")?,
            weight_kg: row.get("weight_kg")?,
            physical_activity: row.get("physical_activity")?,
            medical_history: row.get("medical_history")?,
            medications: row.get("medications")?,
            remarks: row.get("remarks")?,
            insulin_regimen_type: row.get("insulin_regimen_type")?,
            fvg: row.get("fvg")?,
            fvg_1: row.get("fvg_1")?,
            fvg_2: row.get("fvg_2")?,
            fvg_3: row.get("fvg_3")?,
            hba1c_1st_visit: row.get("hba1c_1st_visit")?,
            hba1c_2nd_visit: row.get("hba1c_2nd_visit")?,
            hba1c_3rd_visit: row.get("hba1c_3rd_visit")?,
            weight1: row.get("weight1")?,
            weight2: row.get("weight2")?,
            weight3: row.get("weight3")?,
            bmi1: row.get("bmi1")?,
            bmi3: row.get("bmi3")?,
            sbp: row.get("sbp")?,
            dbp: row.get("dbp")?,
            egfr: row.get("egfr")?,
            egfr1: row.get("egfr1")?,
            egfr3: row.get("egfr3")?,
            uacr1: row.get("uacr1")?,
            uacr3: row.get("uacr3")?,
            dds_1: row.get("dds_1")?,
            dds_3: row.get("dds_3")?,
            freq_smbg: row.get("freq_smbg")?,
            first_visit_date: opt_date(row, "first_visit_date")?,
            second_visit_date: opt_date(row, "second_visit_date")?,
            third_visit_date: opt_date(row, "third_visit_date")?,
            gap_from_initial_visit: row.get("gap_from_initial_visit")?,
            gap_from_first_clinical_visit: row.get("gap_from_first_clinical_visit")?,
            user_id: row.get("user_id")?,
            assigned_doctor_id: row.get("assigned_doctor_id")?,
        },
        derived: DerivedMetrics {
            avg_fvg_1_2: row.get("avg_fvg_1_2")?,
            fvg_delta_1_2: row.get("fvg_delta_1_2")?,
            reduction_a: row.get("reduction_a")?,
            reduction_a_per_day: row.get("reduction_a_per_day")?,
            gap_1_2_days: row.get("gap_1_2_days")?,
            gap_2_3_days: row.get("gap_2_3_days")?,
            dds_trend_1_3: row.get("dds_trend_1_3")?,
            reduction_a_2_3: row.get("reduction_a_2_3")?,
        },
        risk: RiskSnapshot {
            last_risk_score: row.get("last_risk_score")?,
            last_risk_label: row.get("last_risk_label")?,
            risk_model_version: row.get("risk_model_version")?,
            last_predicted_at: opt_timestamp(row, "last_predicted_at")?,
        },
        created_at: timestamp(row, "created_at")?,
        updated_at: timestamp(row, "updated_at")?,
    })
}

pub fn insert_patient(
    conn: &Connection,
    record: &PatientRecord,
    derived: &DerivedMetrics,
    now: NaiveDateTime,
) -> Result<i64, DatabaseError> {
    let mut values = record_values(record, derived);
    values.push(col("assigned_doctor_id", record.assigned_doctor_id));
    values.push(col("created_at", format_timestamp(&now)));
    values.push(col("updated_at", format_timestamp(&now)));

    let columns: Vec<&str> = values.iter().map(|(c, _)| *c).collect();
    let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "INSERT INTO patients ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    );
    let bound: Vec<&dyn ToSql> = values.iter().map(|(_, v)| v.as_ref()).collect();
    conn.execute(&sql, bound.as_slice()).map_err(map_constraint)?;
    Ok(conn.last_insert_rowid())
}

/// Replace the clinician-entered fields and derived metrics of a patient.
/// The doctor assignment and risk snapshot are left untouched.
pub fn update_patient(
    conn: &Connection,
    id: i64,
    record: &PatientRecord,
    derived: &DerivedMetrics,
    now: NaiveDateTime,
) -> Result<(), DatabaseError> {
    let mut values = record_values(record, derived);
    values.push(col("updated_at", format_timestamp(&now)));

    let assignments: Vec<String> = values
        .iter()
        .enumerate()
        .map(|(i, (c, _))| format!("{c} = ?{}", i + 1))
        .collect();
    let sql = format!(
        "UPDATE patients SET {} WHERE id = ?{}",
        assignments.join(", "),
        values.len() + 1
    );
    let mut bound: Vec<&dyn ToSql> = values.iter().map(|(_, v)| v.as_ref()).collect();
    bound.push(&id);

    let changed = conn.execute(&sql, bound.as_slice()).map_err(map_constraint)?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Patient", id));
    }
    Ok(())
}

pub fn get_patient(conn: &Connection, id: i64) -> Result<Patient, DatabaseError> {
    conn.query_row("SELECT * FROM patients WHERE id = ?1", params![id], patient_from_row)
        .optional()?
        .ok_or_else(|| DatabaseError::not_found("Patient", id))
}

/// Patient record linked to a user account.
pub fn get_patient_by_user(conn: &Connection, user_id: i64) -> Result<Patient, DatabaseError> {
    conn.query_row(
        "SELECT * FROM patients WHERE user_id = ?1 ORDER BY id LIMIT 1",
        params![user_id],
        patient_from_row,
    )
    .optional()?
    .ok_or_else(|| DatabaseError::NotFound {
        entity_type: "Patient for user".into(),
        id: user_id.to_string(),
    })
}

/// List patients matching the SQL-expressible filters, newest update first.
pub fn list_patients(
    conn: &Connection,
    filter: &PatientFilter,
) -> Result<Vec<Patient>, DatabaseError> {
    let mut sql = String::from("SELECT * FROM patients WHERE 1=1");
    let mut params_vec: Vec<Box<dyn ToSql>> = Vec::new();
    let mut idx = 1;

    if let Some(ref search) = filter.search {
        if !search.trim().is_empty() {
            sql.push_str(&format!(" AND name LIKE ?{idx} ESCAPE '\\'"));
            params_vec.push(Box::new(like_pattern(search)));
            idx += 1;
        }
    }
    if let Some(ref insulin) = filter.insulin {
        if !insulin.trim().is_empty() {
            sql.push_str(&format!(
                " AND LOWER(TRIM(insulin_regimen_type)) = LOWER(TRIM(?{idx}))"
            ));
            params_vec.push(Box::new(insulin.clone()));
            idx += 1;
        }
    }
    if let Some(ref gender) = filter.gender {
        if !gender.is_empty() {
            sql.push_str(&format!(" AND gender = ?{idx}"));
            params_vec.push(Box::new(gender.clone()));
            idx += 1;
        }
    }
    if let Some(doctor_id) = filter.doctor_id {
        sql.push_str(&format!(" AND assigned_doctor_id = ?{idx}"));
        params_vec.push(Box::new(doctor_id));
    }

    sql.push_str(" ORDER BY updated_at DESC, id DESC");

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(param_refs.as_slice(), patient_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn delete_patient(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let changed = conn.execute("DELETE FROM patients WHERE id = ?1", params![id])?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Patient", id));
    }
    Ok(())
}

pub fn assign_doctor(
    conn: &Connection,
    id: i64,
    doctor_id: Option<i64>,
    now: NaiveDateTime,
) -> Result<(), DatabaseError> {
    let changed = conn
        .execute(
            "UPDATE patients SET assigned_doctor_id = ?1, updated_at = ?2 WHERE id = ?3",
            params![doctor_id, format_timestamp(&now), id],
        )
        .map_err(map_constraint)?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Patient", id));
    }
    Ok(())
}

pub fn save_risk_snapshot(
    conn: &Connection,
    id: i64,
    snapshot: &RiskSnapshot,
    now: NaiveDateTime,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE patients
         SET last_risk_score = ?1, last_risk_label = ?2, risk_model_version = ?3,
             last_predicted_at = ?4, updated_at = ?5
         WHERE id = ?6",
        params![
            snapshot.last_risk_score,
            snapshot.last_risk_label,
            snapshot.risk_model_version,
            snapshot.last_predicted_at.as_ref().map(format_timestamp),
            format_timestamp(&now),
            id,
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Patient", id));
    }
    Ok(())
}

/// Write a predicted HbA1c into visit 3 along with the visit 2 to 3 reduction.
pub fn apply_predicted_hba1c3(
    conn: &Connection,
    id: i64,
    value: f64,
    reduction_a_2_3: Option<f64>,
    now: NaiveDateTime,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE patients
         SET hba1c_3rd_visit = ?1, reduction_a_2_3 = ?2, updated_at = ?3
         WHERE id = ?4",
        params![value, reduction_a_2_3, format_timestamp(&now), id],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Patient", id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::insert_user;
    use crate::db::sqlite::open_memory_database;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn record(name: &str) -> PatientRecord {
        PatientRecord {
            name: name.into(),
            gender: Some("Female".into()),
            age: Some(47),
            insulin_regimen_type: Some("Basal-Bolus".into()),
            hba1c_1st_visit: Some(8.9),
            hba1c_2nd_visit: Some(8.1),
            first_visit_date: NaiveDate::from_ymd_opt(2025, 1, 5),
            ..Default::default()
        }
    }

    fn doctor(conn: &Connection, email: &str) -> i64 {
        insert_user(
            conn,
            &NewUser {
                name: "Dr. Mensah".into(),
                email: email.into(),
                role: UserRole::Doctor,
            },
            at(1, 8),
        )
        .unwrap()
        .id
    }

    #[test]
    fn insert_and_get_round_trip() {
        let conn = open_memory_database().unwrap();
        let derived = DerivedMetrics {
            reduction_a: Some(0.8),
            ..Default::default()
        };
        let id = insert_patient(&conn, &record("Grace"), &derived, at(2, 9)).unwrap();
        let patient = get_patient(&conn, id).unwrap();
        assert_eq!(patient.record.name, "Grace");
        assert_eq!(patient.record.first_visit_date, NaiveDate::from_ymd_opt(2025, 1, 5));
        assert_eq!(patient.derived.reduction_a, Some(0.8));
        assert_eq!(patient.created_at, at(2, 9));
        assert!(patient.risk.last_predicted_at.is_none());
    }

    #[test]
    fn update_replaces_fields_and_keeps_created_at() {
        let conn = open_memory_database().unwrap();
        let id = insert_patient(&conn, &record("Grace"), &DerivedMetrics::default(), at(2, 9)).unwrap();
        let mut changed = record("Grace Owusu");
        changed.hba1c_3rd_visit = Some(7.2);
        update_patient(&conn, id, &changed, &DerivedMetrics::default(), at(4, 10)).unwrap();

        let patient = get_patient(&conn, id).unwrap();
        assert_eq!(patient.record.name, "Grace Owusu");
        assert_eq!(patient.record.hba1c_3rd_visit, Some(7.2));
        assert_eq!(patient.created_at, at(2, 9));
        assert_eq!(patient.updated_at, at(4, 10));
    }

    #[test]
    fn update_keeps_doctor_assignment() {
        let conn = open_memory_database().unwrap();
        let doc = doctor(&conn, "osei@clinic.test");
        let id = insert_patient(&conn, &record("Grace"), &DerivedMetrics::default(), at(2, 9)).unwrap();
        assign_doctor(&conn, id, Some(doc), at(3, 9)).unwrap();

        let replacement = record("Grace Owusu");
        assert_eq!(replacement.assigned_doctor_id, None);
        update_patient(&conn, id, &replacement, &DerivedMetrics::default(), at(4, 10)).unwrap();
        assert_eq!(get_patient(&conn, id).unwrap().record.assigned_doctor_id, Some(doc));
    }

    #[test]
    fn update_missing_patient_is_not_found() {
        let conn = open_memory_database().unwrap();
        let err = update_patient(&conn, 99, &record("X"), &DerivedMetrics::default(), at(2, 9)).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn list_applies_sql_filters() {
        let conn = open_memory_database().unwrap();
        let doc = doctor(&conn, "mensah@clinic.test");
        let mut a = record("Ama Boateng");
        a.assigned_doctor_id = Some(doc);
        insert_patient(&conn, &a, &DerivedMetrics::default(), at(2, 9)).unwrap();

        let mut b = record("Kofi Annan");
        b.gender = Some("Male".into());
        b.insulin_regimen_type = Some("  premixed ".into());
        insert_patient(&conn, &b, &DerivedMetrics::default(), at(3, 9)).unwrap();

        let all = list_patients(&conn, &PatientFilter::default()).unwrap();
        assert_eq!(all[0].record.name, "Kofi Annan");

        let by_name = list_patients(&conn, &PatientFilter { search: Some("boa".into()), ..Default::default() }).unwrap();
        assert_eq!(by_name.len(), 1);

        let by_insulin = list_patients(&conn, &PatientFilter { insulin: Some("Premixed".into()), ..Default::default() }).unwrap();
        assert_eq!(by_insulin[0].record.name, "Kofi Annan");

        let by_gender = list_patients(&conn, &PatientFilter { gender: Some("Female".into()), ..Default::default() }).unwrap();
        assert_eq!(by_gender.len(), 1);

        let by_doctor = list_patients(&conn, &PatientFilter { doctor_id: Some(doc), ..Default::default() }).unwrap();
        assert_eq!(by_doctor[0].record.name, "Ama Boateng");
    }

    #[test]
    fn search_treats_percent_literally() {
        let conn = open_memory_database().unwrap();
        insert_patient(&conn, &record("Ama"), &DerivedMetrics::default(), at(2, 9)).unwrap();
        let found = list_patients(&conn, &PatientFilter { search: Some("%".into()), ..Default::default() }).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn find_by_user_account() {
        let conn = open_memory_database().unwrap();
        let user_id = insert_user(
            &conn,
            &NewUser { name: "Ama".into(), email: "ama@home.test".into(), role: UserRole::Patient },
            at(1, 8),
        )
        .unwrap()
        .id;
        let mut r = record("Ama");
        r.user_id = Some(user_id);
        let id = insert_patient(&conn, &r, &DerivedMetrics::default(), at(2, 9)).unwrap();
        assert_eq!(get_patient_by_user(&conn, user_id).unwrap().id, id);
        assert!(get_patient_by_user(&conn, user_id + 1).is_err());
    }

    #[test]
    fn assign_doctor_and_unknown_doctor() {
        let conn = open_memory_database().unwrap();
        let doc = doctor(&conn, "d@clinic.test");
        let id = insert_patient(&conn, &record("Ama"), &DerivedMetrics::default(), at(2, 9)).unwrap();
        assign_doctor(&conn, id, Some(doc), at(3, 9)).unwrap();
        assert_eq!(get_patient(&conn, id).unwrap().record.assigned_doctor_id, Some(doc));

        let err = assign_doctor(&conn, id, Some(doc + 100), at(3, 9)).unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));
    }

    #[test]
    fn risk_snapshot_and_applied_prediction_persist() {
        let conn = open_memory_database().unwrap();
        let id = insert_patient(&conn, &record("Ama"), &DerivedMetrics::default(), at(2, 9)).unwrap();
        save_risk_snapshot(
            &conn,
            id,
            &RiskSnapshot {
                last_risk_score: Some(7.4),
                last_risk_label: Some("Risky".into()),
                risk_model_version: Some("risk_v1".into()),
                last_predicted_at: Some(at(5, 11)),
            },
            at(5, 11),
        )
        .unwrap();
        apply_predicted_hba1c3(&conn, id, 7.5, Some(0.6), at(5, 12)).unwrap();

        let patient = get_patient(&conn, id).unwrap();
        assert_eq!(patient.risk.last_risk_label.as_deref(), Some("Risky"));
        assert_eq!(patient.risk.last_predicted_at, Some(at(5, 11)));
        assert_eq!(patient.record.hba1c_3rd_visit, Some(7.5));
        assert_eq!(patient.derived.reduction_a_2_3, Some(0.6));
    }

    #[test]
    fn delete_removes_patient() {
        let conn = open_memory_database().unwrap();
        let id = insert_patient(&conn, &record("Ama"), &DerivedMetrics::default(), at(2, 9)).unwrap();
        delete_patient(&conn, id).unwrap();
        assert!(get_patient(&conn, id).is_err());
        assert!(matches!(delete_patient(&conn, id), Err(DatabaseError::NotFound { .. })));
    }
}
