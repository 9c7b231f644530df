use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{format_date, format_timestamp, like_pattern, map_constraint, parse_date, parse_timestamp};
use crate::db::DatabaseError;
use crate::models::*;

const APPOINTMENT_SELECT: &str =
    "SELECT a.id, a.patient_id, a.doctor_id, a.date, a.time, a.type, a.notes,
            a.duration_minutes, a.status, a.created_at, a.updated_at, p.name
     FROM appointments a
     LEFT JOIN patients p ON p.id = a.patient_id";

fn appointment_from_row(row: &Row) -> rusqlite::Result<AppointmentWithPatient> {
    let date: String = row.get(3)?;
    let status: String = row.get(8)?;
    let created_at: String = row.get(9)?;
    let updated_at: String = row.get(10)?;
    Ok(AppointmentWithPatient {
        appointment: Appointment {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            doctor_id: row.get(2)?,
            date: parse_date(3, &date)?,
            time: row.get(4)?,
            appointment_type: row.get(5)?,
            notes: row.get(6)?,
            duration_minutes: row.get(7)?,
            status: status.parse().map_err(|e: DatabaseError| {
                rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
            })?,
            created_at: parse_timestamp(9, &created_at)?,
            updated_at: parse_timestamp(10, &updated_at)?,
        },
        patient_name: row.get(11)?,
    })
}

pub fn insert_appointment(
    conn: &Connection,
    appt: &NewAppointment,
    status: AppointmentStatus,
    now: NaiveDateTime,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO appointments
            (patient_id, doctor_id, date, time, type, notes, duration_minutes, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
        params![
            appt.patient_id,
            appt.doctor_id,
            format_date(&appt.date),
            appt.time.as_deref().map(str::trim),
            appt.appointment_type,
            appt.notes,
            appt.duration_minutes,
            status.as_str(),
            format_timestamp(&now),
        ],
    )
    .map_err(map_constraint)?;
    Ok(conn.last_insert_rowid())
}

pub fn get_appointment(conn: &Connection, id: i64) -> Result<AppointmentWithPatient, DatabaseError> {
    conn.query_row(
        &format!("{APPOINTMENT_SELECT} WHERE a.id = ?1"),
        params![id],
        appointment_from_row,
    )
    .optional()?
    .ok_or_else(|| DatabaseError::not_found("Appointment", id))
}

/// List appointments in chronological order, filtered by doctor, patient,
/// inclusive date range and patient-name search.
pub fn list_appointments(
    conn: &Connection,
    filter: &AppointmentFilter,
) -> Result<Vec<AppointmentWithPatient>, DatabaseError> {
    let mut sql = format!("{APPOINTMENT_SELECT} WHERE 1=1");
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    let mut idx = 1;

    if let Some(doctor_id) = filter.doctor_id {
        sql.push_str(&format!(" AND a.doctor_id = ?{idx}"));
        params_vec.push(Box::new(doctor_id));
        idx += 1;
    }
    if let Some(patient_id) = filter.patient_id {
        sql.push_str(&format!(" AND a.patient_id = ?{idx}"));
        params_vec.push(Box::new(patient_id));
        idx += 1;
    }
    if let Some(from) = filter.date_from {
        sql.push_str(&format!(" AND a.date >= ?{idx}"));
        params_vec.push(Box::new(format_date(&from)));
        idx += 1;
    }
    if let Some(to) = filter.date_to {
        sql.push_str(&format!(" AND a.date <= ?{idx}"));
        params_vec.push(Box::new(format_date(&to)));
        idx += 1;
    }
    if let Some(ref search) = filter.search {
        if !search.trim().is_empty() {
            sql.push_str(&format!(" AND p.name LIKE ?{idx} ESCAPE '\\'"));
            params_vec.push(Box::new(like_pattern(search)));
        }
    }

    sql.push_str(" ORDER BY a.date ASC, a.time ASC, a.id ASC");

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::types::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(param_refs.as_slice(), appointment_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Rewrite every editable field of an appointment.
pub fn update_appointment(
    conn: &Connection,
    id: i64,
    appt: &NewAppointment,
    status: AppointmentStatus,
    now: NaiveDateTime,
) -> Result<(), DatabaseError> {
    let changed = conn
        .execute(
            "UPDATE appointments
             SET patient_id = ?1, doctor_id = ?2, date = ?3, time = ?4, type = ?5,
                 notes = ?6, duration_minutes = ?7, status = ?8, updated_at = ?9
             WHERE id = ?10",
            params![
                appt.patient_id,
                appt.doctor_id,
                format_date(&appt.date),
                appt.time.as_deref().map(str::trim),
                appt.appointment_type,
                appt.notes,
                appt.duration_minutes,
                status.as_str(),
                format_timestamp(&now),
                id,
            ],
        )
        .map_err(map_constraint)?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Appointment", id));
    }
    Ok(())
}

/// Record a clinician's status action on an appointment.
pub fn update_appointment_status(
    conn: &Connection,
    id: i64,
    status: AppointmentStatus,
    now: NaiveDateTime,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), format_timestamp(&now), id],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Appointment", id));
    }
    Ok(())
}

pub fn delete_appointment(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let changed = conn.execute("DELETE FROM appointments WHERE id = ?1", params![id])?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Appointment", id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{delete_patient, insert_patient, insert_user};
    use crate::db::sqlite::open_memory_database;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn seed(conn: &Connection) -> (i64, i64, i64) {
        let doctor = insert_user(
            conn,
            &NewUser { name: "Dr. Addo".into(), email: "addo@clinic.test".into(), role: UserRole::Doctor },
            now(),
        )
        .unwrap()
        .id;
        let ama = insert_patient(
            conn,
            &PatientRecord { name: "Ama Serwaa".into(), gender: Some("Female".into()), ..Default::default() },
            &DerivedMetrics::default(),
            now(),
        )
        .unwrap();
        let kojo = insert_patient(
            conn,
            &PatientRecord { name: "Kojo Mensah".into(), gender: Some("Male".into()), ..Default::default() },
            &DerivedMetrics::default(),
            now(),
        )
        .unwrap();
        (doctor, ama, kojo)
    }

    fn new_appt(patient_id: i64, doctor_id: i64, day: u32, time: &str) -> NewAppointment {
        NewAppointment {
            patient_id,
            doctor_id,
            date: NaiveDate::from_ymd_opt(2025, 6, day).unwrap(),
            time: Some(time.into()),
            appointment_type: Some("Follow-up".into()),
            notes: None,
            duration_minutes: Some(20),
            status: None,
        }
    }

    #[test]
    fn insert_and_get_includes_patient_name() {
        let conn = open_memory_database().unwrap();
        let (doctor, ama, _) = seed(&conn);
        let id = insert_appointment(&conn, &new_appt(ama, doctor, 3, "10:00"), AppointmentStatus::Scheduled, now()).unwrap();

        let appt = get_appointment(&conn, id).unwrap();
        assert_eq!(appt.patient_name.as_deref(), Some("Ama Serwaa"));
        assert_eq!(appt.appointment.status, AppointmentStatus::Scheduled);
        assert_eq!(appt.appointment.time.as_deref(), Some("10:00"));
    }

    #[test]
    fn unknown_doctor_violates_foreign_key() {
        let conn = open_memory_database().unwrap();
        let (doctor, ama, _) = seed(&conn);
        let err = insert_appointment(&conn, &new_appt(ama, doctor + 50, 3, "10:00"), AppointmentStatus::Scheduled, now())
            .unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));
    }

    #[test]
    fn list_is_chronological_and_filtered() {
        let conn = open_memory_database().unwrap();
        let (doctor, ama, kojo) = seed(&conn);
        insert_appointment(&conn, &new_appt(kojo, doctor, 9, "08:00"), AppointmentStatus::Scheduled, now()).unwrap();
        insert_appointment(&conn, &new_appt(ama, doctor, 4, "14:00"), AppointmentStatus::Scheduled, now()).unwrap();
        insert_appointment(&conn, &new_appt(ama, doctor, 4, "09:30"), AppointmentStatus::Completed, now()).unwrap();

        let all = list_appointments(&conn, &AppointmentFilter::default()).unwrap();
        let times: Vec<&str> = all.iter().map(|a| a.appointment.time.as_deref().unwrap()).collect();
        assert_eq!(times, vec!["09:30", "14:00", "08:00"]);

        let ranged = list_appointments(
            &conn,
            &AppointmentFilter {
                date_from: NaiveDate::from_ymd_opt(2025, 6, 5),
                date_to: NaiveDate::from_ymd_opt(2025, 6, 9),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(ranged.len(), 1);

        let searched = list_appointments(
            &conn,
            &AppointmentFilter { search: Some("serwaa".into()), ..Default::default() },
        )
        .unwrap();
        assert_eq!(searched.len(), 2);

        let by_patient = list_appointments(
            &conn,
            &AppointmentFilter { patient_id: Some(kojo), doctor_id: Some(doctor), ..Default::default() },
        )
        .unwrap();
        assert_eq!(by_patient.len(), 1);
    }

    #[test]
    fn full_update_moves_appointment_to_other_patient() {
        let conn = open_memory_database().unwrap();
        let (doctor, ama, kojo) = seed(&conn);
        let id = insert_appointment(&conn, &new_appt(ama, doctor, 3, "10:00"), AppointmentStatus::Scheduled, now()).unwrap();

        let later = now() + chrono::Duration::hours(1);
        update_appointment(&conn, id, &new_appt(kojo, doctor, 5, " 15:30 "), AppointmentStatus::Completed, later).unwrap();
        let appt = get_appointment(&conn, id).unwrap();
        assert_eq!(appt.patient_name.as_deref(), Some("Kojo Mensah"));
        assert_eq!(appt.appointment.date, NaiveDate::from_ymd_opt(2025, 6, 5).unwrap());
        assert_eq!(appt.appointment.time.as_deref(), Some("15:30"));
        assert_eq!(appt.appointment.status, AppointmentStatus::Completed);
        assert_eq!(appt.appointment.created_at, now());
        assert_eq!(appt.appointment.updated_at, later);

        let err = update_appointment(&conn, id + 1, &new_appt(kojo, doctor, 5, "15:30"), AppointmentStatus::Scheduled, now())
            .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn status_update_and_missing_appointment() {
        let conn = open_memory_database().unwrap();
        let (doctor, ama, _) = seed(&conn);
        let id = insert_appointment(&conn, &new_appt(ama, doctor, 3, "10:00"), AppointmentStatus::Scheduled, now()).unwrap();
        update_appointment_status(&conn, id, AppointmentStatus::NoShow, now()).unwrap();
        assert_eq!(get_appointment(&conn, id).unwrap().appointment.status, AppointmentStatus::NoShow);

        let err = update_appointment_status(&conn, id + 1, AppointmentStatus::Completed, now()).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn deleting_patient_cascades_to_appointments() {
        let conn = open_memory_database().unwrap();
        let (doctor, ama, kojo) = seed(&conn);
        insert_appointment(&conn, &new_appt(ama, doctor, 3, "10:00"), AppointmentStatus::Scheduled, now()).unwrap();
        insert_appointment(&conn, &new_appt(kojo, doctor, 3, "11:00"), AppointmentStatus::Scheduled, now()).unwrap();

        delete_patient(&conn, ama).unwrap();
        let remaining = list_appointments(&conn, &AppointmentFilter::default()).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].appointment.patient_id, kojo);
    }

    #[test]
    fn delete_appointment_twice_is_not_found() {
        let conn = open_memory_database().unwrap();
        let (doctor, ama, _) = seed(&conn);
        let id = insert_appointment(&conn, &new_appt(ama, doctor, 3, "10:00"), AppointmentStatus::Scheduled, now()).unwrap();
        delete_appointment(&conn, id).unwrap();
        assert!(matches!(delete_appointment(&conn, id), Err(DatabaseError::NotFound { .. })));
    }
}
