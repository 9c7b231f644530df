use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{format_timestamp, map_constraint, parse_timestamp};
use crate::db::DatabaseError;
use crate::models::*;

const USER_COLUMNS: &str = "id, name, email, role, created_at";

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    let role: String = row.get(3)?;
    let created_at: String = row.get(4)?;
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role: role.parse().map_err(|e: DatabaseError| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?,
        created_at: parse_timestamp(4, &created_at)?,
    })
}

pub fn insert_user(
    conn: &Connection,
    user: &NewUser,
    now: NaiveDateTime,
) -> Result<User, DatabaseError> {
    conn.execute(
        "INSERT INTO users (name, email, role, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            user.name.trim(),
            user.email.trim().to_lowercase(),
            user.role.as_str(),
            format_timestamp(&now),
        ],
    )
    .map_err(map_constraint)?;
    get_user(conn, conn.last_insert_rowid())
}

pub fn get_user(conn: &Connection, id: i64) -> Result<User, DatabaseError> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![id],
        user_from_row,
    )
    .optional()?
    .ok_or_else(|| DatabaseError::not_found("User", id))
}

pub fn list_users(conn: &Connection, filter: &UserFilter) -> Result<Vec<User>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users
         WHERE (?1 IS NULL OR role = ?1)
         ORDER BY name, id"
    ))?;
    let rows = stmt.query_map(params![filter.role.map(|r| r.as_str())], user_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}
