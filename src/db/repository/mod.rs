//! Repository layer: entity-scoped database operations.
//!
//! Every function takes a borrowed `Connection` and returns
//! `Result<_, DatabaseError>`. Dates are stored as `YYYY-MM-DD` text and
//! timestamps as `YYYY-MM-DD HH:MM:SS` text.

mod appointment;
mod patient;
mod user;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Type;

use super::DatabaseError;

pub use appointment::*;
pub use patient::*;
pub use user::*;

pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn parse_timestamp(column: usize, raw: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

pub(crate) fn parse_date(column: usize, raw: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

/// Surface SQLite constraint failures (foreign keys, unique emails) as
/// `ConstraintViolation` so the API can report them as bad requests.
pub(crate) fn map_constraint(err: rusqlite::Error) -> DatabaseError {
    match &err {
        rusqlite::Error::SqliteFailure(e, msg)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            DatabaseError::ConstraintViolation(
                msg.clone().unwrap_or_else(|| "constraint failed".to_string()),
            )
        }
        _ => DatabaseError::Sqlite(err),
    }
}

/// `%term%` pattern for `LIKE` with wildcards in the term escaped.
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_round_trip_through_text() {
        let ts = NaiveDate::from_ymd_opt(2025, 2, 3)
            .unwrap()
            .and_hms_opt(14, 5, 9)
            .unwrap();
        let text = format_timestamp(&ts);
        assert_eq!(text, "2025-02-03 14:05:09");
        assert_eq!(parse_timestamp(0, &text).unwrap(), ts);
    }

    #[test]
    fn bad_date_is_conversion_failure() {
        let err = parse_date(3, "03/02/2025").unwrap_err();
        assert!(matches!(err, rusqlite::Error::FromSqlConversionFailure(3, Type::Text, _)));
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" ann "), "%ann%");
        assert_eq!(like_pattern("50%_x"), "%50\\%\\_x%");
    }
}
