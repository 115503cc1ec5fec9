use math_core::model::{Difficulty, Mode, Profile, ProfileId, SessionSummary};
use sqlx::Row;
use uuid::Uuid;

use crate::repository::{HistoryEntry, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn u8_from_i64(field: &'static str, v: i64) -> Result<u8, StorageError> {
    u8::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn profile_id_from_row(
    row: &sqlx::sqlite::SqliteRow,
    column: &str,
) -> Result<ProfileId, StorageError> {
    let id: Uuid = row.try_get(column).map_err(ser)?;
    Ok(ProfileId::from_uuid(id))
}

pub(crate) fn map_profile_row(row: &sqlx::sqlite::SqliteRow) -> Result<Profile, StorageError> {
    Profile::new(
        profile_id_from_row(row, "id")?,
        row.try_get::<String, _>("name").map_err(ser)?,
        u8_from_i64("age", row.try_get::<i64, _>("age").map_err(ser)?)?,
        u8_from_i64("grade", row.try_get::<i64, _>("grade").map_err(ser)?)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_history_row(row: &sqlx::sqlite::SqliteRow) -> Result<HistoryEntry, StorageError> {
    let mode: Mode = row
        .try_get::<String, _>("mode")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let difficulty: Difficulty = row
        .try_get::<String, _>("difficulty")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;

    let summary = SessionSummary::from_persisted(
        row.try_get("completed_at").map_err(ser)?,
        mode,
        u32_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?,
        u32_from_i64("total", row.try_get::<i64, _>("total").map_err(ser)?)?,
        difficulty,
    )
    .map_err(ser)?;

    Ok(HistoryEntry {
        id: row.try_get("id").map_err(ser)?,
        profile_id: profile_id_from_row(row, "profile_id")?,
        summary,
    })
}

/// A missing parent row shows up as a foreign key failure.
pub(crate) fn missing_parent_or_conn(e: sqlx::Error) -> StorageError {
    match e.as_database_error() {
        Some(db) if db.is_foreign_key_violation() => StorageError::NotFound,
        _ => conn(e),
    }
}
