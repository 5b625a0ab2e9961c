use sqlx::Row;
use study_core::model::HistoryEntry;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} out of range")))
}

pub(crate) fn history_payload(entry: &HistoryEntry) -> Result<String, StorageError> {
    serde_json::to_string(entry).map_err(ser)
}

pub(crate) fn map_history_row(row: &sqlx::sqlite::SqliteRow) -> Result<HistoryEntry, StorageError> {
    let payload: String = row.try_get("payload").map_err(ser)?;
    serde_json::from_str(&payload).map_err(ser)
}
