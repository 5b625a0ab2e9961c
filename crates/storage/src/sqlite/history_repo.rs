use async_trait::async_trait;
use sqlx::Row;
use study_core::model::{HistoryEntry, HistoryEntryId, HistorySettings};

use crate::repository::{HistoryRepository, StorageError};

use super::SqliteRepository;
use super::mapping::{conn, history_payload, map_history_row, ser, u32_from_i64};

#[async_trait]
impl HistoryRepository for SqliteRepository {
    async fn append(&self, entry: &HistoryEntry) -> Result<(), StorageError> {
        let payload = history_payload(entry)?;
        let result = sqlx::query(
            r"
            INSERT INTO history_entries (id, recorded_at, percentage, payload)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(entry.id.to_string())
        .bind(entry.timestamp)
        .bind(i64::from(entry.quiz.percentage))
        .bind(payload)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StorageError::Conflict)
            }
            Err(err) => Err(conn(err)),
        }
    }

    async fn list(&self, limit: Option<u32>) -> Result<Vec<HistoryEntry>, StorageError> {
        // SQLite treats a negative LIMIT as unbounded.
        let limit = limit.map_or(-1, i64::from);
        let rows = sqlx::query(
            r"
            SELECT payload
            FROM history_entries
            ORDER BY recorded_at DESC, seq DESC
            LIMIT ?1
            ",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_history_row).collect()
    }

    async fn get(&self, id: HistoryEntryId) -> Result<HistoryEntry, StorageError> {
        let row = sqlx::query("SELECT payload FROM history_entries WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        match row {
            Some(row) => map_history_row(&row),
            None => Err(StorageError::NotFound),
        }
    }

    async fn delete(&self, id: HistoryEntryId) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM history_entries WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM history_entries")
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }

    async fn trim(&self, max_entries: u32) -> Result<u64, StorageError> {
        let result = sqlx::query(
            r"
            DELETE FROM history_entries
            WHERE seq NOT IN (
                SELECT seq
                FROM history_entries
                ORDER BY recorded_at DESC, seq DESC
                LIMIT ?1
            )
            ",
        )
        .bind(i64::from(max_entries))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(result.rows_affected())
    }

    async fn get_settings(&self) -> Result<Option<HistorySettings>, StorageError> {
        let row = sqlx::query("SELECT enabled, max_entries FROM history_settings WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let enabled: bool = row.try_get("enabled").map_err(ser)?;
        let max_entries: i64 = row.try_get("max_entries").map_err(ser)?;

        Ok(Some(HistorySettings {
            enabled,
            max_entries: u32_from_i64("max_entries", max_entries)?,
        }))
    }

    async fn save_settings(&self, settings: &HistorySettings) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO history_settings (id, enabled, max_entries)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                enabled = excluded.enabled,
                max_entries = excluded.max_entries
            ",
        )
        .bind(1_i64)
        .bind(settings.enabled)
        .bind(i64::from(settings.max_entries))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }
}
