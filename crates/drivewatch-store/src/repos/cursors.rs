//! Cursor repository implementation
//!
//! At most one row per drive. A NULL cursor means the next sync is a full
//! sync; `set` also stamps last-sync-at.

use sqlx::Row;

use drivewatch_core::domain::{DeltaCursor, DriveId};
use drivewatch_core::ports::{ICursorRepository, StoreError};

use super::SqliteStateStore;
use crate::{format_datetime, map_sqlx};

#[async_trait::async_trait]
impl ICursorRepository for SqliteStateStore {
    async fn get(&self, drive_id: &DriveId) -> Result<Option<DeltaCursor>, StoreError> {
        let row = sqlx::query("SELECT cursor FROM drive_cursors WHERE drive_id = ?")
            .bind(drive_id.as_str())
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx)?;

        let stored: Option<String> = match row {
            Some(ref r) => r.get("cursor"),
            None => None,
        };

        match stored {
            Some(value) if !value.is_empty() => DeltaCursor::new(value)
                .map(Some)
                .map_err(|e| StoreError::Serialization(format!("bad stored cursor: {e}"))),
            _ => Ok(None),
        }
    }

    async fn set(&self, drive_id: &DriveId, cursor: &DeltaCursor) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO drive_cursors (drive_id, cursor, last_sync_at) VALUES (?, ?, ?) \
             ON CONFLICT(drive_id) DO UPDATE SET \
               cursor = excluded.cursor, last_sync_at = excluded.last_sync_at",
        )
        .bind(drive_id.as_str())
        .bind(cursor.as_str())
        .bind(format_datetime(chrono::Utc::now()))
        .execute(self.pool())
        .await
        .map_err(map_sqlx)?;

        tracing::debug!(drive_id = %drive_id, "Cursor advanced");
        Ok(())
    }

    async fn clear(&self, drive_id: &DriveId) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO drive_cursors (drive_id, cursor, last_sync_at) VALUES (?, NULL, NULL) \
             ON CONFLICT(drive_id) DO UPDATE SET cursor = NULL",
        )
        .bind(drive_id.as_str())
        .execute(self.pool())
        .await
        .map_err(map_sqlx)?;

        tracing::info!(drive_id = %drive_id, "Cursor cleared; next sync will be full");
        Ok(())
    }
}
