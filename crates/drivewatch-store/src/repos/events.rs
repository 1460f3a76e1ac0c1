//! Event repository implementation
//!
//! The log is append-only: nothing here updates or deletes rows.

use drivewatch_core::domain::{ChangeEvent, NewChangeEvent};
use drivewatch_core::ports::{IEventRepository, StoreError};

use super::{append_event_in_tx, event_from_row, SqliteStateStore};
use crate::map_sqlx;

#[async_trait::async_trait]
impl IEventRepository for SqliteStateStore {
    async fn append(
        &self,
        item_internal_id: i64,
        event: NewChangeEvent,
    ) -> Result<ChangeEvent, StoreError> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx)?;
        let appended = append_event_in_tx(&mut tx, item_internal_id, &event).await?;
        tx.commit().await.map_err(map_sqlx)?;
        Ok(appended)
    }

    async fn append_many(&self, batch: Vec<(i64, NewChangeEvent)>) -> Result<(), StoreError> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx)?;

        for (item_internal_id, event) in &batch {
            append_event_in_tx(&mut tx, *item_internal_id, event).await?;
        }

        tx.commit().await.map_err(map_sqlx)?;

        tracing::trace!(count = batch.len(), "Appended event batch");
        Ok(())
    }

    async fn history_of(&self, item_internal_id: i64) -> Result<Vec<ChangeEvent>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM change_events WHERE item_internal_id = ? \
             ORDER BY timestamp DESC, id DESC",
        )
        .bind(item_internal_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx)?;

        rows.iter().map(event_from_row).collect()
    }
}
