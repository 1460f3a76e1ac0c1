//! Item repository implementation
//!
//! The `*_with_event` operations are the apply-one-item commit points:
//! item mutation and event append share one transaction, so replaying a
//! page after a crash can never leave an item without its audit record or
//! vice versa.

use drivewatch_core::domain::{ExternalId, ItemRecord, ItemUpsert, NewChangeEvent};
use drivewatch_core::ports::{IItemRepository, StoreError};

use super::{
    append_event_in_tx, item_from_row, mark_deleted_in_tx, upsert_item_in_tx, SqliteStateStore,
};
use crate::map_sqlx;

#[async_trait::async_trait]
impl IItemRepository for SqliteStateStore {
    async fn lookup_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<ItemRecord>, StoreError> {
        let row = sqlx::query("SELECT * FROM items WHERE external_id = ?")
            .bind(external_id.as_str())
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx)?;

        row.as_ref().map(item_from_row).transpose()
    }

    async fn lookup_by_internal_id(
        &self,
        internal_id: i64,
    ) -> Result<Option<ItemRecord>, StoreError> {
        let row = sqlx::query("SELECT * FROM items WHERE internal_id = ?")
            .bind(internal_id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx)?;

        row.as_ref().map(item_from_row).transpose()
    }

    async fn upsert(&self, upsert: ItemUpsert) -> Result<ItemRecord, StoreError> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx)?;
        let item = upsert_item_in_tx(&mut tx, &upsert).await?;
        tx.commit().await.map_err(map_sqlx)?;

        tracing::trace!(internal_id = item.internal_id, "Upserted item");
        Ok(item)
    }

    async fn mark_deleted(&self, internal_id: i64) -> Result<(), StoreError> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx)?;
        mark_deleted_in_tx(&mut tx, internal_id).await?;
        tx.commit().await.map_err(map_sqlx)?;

        tracing::trace!(internal_id, "Marked item deleted");
        Ok(())
    }

    async fn children_of(&self, internal_id: i64) -> Result<Vec<ItemRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM items WHERE parent_internal_id = ? ORDER BY internal_id ASC",
        )
        .bind(internal_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx)?;

        rows.iter().map(item_from_row).collect()
    }

    async fn bulk_upsert(&self, batch: Vec<ItemUpsert>) -> Result<Vec<ItemRecord>, StoreError> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx)?;

        let mut items = Vec::with_capacity(batch.len());
        for upsert in &batch {
            items.push(upsert_item_in_tx(&mut tx, upsert).await?);
        }

        tx.commit().await.map_err(map_sqlx)?;

        tracing::trace!(count = items.len(), "Bulk-upserted items");
        Ok(items)
    }

    async fn upsert_with_event(
        &self,
        upsert: ItemUpsert,
        event: NewChangeEvent,
    ) -> Result<ItemRecord, StoreError> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx)?;

        let item = upsert_item_in_tx(&mut tx, &upsert).await?;
        append_event_in_tx(&mut tx, item.internal_id, &event).await?;

        tx.commit().await.map_err(map_sqlx)?;

        tracing::trace!(
            internal_id = item.internal_id,
            event = %event.kind,
            "Applied item mutation with event"
        );
        Ok(item)
    }

    async fn mark_deleted_with_event(
        &self,
        internal_id: i64,
        event: NewChangeEvent,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx)?;

        mark_deleted_in_tx(&mut tx, internal_id).await?;
        append_event_in_tx(&mut tx, internal_id, &event).await?;

        tx.commit().await.map_err(map_sqlx)?;

        tracing::trace!(internal_id, "Applied soft delete with event");
        Ok(())
    }
}
