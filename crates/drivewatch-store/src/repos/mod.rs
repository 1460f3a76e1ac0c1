//! SQLite implementations of the repository ports
//!
//! One store struct implements all four ports over a shared pool. Row
//! mapping reconstructs domain types from TEXT columns and classifies
//! every failure through the `StoreError` taxonomy.
//!
//! ## Type Mapping
//!
//! | Domain Type      | SQL Type | Strategy                                |
//! |------------------|----------|-----------------------------------------|
//! | DriveId et al.   | TEXT     | string via `.as_str()` / `::new()`      |
//! | ItemKind         | TEXT     | `as_str()` / `parse()`                  |
//! | ChangeKind       | TEXT     | `as_str()` / `parse()`                  |
//! | DateTime<Utc>    | TEXT     | RFC 3339, fixed microsecond precision   |
//! | deleted flag     | INTEGER  | 0/1                                     |

pub mod cursors;
pub mod events;
pub mod items;
pub mod subscriptions;

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

use drivewatch_core::domain::{
    ChangeEvent, ChangeKind, DriveId, ExternalId, ItemKind, ItemRecord, ItemUpsert,
    NewChangeEvent, Subscription, SubscriptionId,
};
use drivewatch_core::ports::StoreError;

use crate::{format_datetime, map_sqlx, parse_datetime};

/// SQLite-backed implementation of all four repository ports
pub struct SqliteStateStore {
    pool: SqlitePool,
}

impl SqliteStateStore {
    /// Creates a new store instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

// ============================================================================
// Row mapping
// ============================================================================

pub(crate) fn item_from_row(row: &SqliteRow) -> Result<ItemRecord, StoreError> {
    let drive_id_str: String = row.get("drive_id");
    let external_id_str: String = row.get("external_id");
    let kind_str: String = row.get("kind");
    let created_at_str: String = row.get("created_at");
    let modified_at_str: String = row.get("modified_at");
    let deleted: i64 = row.get("deleted");

    let drive_id = DriveId::new(drive_id_str)
        .map_err(|e| StoreError::Serialization(format!("bad drive_id in row: {e}")))?;
    let external_id = ExternalId::new(external_id_str)
        .map_err(|e| StoreError::Serialization(format!("bad external_id in row: {e}")))?;
    let kind = ItemKind::parse(&kind_str)
        .map_err(|e| StoreError::Serialization(format!("bad kind in row: {e}")))?;

    Ok(ItemRecord {
        internal_id: row.get("internal_id"),
        drive_id,
        external_id,
        name: row.get("name"),
        kind,
        parent_internal_id: row.get("parent_internal_id"),
        path: row.get("path"),
        created_at: parse_datetime(&created_at_str)?,
        modified_at: parse_datetime(&modified_at_str)?,
        deleted: deleted != 0,
    })
}

pub(crate) fn event_from_row(row: &SqliteRow) -> Result<ChangeEvent, StoreError> {
    let kind_str: String = row.get("kind");
    let timestamp_str: String = row.get("timestamp");

    let kind = ChangeKind::parse(&kind_str)
        .map_err(|e| StoreError::Serialization(format!("bad event kind in row: {e}")))?;

    Ok(ChangeEvent {
        id: row.get("id"),
        item_internal_id: row.get("item_internal_id"),
        kind,
        old_name: row.get("old_name"),
        new_name: row.get("new_name"),
        old_parent_internal_id: row.get("old_parent_internal_id"),
        new_parent_internal_id: row.get("new_parent_internal_id"),
        timestamp: parse_datetime(&timestamp_str)?,
    })
}

pub(crate) fn subscription_from_row(row: &SqliteRow) -> Result<Subscription, StoreError> {
    let provider_id_str: String = row.get("provider_id");
    let expiry_str: String = row.get("expiry");
    let created_at_str: String = row.get("created_at");

    let provider_id = SubscriptionId::new(provider_id_str)
        .map_err(|e| StoreError::Serialization(format!("bad provider_id in row: {e}")))?;

    Ok(Subscription {
        provider_id,
        resource: row.get("resource"),
        shared_secret: row.get("shared_secret"),
        expiry: parse_datetime(&expiry_str)?,
        created_at: parse_datetime(&created_at_str)?,
    })
}

// ============================================================================
// In-transaction helpers
// ============================================================================

/// Insert or update one mirror row inside an open transaction
pub(crate) async fn upsert_item_in_tx(
    conn: &mut SqliteConnection,
    upsert: &ItemUpsert,
) -> Result<ItemRecord, StoreError> {
    let existing: Option<i64> =
        sqlx::query_scalar("SELECT internal_id FROM items WHERE external_id = ?")
            .bind(upsert.external_id.as_str())
            .fetch_optional(&mut *conn)
            .await
            .map_err(map_sqlx)?;

    let internal_id = match existing {
        Some(id) => {
            sqlx::query(
                "UPDATE items SET drive_id = ?, name = ?, kind = ?, parent_internal_id = ?, \
                 path = ?, modified_at = ?, deleted = ? WHERE internal_id = ?",
            )
            .bind(upsert.drive_id.as_str())
            .bind(&upsert.name)
            .bind(upsert.kind.as_str())
            .bind(upsert.parent_internal_id)
            .bind(&upsert.path)
            .bind(format_datetime(upsert.modified_at))
            .bind(upsert.deleted as i64)
            .bind(id)
            .execute(&mut *conn)
            .await
            .map_err(map_sqlx)?;
            id
        }
        None => {
            let result = sqlx::query(
                "INSERT INTO items \
                 (drive_id, external_id, name, kind, parent_internal_id, path, \
                  created_at, modified_at, deleted) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(upsert.drive_id.as_str())
            .bind(upsert.external_id.as_str())
            .bind(&upsert.name)
            .bind(upsert.kind.as_str())
            .bind(upsert.parent_internal_id)
            .bind(&upsert.path)
            .bind(format_datetime(upsert.modified_at))
            .bind(format_datetime(upsert.modified_at))
            .bind(upsert.deleted as i64)
            .execute(&mut *conn)
            .await
            .map_err(map_sqlx)?;
            result.last_insert_rowid()
        }
    };

    let row = sqlx::query("SELECT * FROM items WHERE internal_id = ?")
        .bind(internal_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(map_sqlx)?;

    item_from_row(&row)
}

/// Set the soft-delete flag inside an open transaction
pub(crate) async fn mark_deleted_in_tx(
    conn: &mut SqliteConnection,
    internal_id: i64,
) -> Result<(), StoreError> {
    let result = sqlx::query("UPDATE items SET deleted = 1 WHERE internal_id = ?")
        .bind(internal_id)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx)?;

    if result.rows_affected() == 0 {
        return Err(StoreError::Query(format!(
            "mark_deleted: item {internal_id} not found"
        )));
    }
    Ok(())
}

/// Append one event inside an open transaction; the store assigns the
/// timestamp and insertion id
pub(crate) async fn append_event_in_tx(
    conn: &mut SqliteConnection,
    item_internal_id: i64,
    event: &NewChangeEvent,
) -> Result<ChangeEvent, StoreError> {
    let timestamp = chrono::Utc::now();

    let result = sqlx::query(
        "INSERT INTO change_events \
         (item_internal_id, kind, old_name, new_name, \
          old_parent_internal_id, new_parent_internal_id, timestamp) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(item_internal_id)
    .bind(event.kind.as_str())
    .bind(&event.old_name)
    .bind(&event.new_name)
    .bind(event.old_parent_internal_id)
    .bind(event.new_parent_internal_id)
    .bind(format_datetime(timestamp))
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx)?;

    Ok(ChangeEvent {
        id: result.last_insert_rowid(),
        item_internal_id,
        kind: event.kind,
        old_name: event.old_name.clone(),
        new_name: event.new_name.clone(),
        old_parent_internal_id: event.old_parent_internal_id,
        new_parent_internal_id: event.new_parent_internal_id,
        timestamp,
    })
}
