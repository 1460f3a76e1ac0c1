//! Repository ports for the state store (driven/secondary ports)
//!
//! Four interfaces over the relational store: items, events, cursors and
//! subscriptions. All operations are asynchronous and fail with a
//! [`StoreError`] that distinguishes retryable transport trouble from
//! fatal data errors.
//!
//! ## Atomicity contract
//!
//! The reconciliation engine's apply-one-item step must commit the item
//! mutation AND the resulting change event in a single transaction, or
//! commit neither. That boundary is expressed here as
//! [`IItemRepository::upsert_with_event`] and
//! [`IItemRepository::mark_deleted_with_event`]. Cursor advancement is a
//! separate transaction that runs only after every item in a page has
//! committed.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::event::{ChangeEvent, NewChangeEvent};
use crate::domain::item::{ItemRecord, ItemUpsert};
use crate::domain::newtypes::{DeltaCursor, DriveId, ExternalId, SubscriptionId};
use crate::domain::subscription::Subscription;

/// Errors that can occur in the state store
///
/// `Connection` is retryable; everything else indicates a bug or a
/// corrupted payload and aborts the reconciliation pass without advancing
/// the cursor.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to reach the store or acquire a connection (retryable)
    #[error("Store connection failed: {0}")]
    Connection(String),

    /// Constraint violation (fatal)
    #[error("Store constraint violated: {0}")]
    Constraint(String),

    /// Serialization or deserialization of a stored value failed (fatal)
    #[error("Store serialization error: {0}")]
    Serialization(String),

    /// Any other query failure (fatal)
    #[error("Store query failed: {0}")]
    Query(String),
}

impl StoreError {
    /// Returns true if the operation may be retried as-is
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Connection(_))
    }
}

/// Item mirror repository
#[async_trait::async_trait]
pub trait IItemRepository: Send + Sync {
    async fn lookup_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<ItemRecord>, StoreError>;

    async fn lookup_by_internal_id(
        &self,
        internal_id: i64,
    ) -> Result<Option<ItemRecord>, StoreError>;

    /// Insert or update a mirror row keyed by external id
    async fn upsert(&self, upsert: ItemUpsert) -> Result<ItemRecord, StoreError>;

    /// Set the soft-delete flag on an existing row
    async fn mark_deleted(&self, internal_id: i64) -> Result<(), StoreError>;

    /// Live and tombstoned children of an item
    async fn children_of(&self, internal_id: i64) -> Result<Vec<ItemRecord>, StoreError>;

    /// Upsert a batch in a single transaction
    async fn bulk_upsert(&self, batch: Vec<ItemUpsert>) -> Result<Vec<ItemRecord>, StoreError>;

    /// Apply-one-item commit point: item upsert plus event append in one
    /// transaction
    async fn upsert_with_event(
        &self,
        upsert: ItemUpsert,
        event: NewChangeEvent,
    ) -> Result<ItemRecord, StoreError>;

    /// Apply-one-item commit point for tombstones: soft delete plus event
    /// append in one transaction
    async fn mark_deleted_with_event(
        &self,
        internal_id: i64,
        event: NewChangeEvent,
    ) -> Result<(), StoreError>;
}

/// Append-only audit log repository
#[async_trait::async_trait]
pub trait IEventRepository: Send + Sync {
    /// Append one event; the store assigns id and timestamp
    async fn append(
        &self,
        item_internal_id: i64,
        event: NewChangeEvent,
    ) -> Result<ChangeEvent, StoreError>;

    /// Append a batch in a single transaction
    async fn append_many(&self, batch: Vec<(i64, NewChangeEvent)>) -> Result<(), StoreError>;

    /// Event history of one item, newest first (ties broken by insertion id)
    async fn history_of(&self, item_internal_id: i64) -> Result<Vec<ChangeEvent>, StoreError>;
}

/// Per-drive cursor repository
#[async_trait::async_trait]
pub trait ICursorRepository: Send + Sync {
    async fn get(&self, drive_id: &DriveId) -> Result<Option<DeltaCursor>, StoreError>;

    /// Upsert the cursor and stamp last-sync-at
    async fn set(&self, drive_id: &DriveId, cursor: &DeltaCursor) -> Result<(), StoreError>;

    /// Clear the cursor to force a full resync on the next pass
    async fn clear(&self, drive_id: &DriveId) -> Result<(), StoreError>;
}

/// Subscription record repository
#[async_trait::async_trait]
pub trait ISubscriptionRepository: Send + Sync {
    async fn find_by_resource(&self, resource: &str) -> Result<Option<Subscription>, StoreError>;

    async fn find_by_provider_id(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, StoreError>;

    async fn upsert(&self, subscription: &Subscription) -> Result<(), StoreError>;

    async fn update_expiry(
        &self,
        id: &SubscriptionId,
        new_expiry: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn delete(&self, id: &SubscriptionId) -> Result<(), StoreError>;

    /// Records whose expiry lies before `now`, oldest first
    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<Subscription>, StoreError>;

    /// Remove records whose expiry lies before `now`; returns the number
    /// of rows removed
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}
