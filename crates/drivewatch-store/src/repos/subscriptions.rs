//! Subscription repository implementation
//!
//! Only the most recent record per resource is considered live, so
//! `find_by_resource` orders by creation time and takes the newest.

use chrono::{DateTime, Utc};

use drivewatch_core::domain::{Subscription, SubscriptionId};
use drivewatch_core::ports::{ISubscriptionRepository, StoreError};

use super::{subscription_from_row, SqliteStateStore};
use crate::{format_datetime, map_sqlx};

#[async_trait::async_trait]
impl ISubscriptionRepository for SqliteStateStore {
    async fn find_by_resource(&self, resource: &str) -> Result<Option<Subscription>, StoreError> {
        let row = sqlx::query(
            "SELECT * FROM subscriptions WHERE resource = ? \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(resource)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx)?;

        row.as_ref().map(subscription_from_row).transpose()
    }

    async fn find_by_provider_id(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, StoreError> {
        let row = sqlx::query("SELECT * FROM subscriptions WHERE provider_id = ?")
            .bind(id.as_str())
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx)?;

        row.as_ref().map(subscription_from_row).transpose()
    }

    async fn upsert(&self, subscription: &Subscription) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO subscriptions \
             (provider_id, resource, shared_secret, expiry, created_at) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(provider_id) DO UPDATE SET \
               resource = excluded.resource, \
               shared_secret = excluded.shared_secret, \
               expiry = excluded.expiry",
        )
        .bind(subscription.provider_id.as_str())
        .bind(&subscription.resource)
        .bind(&subscription.shared_secret)
        .bind(format_datetime(subscription.expiry))
        .bind(format_datetime(subscription.created_at))
        .execute(self.pool())
        .await
        .map_err(map_sqlx)?;

        tracing::debug!(subscription_id = %subscription.provider_id, "Subscription record saved");
        Ok(())
    }

    async fn update_expiry(
        &self,
        id: &SubscriptionId,
        new_expiry: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE subscriptions SET expiry = ? WHERE provider_id = ?")
            .bind(format_datetime(new_expiry))
            .bind(id.as_str())
            .execute(self.pool())
            .await
            .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Query(format!(
                "update_expiry: subscription {id} not found"
            )));
        }
        Ok(())
    }

    async fn delete(&self, id: &SubscriptionId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM subscriptions WHERE provider_id = ?")
            .bind(id.as_str())
            .execute(self.pool())
            .await
            .map_err(map_sqlx)?;

        tracing::debug!(subscription_id = %id, "Subscription record deleted");
        Ok(())
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<Subscription>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM subscriptions WHERE expiry < ? ORDER BY expiry ASC",
        )
        .bind(format_datetime(now))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx)?;

        rows.iter().map(subscription_from_row).collect()
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE expiry < ?")
            .bind(format_datetime(now))
            .execute(self.pool())
            .await
            .map_err(map_sqlx)?;

        Ok(result.rows_affected())
    }
}
