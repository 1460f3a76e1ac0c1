//! Subscription entity - record of one live push subscription
//!
//! Only the most recent record per resource is considered live. Expired
//! records may linger for audit but are never used for notification
//! validation.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::SubscriptionId;

/// One push subscription as persisted locally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// Provider subscription id (unique)
    pub provider_id: SubscriptionId,
    /// Watched resource, e.g. `/drives/{drive-id}/root`
    pub resource: String,
    /// Shared secret echoed back by the provider on every notification
    pub shared_secret: String,
    /// When the provider will stop delivering notifications
    pub expiry: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// Returns true if the subscription has not yet expired
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expiry
    }

    /// Returns true if the remaining lifetime is below `window`
    pub fn expires_within(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.expiry - now < window
    }

    /// Byte-for-byte comparison of an inbound client state against the
    /// stored shared secret
    pub fn verify_secret(&self, presented: &str) -> bool {
        self.shared_secret.as_bytes() == presented.as_bytes()
    }
}
