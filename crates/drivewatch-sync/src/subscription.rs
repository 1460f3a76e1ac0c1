//! Subscription manager - one live push subscription per watched resource
//!
//! State machine per subscription:
//!
//! ```text
//! None ──ensure──► Pending-create ──created──► Live
//!                        │ failure                │ expiry - now < 24h
//!                        ▼                        ▼
//!                      None ◄──404── Renewing ──ok──► Live
//!
//! Live ──now ≥ expiry──► Expiring ──sweep──► Dead
//! ```
//!
//! Renewal targets the largest lifetime the provider allows; renewal
//! happens whenever the remaining life drops under the threshold, so a
//! healthy deployment never reaches Expiring.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::RngCore;
use thiserror::Error;
use tracing::{debug, info, warn};

use drivewatch_core::domain::Subscription;
use drivewatch_core::ports::{
    GatewayError, IProviderGateway, ISubscriptionRepository, NewSubscription, StoreError,
};

/// Target subscription lifetime at creation and renewal
const T_SUB_HOURS: i64 = 70;

/// Renew when the remaining life drops below this window
const T_RENEW_THRESHOLD_HOURS: i64 = 24;

/// Errors from subscription lifecycle operations
#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("provider gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("state store error: {0}")]
    Store(#[from] StoreError),
}

/// Outcome of an inbound notification authentication check
#[derive(Debug)]
pub enum NotificationAuth {
    /// Secret matched a live subscription; carries the record so the
    /// caller can derive the watched resource
    Accepted(Subscription),
    /// Unknown subscription, expired record, or secret mismatch
    Rejected,
}

/// Keeps exactly one live subscription per watched resource
pub struct SubscriptionManager {
    gateway: Arc<dyn IProviderGateway>,
    repo: Arc<dyn ISubscriptionRepository>,
    notify_url: String,
    secret_floor: usize,
}

impl SubscriptionManager {
    pub fn new(
        gateway: Arc<dyn IProviderGateway>,
        repo: Arc<dyn ISubscriptionRepository>,
        notify_url: String,
        secret_floor: usize,
    ) -> Self {
        Self {
            gateway,
            repo,
            notify_url,
            secret_floor,
        }
    }

    /// Ensure a live subscription exists for the resource
    ///
    /// Looks up the local record, cross-checks it against the provider,
    /// renews when the remaining life is short, re-creates when the
    /// provider lost the record, and creates from scratch otherwise.
    pub async fn ensure_live(&self, resource: &str) -> Result<Subscription, SubscriptionError> {
        let now = Utc::now();

        let renew_window = Duration::hours(T_RENEW_THRESHOLD_HOURS);

        if let Some(local) = self.repo.find_by_resource(resource).await? {
            match self.gateway.get_subscription(&local.provider_id).await? {
                Some(remote) if remote.expiry - now >= renew_window => {
                    debug!(
                        subscription_id = %local.provider_id,
                        expiry = %remote.expiry,
                        "Subscription is live, nothing to do"
                    );
                    return Ok(local);
                }
                Some(remote) => {
                    let new_expiry = now + Duration::hours(T_SUB_HOURS);
                    info!(
                        subscription_id = %local.provider_id,
                        old_expiry = %remote.expiry,
                        new_expiry = %new_expiry,
                        "Renewing subscription"
                    );
                    self.gateway
                        .renew_subscription(&local.provider_id, new_expiry)
                        .await?;
                    self.repo
                        .update_expiry(&local.provider_id, new_expiry)
                        .await?;
                    return Ok(Subscription {
                        expiry: new_expiry,
                        ..local
                    });
                }
                None => {
                    warn!(
                        subscription_id = %local.provider_id,
                        "Provider lost the subscription; re-creating"
                    );
                    self.repo.delete(&local.provider_id).await?;
                }
            }
        }

        self.create(resource).await
    }

    async fn create(&self, resource: &str) -> Result<Subscription, SubscriptionError> {
        let request = NewSubscription {
            notification_url: self.notify_url.clone(),
            resource: resource.to_string(),
            shared_secret: generate_secret(self.secret_floor),
            expiry: Utc::now() + Duration::hours(T_SUB_HOURS),
        };

        let subscription = self.gateway.create_subscription(&request).await?;
        self.repo.upsert(&subscription).await?;

        info!(
            subscription_id = %subscription.provider_id,
            resource,
            expiry = %subscription.expiry,
            "Subscription created"
        );
        Ok(subscription)
    }

    /// Authenticate one inbound notification entry
    ///
    /// The enclosed client state is compared byte-for-byte against the
    /// stored secret for the referenced subscription. Mismatches and
    /// expired records are rejected without side effects.
    pub async fn authenticate(
        &self,
        subscription_id: &str,
        client_state: &str,
    ) -> Result<NotificationAuth, StoreError> {
        let id = match subscription_id.parse() {
            Ok(id) => id,
            Err(_) => return Ok(NotificationAuth::Rejected),
        };

        let Some(subscription) = self.repo.find_by_provider_id(&id).await? else {
            debug!(subscription_id, "Notification for unknown subscription");
            return Ok(NotificationAuth::Rejected);
        };

        if !subscription.is_live(Utc::now()) {
            debug!(subscription_id, "Notification for expired subscription");
            return Ok(NotificationAuth::Rejected);
        }

        if !subscription.verify_secret(client_state) {
            warn!(subscription_id, "Notification failed shared-secret check");
            return Ok(NotificationAuth::Rejected);
        }

        Ok(NotificationAuth::Accepted(subscription))
    }

    /// Remove local records that are past expiry and no longer known to
    /// the provider; returns the number of records removed
    pub async fn sweep_expired(&self) -> Result<u64, SubscriptionError> {
        let now = Utc::now();
        let mut removed = 0u64;

        for stale in self.repo.list_expired(now).await? {
            if self
                .gateway
                .get_subscription(&stale.provider_id)
                .await?
                .is_none()
            {
                self.repo.delete(&stale.provider_id).await?;
                removed += 1;
                debug!(subscription_id = %stale.provider_id, "Swept expired subscription");
            }
        }

        if removed > 0 {
            info!(removed, "Expired subscription records swept");
        }
        Ok(removed)
    }
}

/// Generate a cryptographically random shared secret of at least `floor`
/// hex characters
fn generate_secret(floor: usize) -> String {
    let bytes = floor.div_ceil(2);
    let mut buf = vec![0u8; bytes];
    rand::rng().fill_bytes(&mut buf);
    buf.iter().map(|b| format!("{b:02x}")).collect()
}
