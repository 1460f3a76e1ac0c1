//! Provider gateway port (driven/secondary port)
//!
//! Typed wrapper over the provider's REST surface: delta queries,
//! subscription CRUD and credential validation probes. The adapter hides
//! pagination mechanics and transport plumbing; what crosses this boundary
//! is an explicit error union, never a raw HTTP failure.
//!
//! ## Design Notes
//!
//! - The bearer credential arrives by configuration and is held by the
//!   adapter; port methods do not carry it.
//! - [`DeltaEntry`] is a port-level DTO with only the fields the engine
//!   consumes. Everything else in the provider payload is ignored.
//! - `probe_identity` never fails: every outcome, including transport
//!   trouble, maps into [`IdentityProbe`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::domain::newtypes::{DeltaCursor, DriveId, ExternalId, SubscriptionId};
use crate::domain::subscription::Subscription;

// ============================================================================
// Error taxonomy
// ============================================================================

/// Errors surfaced by the provider gateway
///
/// Mapped from transport outcomes: 401/403 become `AuthInvalid` (and must
/// trip the credential gate), 429 becomes `RateLimited`, 5xx and network
/// failures become `Transient`, any other 4xx is `Fatal` and must not be
/// retried.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Credential rejected by the provider (401/403)
    #[error("Provider rejected the credential")]
    AuthInvalid,

    /// Provider asked us to back off (429)
    #[error("Rate limited by provider")]
    RateLimited {
        /// Provider-supplied backoff hint, when present
        retry_after: Option<Duration>,
    },

    /// Server-side or network failure, safe to retry
    #[error("Transient provider error: {0}")]
    Transient(String),

    /// Non-retryable provider error
    #[error("Fatal provider error: {0}")]
    Fatal(String),
}

impl GatewayError {
    /// Returns true if the operation may be retried as-is
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayError::RateLimited { .. } | GatewayError::Transient(_)
        )
    }
}

// ============================================================================
// Identity probe
// ============================================================================

/// Why a credential probe came back negative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    /// 401 - credential expired or revoked
    Expired,
    /// 403 - credential valid but not permitted
    Forbidden,
    /// Network-level failure; credential state unknown
    Transport,
    /// Anything else
    Unknown,
}

/// The caller identity behind a valid credential
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    pub principal_name: String,
}

/// Outcome of a credential validation probe
#[derive(Debug, Clone, PartialEq)]
pub enum IdentityProbe {
    Valid(Principal),
    Invalid(InvalidReason),
}

// ============================================================================
// Delta feed DTOs
// ============================================================================

/// A single entry from the delta feed, narrowed to the consumed fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaEntry {
    pub external_id: ExternalId,
    pub name: String,
    /// Provider id of the parent; absent for the drive root
    pub parent_external_id: Option<ExternalId>,
    pub is_folder: bool,
    /// Present when the entry marks the item as deleted
    pub tombstone: bool,
    pub modified_at: Option<DateTime<Utc>>,
}

/// One page of the delta feed
///
/// Exactly one of `next_cursor` / `final_cursor` is set: `next_cursor`
/// when more pages follow, `final_cursor` on the terminal page.
#[derive(Debug, Clone)]
pub struct DeltaPage {
    pub entries: Vec<DeltaEntry>,
    pub next_cursor: Option<DeltaCursor>,
    pub final_cursor: Option<DeltaCursor>,
}

// ============================================================================
// Subscription CRUD request
// ============================================================================

/// Parameters for creating a provider subscription
#[derive(Debug, Clone)]
pub struct NewSubscription {
    /// Absolute URL the provider will POST notifications to
    pub notification_url: String,
    /// Watched resource, e.g. `/drives/{drive-id}/root`
    pub resource: String,
    /// Opaque client state echoed back on every notification
    pub shared_secret: String,
    pub expiry: DateTime<Utc>,
}

/// A subscription as the provider reports it
///
/// The provider never returns the shared secret, so lookups yield this
/// narrower record rather than the locally persisted [`Subscription`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSubscription {
    pub provider_id: SubscriptionId,
    pub resource: String,
    pub expiry: DateTime<Utc>,
}

// ============================================================================
// IProviderGateway trait
// ============================================================================

/// Port trait for all provider interactions
#[async_trait::async_trait]
pub trait IProviderGateway: Send + Sync {
    /// Minimal authenticated read to validate the configured credential
    ///
    /// Never returns `Err`; all outcomes map into [`IdentityProbe`].
    async fn probe_identity(&self) -> IdentityProbe;

    /// Resolves the caller's default drive
    async fn resolve_default_drive(&self) -> Result<DriveId, GatewayError>;

    /// Fetches one page of the delta feed
    ///
    /// With `cursor = None` the provider performs a full enumeration;
    /// otherwise it returns only changes since the cursor.
    async fn delta(
        &self,
        drive_id: &DriveId,
        cursor: Option<&DeltaCursor>,
    ) -> Result<DeltaPage, GatewayError>;

    /// Creates a push subscription; the provider performs its
    /// validation-challenge round-trip against the notification URL
    /// before answering
    async fn create_subscription(
        &self,
        request: &NewSubscription,
    ) -> Result<Subscription, GatewayError>;

    /// Looks up a subscription by provider id; 404 maps to `None`
    async fn get_subscription(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<ProviderSubscription>, GatewayError>;

    /// Extends a subscription's expiry
    async fn renew_subscription(
        &self,
        id: &SubscriptionId,
        new_expiry: DateTime<Utc>,
    ) -> Result<(), GatewayError>;

    /// Deletes a subscription; 404 is treated as success
    async fn delete_subscription(&self, id: &SubscriptionId) -> Result<(), GatewayError>;

    /// Follows `next_cursor` chains until the terminal page, accumulating
    /// entries in provider order and preserving the terminal page's
    /// `final_cursor`.
    ///
    /// # Errors
    /// Returns `GatewayError::Fatal` if the terminal page carries no final
    /// cursor, since the pass would otherwise be unable to advance.
    async fn delta_complete(
        &self,
        drive_id: &DriveId,
        cursor: Option<&DeltaCursor>,
    ) -> Result<(Vec<DeltaEntry>, DeltaCursor), GatewayError> {
        let mut page = self.delta(drive_id, cursor).await?;
        let mut entries = std::mem::take(&mut page.entries);
        let mut pages = 1u32;

        while let Some(next) = page.next_cursor.take() {
            page = self.delta(drive_id, Some(&next)).await?;
            entries.extend(std::mem::take(&mut page.entries));
            pages += 1;
        }

        tracing::debug!(
            drive_id = %drive_id,
            total_entries = entries.len(),
            total_pages = pages,
            "Delta pagination complete"
        );

        let final_cursor = page.final_cursor.ok_or_else(|| {
            GatewayError::Fatal("terminal delta page carried no final cursor".to_string())
        })?;

        Ok((entries, final_cursor))
    }
}
