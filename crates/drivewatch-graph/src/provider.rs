//! GraphGateway - IProviderGateway implementation for Microsoft Graph
//!
//! Ties the client, delta and subscription modules together behind the
//! port contract. Holds the bearer credential from configuration; port
//! methods never carry it.

use reqwest::Method;
use serde::Deserialize;
use tracing::debug;

use drivewatch_core::domain::newtypes::{DeltaCursor, DriveId, SubscriptionId};
use drivewatch_core::domain::subscription::Subscription;
use drivewatch_core::ports::{
    DeltaPage, GatewayError, IProviderGateway, IdentityProbe, InvalidReason, NewSubscription,
    Principal, ProviderSubscription,
};

use crate::client::{fail_status, GraphClient};
use crate::{delta, subscriptions};

// ============================================================================
// Wire types
// ============================================================================

/// Response from the /me endpoint ("describe caller")
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MeResponse {
    id: Option<String>,
    user_principal_name: Option<String>,
    mail: Option<String>,
}

/// Response from the /me/drive endpoint
#[derive(Debug, Deserialize)]
struct DriveResponse {
    id: Option<String>,
}

// ============================================================================
// GraphGateway
// ============================================================================

/// Provider gateway backed by the Microsoft Graph API
pub struct GraphGateway {
    client: GraphClient,
}

impl GraphGateway {
    /// Creates a gateway wrapping the given client
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    /// Convenience constructor from a bearer credential
    pub fn with_bearer(bearer: impl Into<String>) -> Self {
        Self::new(GraphClient::new(bearer))
    }
}

#[async_trait::async_trait]
impl IProviderGateway for GraphGateway {
    /// Minimal authenticated read (`GET /me`) with outcomes derived from
    /// the HTTP status: 200 valid, 401 expired, 403 forbidden, network
    /// failure transport, anything else unknown.
    ///
    /// Runs a single attempt without backoff; the probe is used to decide
    /// whether processing may continue at all, and callers retry at their
    /// own cadence.
    async fn probe_identity(&self) -> IdentityProbe {
        let response = match self.client.send_once(Method::GET, "/me").await {
            Ok(r) => r,
            Err(e) => {
                debug!(error = %e, "Identity probe could not reach the provider");
                return IdentityProbe::Invalid(InvalidReason::Transport);
            }
        };

        match response.status().as_u16() {
            200 => match response.json::<MeResponse>().await {
                Ok(me) => {
                    let principal_name = me
                        .user_principal_name
                        .or(me.mail)
                        .unwrap_or_else(|| "unknown".to_string());
                    IdentityProbe::Valid(Principal {
                        user_id: me.id.unwrap_or_default(),
                        principal_name,
                    })
                }
                Err(e) => {
                    debug!(error = %e, "Identity probe returned an unparseable body");
                    IdentityProbe::Invalid(InvalidReason::Unknown)
                }
            },
            401 => IdentityProbe::Invalid(InvalidReason::Expired),
            403 => IdentityProbe::Invalid(InvalidReason::Forbidden),
            _ => IdentityProbe::Invalid(InvalidReason::Unknown),
        }
    }

    async fn resolve_default_drive(&self) -> Result<DriveId, GatewayError> {
        let response = self
            .client
            .execute_with_retry(Method::GET, "/me/drive", None)
            .await?;

        if !response.status().is_success() {
            return Err(fail_status(response.status()));
        }

        let drive: DriveResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Fatal(format!("failed to parse drive response: {e}")))?;

        let id = drive
            .id
            .ok_or_else(|| GatewayError::Fatal("drive response carried no id".to_string()))?;

        DriveId::new(id).map_err(|e| GatewayError::Fatal(format!("malformed drive id: {e}")))
    }

    async fn delta(
        &self,
        drive_id: &DriveId,
        cursor: Option<&DeltaCursor>,
    ) -> Result<DeltaPage, GatewayError> {
        delta::fetch_delta_page(&self.client, drive_id, cursor).await
    }

    async fn create_subscription(
        &self,
        request: &NewSubscription,
    ) -> Result<Subscription, GatewayError> {
        subscriptions::create(&self.client, request).await
    }

    async fn get_subscription(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<ProviderSubscription>, GatewayError> {
        subscriptions::get(&self.client, id).await
    }

    async fn renew_subscription(
        &self,
        id: &SubscriptionId,
        new_expiry: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), GatewayError> {
        subscriptions::renew(&self.client, id, new_expiry).await
    }

    async fn delete_subscription(&self, id: &SubscriptionId) -> Result<(), GatewayError> {
        subscriptions::delete(&self.client, id).await
    }
}
