//! Microsoft Graph change-notification subscription CRUD
//!
//! One subscription watches one resource (a drive root). Creation triggers
//! the provider's validation-challenge round-trip against the notification
//! URL before the provider answers, so the notification endpoint must be
//! reachable when these calls run.
//!
//! See: <https://learn.microsoft.com/en-us/graph/api/resources/subscription>

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use drivewatch_core::domain::newtypes::SubscriptionId;
use drivewatch_core::domain::subscription::Subscription;
use drivewatch_core::ports::{GatewayError, NewSubscription, ProviderSubscription};

use crate::client::{fail_status, GraphClient};

/// Change type requested at subscription creation; the drive delta feed
/// collapses every structural change into `updated` notifications.
const CHANGE_TYPE: &str = "updated";

/// Wire shape of a subscription in Graph responses
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphSubscription {
    id: String,
    resource: Option<String>,
    expiration_date_time: DateTime<Utc>,
}

fn parse_subscription(raw: GraphSubscription) -> Result<ProviderSubscription, GatewayError> {
    let provider_id = SubscriptionId::new(raw.id)
        .map_err(|e| GatewayError::Fatal(format!("malformed subscription id: {e}")))?;
    Ok(ProviderSubscription {
        provider_id,
        resource: raw.resource.unwrap_or_default(),
        expiry: raw.expiration_date_time,
    })
}

/// Create a subscription; returns the full local record (provider id and
/// expiry from the response, secret and resource from the request)
pub async fn create(
    client: &GraphClient,
    request: &NewSubscription,
) -> Result<Subscription, GatewayError> {
    let body = json!({
        "changeType": CHANGE_TYPE,
        "notificationUrl": request.notification_url,
        "resource": request.resource,
        "expirationDateTime": request.expiry.to_rfc3339_opts(SecondsFormat::Secs, true),
        "clientState": request.shared_secret,
    });

    debug!(resource = %request.resource, "Creating provider subscription");

    let response = client
        .execute_with_retry(Method::POST, "/subscriptions", Some(&body))
        .await?;

    if !response.status().is_success() {
        return Err(fail_status(response.status()));
    }

    let raw: GraphSubscription = response
        .json()
        .await
        .map_err(|e| GatewayError::Fatal(format!("failed to parse subscription response: {e}")))?;
    let created = parse_subscription(raw)?;

    info!(
        subscription_id = %created.provider_id,
        resource = %request.resource,
        expiry = %created.expiry,
        "Provider subscription created"
    );

    Ok(Subscription {
        provider_id: created.provider_id,
        resource: request.resource.clone(),
        shared_secret: request.shared_secret.clone(),
        expiry: created.expiry,
        created_at: Utc::now(),
    })
}

/// Look up a subscription; 404 maps to `None`
pub async fn get(
    client: &GraphClient,
    id: &SubscriptionId,
) -> Result<Option<ProviderSubscription>, GatewayError> {
    let path = format!("/subscriptions/{}", id.as_str());
    let response = client.execute_with_retry(Method::GET, &path, None).await?;

    if response.status() == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !response.status().is_success() {
        return Err(fail_status(response.status()));
    }

    let raw: GraphSubscription = response
        .json()
        .await
        .map_err(|e| GatewayError::Fatal(format!("failed to parse subscription response: {e}")))?;
    parse_subscription(raw).map(Some)
}

/// Extend a subscription's expiry
///
/// A 404 here means the record vanished after it was looked up; the next
/// ensure pass re-creates it.
pub async fn renew(
    client: &GraphClient,
    id: &SubscriptionId,
    new_expiry: DateTime<Utc>,
) -> Result<(), GatewayError> {
    let path = format!("/subscriptions/{}", id.as_str());
    let body = json!({
        "expirationDateTime": new_expiry.to_rfc3339_opts(SecondsFormat::Secs, true),
    });

    let response = client
        .execute_with_retry(Method::PATCH, &path, Some(&body))
        .await?;

    if response.status() == StatusCode::NOT_FOUND {
        return Err(GatewayError::Fatal(format!(
            "subscription {id} disappeared during renewal"
        )));
    }
    if !response.status().is_success() {
        return Err(fail_status(response.status()));
    }

    info!(subscription_id = %id, expiry = %new_expiry, "Provider subscription renewed");
    Ok(())
}

/// Delete a subscription; 404 is treated as success
pub async fn delete(client: &GraphClient, id: &SubscriptionId) -> Result<(), GatewayError> {
    let path = format!("/subscriptions/{}", id.as_str());
    let response = client
        .execute_with_retry(Method::DELETE, &path, None)
        .await?;

    if response.status() == StatusCode::NOT_FOUND || response.status().is_success() {
        debug!(subscription_id = %id, "Provider subscription deleted");
        return Ok(());
    }

    Err(fail_status(response.status()))
}
