//! HTTP handlers
//!
//! The notification sink answers the provider's validation handshake with
//! a plain-text echo, authenticates every notification entry against the
//! stored shared secret, and turns accepted entries into reconciliation
//! jobs. Entries with an invalid secret are dropped silently; a full
//! queue surfaces as 503 so the provider's retry protocol takes over.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use drivewatch_core::ports::{IJobQueue, QueueError, SyncJob};
use drivewatch_sync::subscription::NotificationAuth;

use crate::state::AppState;

// ============================================================================
// /bootstrap
// ============================================================================

/// Response body of a successful bootstrap
#[derive(Debug, Serialize)]
pub struct BootstrapResponse {
    pub principal: String,
    pub drive_id: String,
    pub subscription_id: String,
    pub items_processed: usize,
}

/// POST /bootstrap - validate the credential, ensure a subscription, run
/// a full sync, enable processing
pub async fn run_bootstrap(State(state): State<AppState>) -> Response {
    info!("Bootstrap requested");

    match state.bootstrap.run().await {
        Ok(outcome) => {
            let body = BootstrapResponse {
                principal: outcome.principal.principal_name,
                drive_id: outcome.drive_id.to_string(),
                subscription_id: outcome.subscription_id.to_string(),
                items_processed: outcome.items_processed,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) if e.is_credential_failure() => {
            warn!(error = %e, "Bootstrap rejected: credential invalid");
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
        Err(e) => {
            warn!(error = %e, "Bootstrap failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

// ============================================================================
// /notify
// ============================================================================

/// Query parameters of an inbound notification request
#[derive(Debug, Deserialize)]
pub struct NotifyParams {
    /// Present on the provider's validation handshake
    #[serde(rename = "validationToken")]
    pub validation_token: Option<String>,
}

/// Envelope the provider POSTs; one request can carry several entries
#[derive(Debug, Deserialize)]
pub struct NotificationEnvelope {
    #[serde(default)]
    pub value: Vec<NotificationEntry>,
}

/// One notification entry, narrowed to the consumed fields
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEntry {
    #[serde(default)]
    pub subscription_id: String,
    #[serde(default)]
    pub client_state: String,
    #[serde(default)]
    pub change_type: String,
}

/// POST /notify - handshake echo or notification fan-in
pub async fn receive_notification(
    State(state): State<AppState>,
    Query(params): Query<NotifyParams>,
    body: Result<Json<NotificationEnvelope>, JsonRejection>,
) -> Response {
    // Validation handshake: echo the challenge as plain text, nothing else.
    if let Some(token) = params.validation_token {
        debug!("Answering subscription validation handshake");
        return (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain")],
            token,
        )
            .into_response();
    }

    let Json(envelope) = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(error = %rejection, "Malformed notification body");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "malformed notification body" })),
            )
                .into_response();
        }
    };

    let mut accepted = 0usize;

    for entry in &envelope.value {
        match state
            .subscriptions
            .authenticate(&entry.subscription_id, &entry.client_state)
            .await
        {
            Ok(NotificationAuth::Accepted(subscription)) => {
                let job = SyncJob {
                    subscription_id: entry.subscription_id.clone(),
                    resource: subscription.resource.clone(),
                    change_type: entry.change_type.clone(),
                    ts: Utc::now(),
                };
                match state.queue.enqueue(job) {
                    Ok(()) => accepted += 1,
                    Err(QueueError::Full) => {
                        // Backpressure: lean on the provider's retry
                        // protocol; the cursor captures the work anyway.
                        warn!("Notification queue full; asking the provider to retry");
                        return (
                            StatusCode::SERVICE_UNAVAILABLE,
                            Json(json!({ "error": "queue full, retry later" })),
                        )
                            .into_response();
                    }
                    Err(QueueError::Closed) => {
                        warn!("Notification queue closed");
                        return (
                            StatusCode::SERVICE_UNAVAILABLE,
                            Json(json!({ "error": "worker unavailable" })),
                        )
                            .into_response();
                    }
                }
            }
            // Invalid shared secret or unknown subscription: drop silently.
            Ok(NotificationAuth::Rejected) => {}
            Err(e) => {
                warn!(error = %e, "Store failure while authenticating notification");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "store unavailable" })),
                )
                    .into_response();
            }
        }
    }

    debug!(
        received = envelope.value.len(),
        accepted, "Notification batch processed"
    );
    (StatusCode::OK, Json(json!({ "accepted": accepted }))).into_response()
}

// ============================================================================
// /healthz
// ============================================================================

/// GET /healthz - liveness probe
pub async fn health_check() -> Response {
    (StatusCode::OK, "ok").into_response()
}
