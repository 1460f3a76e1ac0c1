//! Bootstrap procedure
//!
//! Operator-triggered startup gate: validate the configured credential,
//! ensure a live subscription for the resolved drive, force a full
//! reconciliation, then enable the credential gate. Until a bootstrap
//! succeeds the gate stays off and every worker invocation is a no-op.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use drivewatch_core::domain::{DriveId, SubscriptionId};
use drivewatch_core::gate::{CredentialGate, GateError};
use drivewatch_core::ports::{GatewayError, IProviderGateway, Principal};

use crate::engine::{ReconcileError, ReconciliationEngine};
use crate::resource_for_drive;
use crate::subscription::{SubscriptionError, SubscriptionManager};

/// Errors that fail a bootstrap run
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Credential validation failed; the gate stays disabled
    #[error("credential validation failed: {0}")]
    Gate(#[from] GateError),

    #[error("provider gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("subscription setup failed: {0}")]
    Subscription(#[from] SubscriptionError),

    #[error("initial reconciliation failed: {0}")]
    Reconcile(#[from] ReconcileError),
}

impl BootstrapError {
    /// True when the failure is a credential problem the operator must
    /// resolve before retrying
    pub fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            BootstrapError::Gate(_)
                | BootstrapError::Gateway(GatewayError::AuthInvalid)
                | BootstrapError::Subscription(SubscriptionError::Gateway(
                    GatewayError::AuthInvalid
                ))
                | BootstrapError::Reconcile(ReconcileError::Gateway(GatewayError::AuthInvalid))
        )
    }
}

/// Result of a successful bootstrap
#[derive(Debug, Clone)]
pub struct BootstrapOutcome {
    pub principal: Principal,
    pub drive_id: DriveId,
    pub subscription_id: SubscriptionId,
    pub items_processed: usize,
}

/// Runs the bootstrap sequence
pub struct Bootstrap {
    gateway: Arc<dyn IProviderGateway>,
    gate: Arc<CredentialGate>,
    manager: Arc<SubscriptionManager>,
    engine: Arc<ReconciliationEngine>,
}

impl Bootstrap {
    pub fn new(
        gateway: Arc<dyn IProviderGateway>,
        gate: Arc<CredentialGate>,
        manager: Arc<SubscriptionManager>,
        engine: Arc<ReconciliationEngine>,
    ) -> Self {
        Self {
            gateway,
            gate,
            manager,
            engine,
        }
    }

    /// Gate → subscription → full reconciliation → enable
    ///
    /// Any credential failure along the way leaves the gate disabled;
    /// other failures leave it in its prior state so an already-running
    /// deployment is not halted by a flaky re-bootstrap.
    pub async fn run(&self) -> Result<BootstrapOutcome, BootstrapError> {
        let principal = match self.gate.validate(self.gateway.as_ref()).await {
            Ok(principal) => principal,
            Err(e) => {
                self.gate.disable();
                return Err(e.into());
            }
        };
        info!(principal = %principal.principal_name, "Credential validated");

        let result = self.run_validated(&principal).await;
        if let Err(ref e) = result {
            if e.is_credential_failure() {
                self.gate.disable();
            }
        }
        result
    }

    async fn run_validated(
        &self,
        principal: &Principal,
    ) -> Result<BootstrapOutcome, BootstrapError> {
        let drive_id = self.gateway.resolve_default_drive().await?;
        info!(drive_id = %drive_id, "Resolved default drive");

        let resource = resource_for_drive(&drive_id);
        let subscription = self.manager.ensure_live(&resource).await?;

        let outcome = self.engine.initial_sync(&drive_id).await?;

        // Housekeeping; a failed sweep never fails the bootstrap.
        if let Err(e) = self.manager.sweep_expired().await {
            warn!(error = %e, "Expired-subscription sweep failed");
        }

        self.gate.enable();

        info!(
            drive_id = %drive_id,
            subscription_id = %subscription.provider_id,
            items_processed = outcome.items_processed,
            "Bootstrap complete; processing enabled"
        );

        Ok(BootstrapOutcome {
            principal: principal.clone(),
            drive_id,
            subscription_id: subscription.provider_id,
            items_processed: outcome.items_processed,
        })
    }
}
