//! Credential gate - process-wide switch for all downstream processing
//!
//! Holds a single atomic flag shared by every worker. The flag starts in
//! the configured initial state (disabled unless configured otherwise) and
//! is process-local, not durable: a restart begins disabled, forcing
//! bootstrap to run again and re-validate the bearer before work resumes.
//!
//! Policy: every worker invocation that would mutate state consults
//! [`CredentialGate::is_enabled`] first and returns immediately when the
//! gate is off. Any worker that observes `GatewayError::AuthInvalid` must
//! call [`CredentialGate::disable`] before returning; recovery requires an
//! external actor to re-run bootstrap.

use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use crate::ports::provider_gateway::{IProviderGateway, IdentityProbe, InvalidReason, Principal};

/// Why credential validation failed
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GateError {
    #[error("Credential expired or revoked")]
    Expired,
    #[error("Credential lacks permission")]
    Forbidden,
    #[error("Could not reach the provider to validate the credential")]
    Transport,
    #[error("Credential validation failed for an unknown reason")]
    Unknown,
}

impl From<InvalidReason> for GateError {
    fn from(reason: InvalidReason) -> Self {
        match reason {
            InvalidReason::Expired => GateError::Expired,
            InvalidReason::Forbidden => GateError::Forbidden,
            InvalidReason::Transport => GateError::Transport,
            InvalidReason::Unknown => GateError::Unknown,
        }
    }
}

/// Process-wide enable/disable switch, shared by all workers
///
/// Reads are lock-free; writes are atomic and immediately visible to all
/// workers.
pub struct CredentialGate {
    enabled: AtomicBool,
}

impl CredentialGate {
    /// Creates a gate in the given initial state
    pub fn new(initially_enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(initially_enabled),
        }
    }

    /// Validates the configured bearer against the provider
    ///
    /// Delegates to the gateway's identity probe. Does not toggle the
    /// flag; callers decide whether a failure disables processing.
    pub async fn validate(
        &self,
        gateway: &dyn IProviderGateway,
    ) -> Result<Principal, GateError> {
        match gateway.probe_identity().await {
            IdentityProbe::Valid(principal) => Ok(principal),
            IdentityProbe::Invalid(reason) => Err(reason.into()),
        }
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
        tracing::info!("Credential gate enabled");
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        tracing::warn!("Credential gate disabled; downstream processing halted");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

impl Default for CredentialGate {
    fn default() -> Self {
        Self::new(false)
    }
}
