//! Reconciliation worker - consumes notification jobs
//!
//! One worker drains the bounded queue. For every job it re-checks the
//! credential gate, derives the drive from the watched resource, and runs
//! a reconciliation pass. Error policy:
//!
//! - gate disabled: the job is dropped as success (messages drain without
//!   touching the provider or the store until bootstrap re-enables work)
//! - retryable failure: the job goes back on the queue
//! - credential failure: the engine has already disabled the gate; the
//!   job is absorbed so redeliveries drain as no-ops
//! - fatal failure: logged with full context, cursor untouched

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use drivewatch_core::gate::CredentialGate;
use drivewatch_core::ports::{GatewayError, IJobQueue, SyncJob};

use crate::drive_from_resource;
use crate::engine::{ReconcileError, ReconciliationEngine};
use crate::queue::NotificationQueue;

/// Consumes reconciliation jobs until shutdown
pub struct ReconciliationWorker {
    engine: Arc<ReconciliationEngine>,
    gate: Arc<CredentialGate>,
    /// Sender half, used to re-queue jobs after retryable failures
    queue: NotificationQueue,
}

impl ReconciliationWorker {
    pub fn new(
        engine: Arc<ReconciliationEngine>,
        gate: Arc<CredentialGate>,
        queue: NotificationQueue,
    ) -> Self {
        Self {
            engine,
            gate,
            queue,
        }
    }

    /// Run the consume loop until the channel closes or shutdown fires
    pub async fn run(&self, mut jobs: mpsc::Receiver<SyncJob>, shutdown: CancellationToken) {
        info!("Reconciliation worker started");

        loop {
            tokio::select! {
                job = jobs.recv() => {
                    match job {
                        Some(job) => self.handle_job(job).await,
                        None => {
                            info!("Job queue closed; worker exiting");
                            break;
                        }
                    }
                }
                _ = shutdown.cancelled() => {
                    info!("Shutdown signal received; worker exiting");
                    break;
                }
            }
        }
    }

    /// Process one job end to end
    pub async fn handle_job(&self, job: SyncJob) {
        if !self.gate.is_enabled() {
            debug!(
                subscription_id = %job.subscription_id,
                "Gate disabled; dropping reconciliation job"
            );
            return;
        }

        let Some(drive_id) = drive_from_resource(&job.resource) else {
            warn!(resource = %job.resource, "Job carries an unrecognized resource; dropping");
            return;
        };

        match self.engine.reconcile(&drive_id).await {
            Ok(outcome) => {
                debug!(
                    drive_id = %drive_id,
                    items_processed = outcome.items_processed,
                    changes_detected = outcome.changes_detected,
                    "Job completed"
                );
            }
            Err(ReconcileError::Gateway(GatewayError::AuthInvalid)) => {
                // Gate already disabled by the engine. Absorb the job:
                // redeliveries drain as no-ops until bootstrap succeeds.
                warn!(drive_id = %drive_id, "Credential rejected mid-pass; job absorbed");
            }
            Err(e) if e.is_retryable() => {
                warn!(drive_id = %drive_id, error = %e, "Retryable failure; re-queueing job");
                if self.queue.enqueue(job).is_err() {
                    warn!(
                        drive_id = %drive_id,
                        "Could not re-queue job; the next notification will cover it"
                    );
                }
            }
            Err(e) => {
                error!(
                    drive_id = %drive_id,
                    error = %e,
                    "Fatal reconciliation failure; cursor not advanced"
                );
            }
        }
    }
}
