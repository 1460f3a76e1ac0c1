//! Job queue port (driven/secondary port)
//!
//! The queue is an at-least-once FIFO of opaque messages. A notification
//! is a hint to sync, not the payload to process: losing one is tolerable
//! because the cursor captures the work needed, so the queue is bounded
//! and a full queue surfaces as a retryable error to the provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One reconciliation job emitted by the notification sink
///
/// `change_type` is informational only; the engine always performs a full
/// delta from the stored cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncJob {
    pub subscription_id: String,
    pub resource: String,
    pub change_type: String,
    pub ts: DateTime<Utc>,
}

/// Errors from enqueueing a job
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// The bounded queue is full; the caller should report a retryable
    /// failure and rely on the sender's retry protocol
    #[error("Job queue is full")]
    Full,

    /// No consumer is attached any more
    #[error("Job queue is closed")]
    Closed,
}

/// Port trait for emitting reconciliation jobs
pub trait IJobQueue: Send + Sync {
    fn enqueue(&self, job: SyncJob) -> Result<(), QueueError>;
}
