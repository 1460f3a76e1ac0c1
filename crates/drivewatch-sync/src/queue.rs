//! Bounded in-process notification queue
//!
//! Implements the job-queue port over a bounded tokio channel. The sink
//! side never blocks: a full queue is reported as [`QueueError::Full`] so
//! the HTTP layer can answer with a retryable status and lean on the
//! provider's retry protocol. Dropping a notification is tolerable - it is
//! a hint to sync, and the cursor captures the work needed.

use tokio::sync::mpsc;

use drivewatch_core::ports::{IJobQueue, QueueError, SyncJob};

/// Sender half of the notification queue
#[derive(Clone)]
pub struct NotificationQueue {
    tx: mpsc::Sender<SyncJob>,
}

impl NotificationQueue {
    /// Create a queue with the given capacity, returning the sender and
    /// the receiver the worker consumes
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<SyncJob>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl IJobQueue for NotificationQueue {
    fn enqueue(&self, job: SyncJob) -> Result<(), QueueError> {
        self.tx.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => QueueError::Full,
            mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
        })
    }
}
