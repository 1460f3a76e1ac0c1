//! Per-drive serialization
//!
//! At any instant at most one reconciliation pass executes for a given
//! drive. Passes for different drives run concurrently; passes for the
//! same drive queue up behind a keyed mutex.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use drivewatch_core::domain::DriveId;

/// Keyed mutex map enforcing the per-drive serialization invariant
#[derive(Default)]
pub struct DriveLocks {
    locks: Mutex<HashMap<DriveId, Arc<AsyncMutex<()>>>>,
}

impl DriveLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for a drive, waiting if a pass is already running
    ///
    /// The guard is held for the duration of the reconciliation pass.
    pub async fn acquire(&self, drive_id: &DriveId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().expect("drive lock map poisoned");
            Arc::clone(
                locks
                    .entry(drive_id.clone())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };
        lock.lock_owned().await
    }
}
