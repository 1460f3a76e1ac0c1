//! DriveCursor entity - per-drive incremental sync state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{DeltaCursor, DriveId};

/// Per-drive incremental sync state
///
/// At most one row per drive. An absent cursor means the next sync is a
/// full sync; the row is upserted after a reconciliation pass completes
/// successfully and explicitly cleared to force a full resync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveCursor {
    pub drive_id: DriveId,
    pub cursor: Option<DeltaCursor>,
    pub last_sync_at: Option<DateTime<Utc>>,
}
