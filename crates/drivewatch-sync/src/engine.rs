//! Reconciliation engine - the heart of the mirror
//!
//! One pass reads the stored cursor, drains the delta feed, classifies
//! every observed entry against the persisted state into a semantic event
//! (CREATE / RENAME / MOVE / DELETE / UPDATE), applies each item in its
//! own transaction, and advances the cursor only when the whole page
//! committed. Re-processing the same page is a no-op: every entry then
//! classifies as unchanged and nothing is written, which is what makes the
//! at-least-once transport safe.
//!
//! ## Classification
//!
//! | name changed | parent changed | event |
//! |:---:|:---:|:---|
//! | no  | no  | UPDATE when metadata moved and the policy is on, else skip |
//! | yes | no  | RENAME |
//! | no  | yes | MOVE |
//! | yes | yes | MOVE (parent change dominates, both names recorded) |
//!
//! A tombstone for a known live item yields DELETE; tombstones for unknown
//! or already-deleted items are silent. A live entry for a tombstoned item
//! clears the soft-delete flag (the provider re-created the item at the
//! same external id); when nothing else changed that undelete is recorded
//! as UPDATE.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use drivewatch_core::domain::{
    child_path, DriveId, ItemKind, ItemRecord, ItemUpsert, NewChangeEvent,
};
use drivewatch_core::gate::CredentialGate;
use drivewatch_core::ports::{
    DeltaEntry, GatewayError, ICursorRepository, IItemRepository, IProviderGateway, StoreError,
};

use crate::locks::DriveLocks;

/// Errors that abort a reconciliation pass
///
/// A pass that fails never advances the cursor; a retry re-runs the same
/// page.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("provider gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("state store error: {0}")]
    Store(#[from] StoreError),

    /// The parent chain loops; real filesystems never produce this, so it
    /// indicates corrupted state and must not be retried
    #[error("cycle detected while building path for item {external_id}")]
    CycleDetected { external_id: String },

    /// An internal id referenced by the parent chain vanished mid-pass
    #[error("parent chain of item {external_id} references missing item {missing}")]
    BrokenParentChain { external_id: String, missing: i64 },
}

impl ReconcileError {
    /// Returns true if re-running the pass may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ReconcileError::Gateway(e) => e.is_retryable(),
            ReconcileError::Store(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Summary of one completed pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Delta entries consumed, tombstones included
    pub items_processed: usize,
    /// Change events appended
    pub changes_detected: usize,
}

/// Result of applying a single entry
enum Applied {
    /// Entry handled; true when an event was appended
    Done(bool),
    /// Parent unknown at this point; entry queued for the replay pass
    Deferred,
}

/// The change-reconciliation engine
pub struct ReconciliationEngine {
    gateway: Arc<dyn IProviderGateway>,
    items: Arc<dyn IItemRepository>,
    cursors: Arc<dyn ICursorRepository>,
    gate: Arc<CredentialGate>,
    locks: DriveLocks,
    emit_update_events: bool,
}

impl ReconciliationEngine {
    pub fn new(
        gateway: Arc<dyn IProviderGateway>,
        items: Arc<dyn IItemRepository>,
        cursors: Arc<dyn ICursorRepository>,
        gate: Arc<CredentialGate>,
        emit_update_events: bool,
    ) -> Self {
        Self {
            gateway,
            items,
            cursors,
            gate,
            locks: DriveLocks::new(),
            emit_update_events,
        }
    }

    /// Run one reconciliation pass for a drive
    ///
    /// Holds the per-drive lock for the duration: passes for the same
    /// drive are strictly sequential, passes for different drives run
    /// concurrently.
    pub async fn reconcile(&self, drive_id: &DriveId) -> Result<ReconcileOutcome, ReconcileError> {
        let _guard = self.locks.acquire(drive_id).await;

        let cursor = self.cursors.get(drive_id).await?;
        debug!(drive_id = %drive_id, full_sync = cursor.is_none(), "Starting reconciliation pass");

        let (entries, final_cursor) = match self
            .gateway
            .delta_complete(drive_id, cursor.as_ref())
            .await
        {
            Ok(page) => page,
            Err(GatewayError::AuthInvalid) => {
                self.gate.disable();
                return Err(GatewayError::AuthInvalid.into());
            }
            Err(e) => return Err(e.into()),
        };

        let outcome = self.apply_entries(drive_id, entries).await?;

        // Every item committed; the cursor may advance.
        self.cursors.set(drive_id, &final_cursor).await?;

        info!(
            drive_id = %drive_id,
            items_processed = outcome.items_processed,
            changes_detected = outcome.changes_detected,
            "Reconciliation pass complete"
        );
        Ok(outcome)
    }

    /// Force a full resync: clear the cursor, then run the normal pass
    ///
    /// The first pass after this emits CREATE events for every observed
    /// item that is not already mirrored.
    pub async fn initial_sync(
        &self,
        drive_id: &DriveId,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        self.cursors.clear(drive_id).await?;
        self.reconcile(drive_id).await
    }

    /// Apply a page of entries in provider order, with a single replay of
    /// entries whose parents were unknown on first sight
    async fn apply_entries(
        &self,
        drive_id: &DriveId,
        entries: Vec<DeltaEntry>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let items_processed = entries.len();
        let mut changes_detected = 0usize;
        let mut pending: Vec<DeltaEntry> = Vec::new();

        for entry in entries {
            match self.apply_entry(drive_id, &entry, true).await? {
                Applied::Done(event) => changes_detected += usize::from(event),
                Applied::Deferred => pending.push(entry),
            }
        }

        // Parents never arrive after children in correct provider output,
        // but one replay tolerates ordering anomalies.
        if !pending.is_empty() {
            debug!(
                drive_id = %drive_id,
                deferred = pending.len(),
                "Replaying entries with unresolved parents"
            );
            for entry in pending {
                match self.apply_entry(drive_id, &entry, false).await? {
                    Applied::Done(event) => changes_detected += usize::from(event),
                    Applied::Deferred => unreachable!("replay pass never defers"),
                }
            }
        }

        Ok(ReconcileOutcome {
            items_processed,
            changes_detected,
        })
    }

    /// Classify-and-apply for a single entry, in its own transaction
    async fn apply_entry(
        &self,
        drive_id: &DriveId,
        entry: &DeltaEntry,
        allow_defer: bool,
    ) -> Result<Applied, ReconcileError> {
        if entry.tombstone {
            return self.apply_tombstone(entry).await;
        }

        if entry.name.is_empty() {
            // Soft payload issue: skip the entry, keep the pass alive.
            warn!(
                external_id = %entry.external_id,
                "Live delta entry without a name; skipping"
            );
            return Ok(Applied::Done(false));
        }

        // Resolve the parent. Unknown (or tombstoned) parents defer the
        // entry once; after the replay the item is linked to the root and
        // re-links on its own next observed mutation.
        let new_parent = match &entry.parent_external_id {
            None => None,
            Some(parent_ext) => match self.items.lookup_by_external_id(parent_ext).await? {
                Some(parent) if !parent.deleted => Some(parent.internal_id),
                _ if allow_defer => return Ok(Applied::Deferred),
                _ => {
                    warn!(
                        external_id = %entry.external_id,
                        parent_external_id = %parent_ext,
                        "Parent still unresolved after replay; linking to root"
                    );
                    None
                }
            },
        };

        let kind = if entry.is_folder {
            ItemKind::Folder
        } else {
            ItemKind::File
        };
        let path = self.build_path(entry, new_parent).await?;
        let prev = self.items.lookup_by_external_id(&entry.external_id).await?;

        match prev {
            None => {
                let upsert = self.upsert_from(drive_id, entry, kind, new_parent, path, None);
                let event = NewChangeEvent::created(&entry.name, new_parent);
                self.items.upsert_with_event(upsert, event).await?;
                Ok(Applied::Done(true))
            }
            Some(prev) => self
                .apply_known(drive_id, entry, &prev, kind, new_parent, path)
                .await,
        }
    }

    /// Tombstone branch: silent for unknown or already-deleted items
    async fn apply_tombstone(&self, entry: &DeltaEntry) -> Result<Applied, ReconcileError> {
        let prev = self.items.lookup_by_external_id(&entry.external_id).await?;

        match prev {
            Some(prev) if !prev.deleted => {
                self.items
                    .mark_deleted_with_event(prev.internal_id, NewChangeEvent::deleted(&prev.name))
                    .await?;
                Ok(Applied::Done(true))
            }
            _ => Ok(Applied::Done(false)),
        }
    }

    /// Live entry for a known item: decide the event kind and apply
    async fn apply_known(
        &self,
        drive_id: &DriveId,
        entry: &DeltaEntry,
        prev: &ItemRecord,
        kind: ItemKind,
        new_parent: Option<i64>,
        path: String,
    ) -> Result<Applied, ReconcileError> {
        let name_changed = entry.name != prev.name;
        let parent_changed = new_parent != prev.parent_internal_id;
        let undelete = prev.deleted;
        let metadata_changed = entry
            .modified_at
            .map(|m| m != prev.modified_at)
            .unwrap_or(false);

        // Parent change dominates a simultaneous name change.
        let event = if parent_changed {
            Some(NewChangeEvent::moved(
                &prev.name,
                &entry.name,
                prev.parent_internal_id,
                new_parent,
            ))
        } else if name_changed {
            Some(NewChangeEvent::renamed(&prev.name, &entry.name))
        } else if undelete {
            // Re-created at the same external id with nothing else
            // changed: tracked as undelete + UPDATE.
            Some(NewChangeEvent::updated(&entry.name))
        } else if metadata_changed && self.emit_update_events {
            Some(NewChangeEvent::updated(&entry.name))
        } else {
            None
        };

        match event {
            Some(event) => {
                let upsert =
                    self.upsert_from(drive_id, entry, kind, new_parent, path, Some(prev));
                self.items.upsert_with_event(upsert, event).await?;
                Ok(Applied::Done(true))
            }
            None if metadata_changed => {
                // Refresh the mirror row silently; no audit record.
                let upsert =
                    self.upsert_from(drive_id, entry, kind, new_parent, path, Some(prev));
                self.items.upsert(upsert).await?;
                Ok(Applied::Done(false))
            }
            None => Ok(Applied::Done(false)),
        }
    }

    fn upsert_from(
        &self,
        drive_id: &DriveId,
        entry: &DeltaEntry,
        kind: ItemKind,
        parent_internal_id: Option<i64>,
        path: String,
        prev: Option<&ItemRecord>,
    ) -> ItemUpsert {
        let modified_at = entry
            .modified_at
            .or(prev.map(|p| p.modified_at))
            .unwrap_or_else(chrono::Utc::now);

        ItemUpsert {
            drive_id: drive_id.clone(),
            external_id: entry.external_id.clone(),
            name: entry.name.clone(),
            kind,
            parent_internal_id,
            path,
            modified_at,
            deleted: false,
        }
    }

    /// Rebuild the full path by walking the parent chain upward
    ///
    /// Cycles cannot occur in real provider output; detecting one raises a
    /// fatal data error instead of looping.
    async fn build_path(
        &self,
        entry: &DeltaEntry,
        parent_internal_id: Option<i64>,
    ) -> Result<String, ReconcileError> {
        let mut segments = vec![entry.name.clone()];
        let mut seen: HashSet<i64> = HashSet::new();
        let mut current = parent_internal_id;

        while let Some(id) = current {
            if !seen.insert(id) {
                return Err(ReconcileError::CycleDetected {
                    external_id: entry.external_id.to_string(),
                });
            }
            let node = self.items.lookup_by_internal_id(id).await?.ok_or(
                ReconcileError::BrokenParentChain {
                    external_id: entry.external_id.to_string(),
                    missing: id,
                },
            )?;
            segments.push(node.name);
            current = node.parent_internal_id;
        }

        segments.reverse();
        let (name, ancestors) = segments.split_last().expect("segments never empty");
        let parent_path = if ancestors.is_empty() {
            None
        } else {
            Some(format!("/{}", ancestors.join("/")))
        };
        Ok(child_path(parent_path.as_deref(), name))
    }
}
