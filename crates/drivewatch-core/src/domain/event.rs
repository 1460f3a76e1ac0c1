//! ChangeEvent entity - append-only audit record of one classified change
//!
//! Events are classified against the persisted state at reconciliation
//! time: an observed item that was previously unknown yields CREATE, a
//! name change yields RENAME, a parent change yields MOVE (which dominates
//! a simultaneous name change), a tombstone yields DELETE, and a pure
//! metadata change yields UPDATE. The log is append-only; the core never
//! updates or deletes an event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::DomainError;

/// Kind of a classified change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Create,
    Rename,
    Move,
    Delete,
    Update,
}

impl ChangeKind {
    /// Stable string form used for persistence
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Create => "create",
            ChangeKind::Rename => "rename",
            ChangeKind::Move => "move",
            ChangeKind::Delete => "delete",
            ChangeKind::Update => "update",
        }
    }

    /// Parse the persisted string form
    ///
    /// # Errors
    /// Returns `DomainError::ValidationFailed` on an unknown kind.
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "create" => Ok(ChangeKind::Create),
            "rename" => Ok(ChangeKind::Rename),
            "move" => Ok(ChangeKind::Move),
            "delete" => Ok(ChangeKind::Delete),
            "update" => Ok(ChangeKind::Update),
            other => Err(DomainError::ValidationFailed(format!(
                "Unknown change kind: {other}"
            ))),
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One persisted audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Insertion id, monotonic; breaks timestamp ties in the ordering
    pub id: i64,
    /// The item this event belongs to (never null)
    pub item_internal_id: i64,
    pub kind: ChangeKind,
    pub old_name: Option<String>,
    pub new_name: Option<String>,
    pub old_parent_internal_id: Option<i64>,
    pub new_parent_internal_id: Option<i64>,
    /// Store-assigned on insert
    pub timestamp: DateTime<Utc>,
}

/// A change event awaiting insertion
///
/// The item association and the timestamp are supplied by the repository
/// at insert time; the constructors populate the old/new fields per kind.
#[derive(Debug, Clone, PartialEq)]
pub struct NewChangeEvent {
    pub kind: ChangeKind,
    pub old_name: Option<String>,
    pub new_name: Option<String>,
    pub old_parent_internal_id: Option<i64>,
    pub new_parent_internal_id: Option<i64>,
}

impl NewChangeEvent {
    /// First observation of an item
    pub fn created(new_name: &str, new_parent: Option<i64>) -> Self {
        Self {
            kind: ChangeKind::Create,
            old_name: None,
            new_name: Some(new_name.to_string()),
            old_parent_internal_id: None,
            new_parent_internal_id: new_parent,
        }
    }

    /// Name changed, parent unchanged
    pub fn renamed(old_name: &str, new_name: &str) -> Self {
        Self {
            kind: ChangeKind::Rename,
            old_name: Some(old_name.to_string()),
            new_name: Some(new_name.to_string()),
            old_parent_internal_id: None,
            new_parent_internal_id: None,
        }
    }

    /// Parent changed; carries both names so that a simultaneous rename
    /// is still visible in the audit trail
    pub fn moved(
        old_name: &str,
        new_name: &str,
        old_parent: Option<i64>,
        new_parent: Option<i64>,
    ) -> Self {
        Self {
            kind: ChangeKind::Move,
            old_name: Some(old_name.to_string()),
            new_name: Some(new_name.to_string()),
            old_parent_internal_id: old_parent,
            new_parent_internal_id: new_parent,
        }
    }

    /// Tombstone observed for a known, live item
    pub fn deleted(old_name: &str) -> Self {
        Self {
            kind: ChangeKind::Delete,
            old_name: Some(old_name.to_string()),
            new_name: None,
            old_parent_internal_id: None,
            new_parent_internal_id: None,
        }
    }

    /// Metadata-only change (or an undelete at the same external id)
    pub fn updated(name: &str) -> Self {
        Self {
            kind: ChangeKind::Update,
            old_name: None,
            new_name: Some(name.to_string()),
            old_parent_internal_id: None,
            new_parent_internal_id: None,
        }
    }
}
