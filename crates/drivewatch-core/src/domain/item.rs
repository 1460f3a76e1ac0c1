//! Item entity - mirror of one file or folder
//!
//! An [`ItemRecord`] is one row of the mirror. Items are created on first
//! observation, mutated on name/parent/metadata change and soft-deleted on
//! tombstone observation; the core never hard-deletes them.
//!
//! The `path` column is derived state: it is rebuilt deterministically from
//! the live parent chain on every mutation and must never be treated as the
//! source of truth for the hierarchy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::DomainError;
use super::newtypes::{DriveId, ExternalId};

/// Whether an item is a file or a folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    File,
    Folder,
}

impl ItemKind {
    /// Stable string form used for persistence
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::File => "file",
            ItemKind::Folder => "folder",
        }
    }

    /// Parse the persisted string form
    ///
    /// # Errors
    /// Returns `DomainError::ValidationFailed` on an unknown kind.
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "file" => Ok(ItemKind::File),
            "folder" => Ok(ItemKind::Folder),
            other => Err(DomainError::ValidationFailed(format!(
                "Unknown item kind: {other}"
            ))),
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of the drive mirror
///
/// `internal_id` is the locally assigned stable primary key;
/// `external_id` is the provider's identifier and is unique across all
/// items in the store, tombstoned ones included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Locally assigned stable primary key
    pub internal_id: i64,
    /// Drive this item belongs to
    pub drive_id: DriveId,
    /// Provider item identifier
    pub external_id: ExternalId,
    /// Display name (file or folder name)
    pub name: String,
    /// File or folder
    pub kind: ItemKind,
    /// Internal id of the parent; `None` iff this is the drive root
    pub parent_internal_id: Option<i64>,
    /// Full slash-delimited path from the root, derived from the parent chain
    pub path: String,
    /// Creation timestamp (provider-reported, or local fallback)
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp
    pub modified_at: DateTime<Utc>,
    /// Soft-delete flag; deleted rows stay for audit history
    pub deleted: bool,
}

/// Values for inserting or updating one mirror row
///
/// The repository resolves this into an insert (unknown `external_id`) or
/// an update of the existing row, returning the resulting [`ItemRecord`].
#[derive(Debug, Clone, PartialEq)]
pub struct ItemUpsert {
    pub drive_id: DriveId,
    pub external_id: ExternalId,
    pub name: String,
    pub kind: ItemKind,
    pub parent_internal_id: Option<i64>,
    pub path: String,
    pub modified_at: DateTime<Utc>,
    /// Clear the soft-delete flag (provider re-created the item at the
    /// same external id)
    pub deleted: bool,
}

/// Build a child path from its parent's path and its own name.
///
/// A `None` parent path means the item sits directly under the drive root.
pub fn child_path(parent_path: Option<&str>, name: &str) -> String {
    match parent_path {
        None | Some("") | Some("/") => format!("/{name}"),
        Some(parent) => format!("{parent}/{name}"),
    }
}
