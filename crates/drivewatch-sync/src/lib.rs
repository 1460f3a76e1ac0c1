//! Drivewatch Sync - change reconciliation and subscription lifecycle
//!
//! This crate hosts the moving parts between the HTTP surface and the
//! adapters:
//!
//! - [`engine::ReconciliationEngine`] - consumes the delta feed, classifies
//!   each entry against the mirror and applies state + event mutations
//! - [`subscription::SubscriptionManager`] - keeps exactly one live push
//!   subscription per watched resource
//! - [`bootstrap::Bootstrap`] - gate validation, subscription, initial full
//!   sync, gate enablement
//! - [`queue::NotificationQueue`] - bounded in-process job queue
//! - [`worker::ReconciliationWorker`] - consumes jobs and drives the engine

pub mod bootstrap;
pub mod engine;
pub mod locks;
pub mod queue;
pub mod subscription;
pub mod worker;

use drivewatch_core::domain::DriveId;

/// Resource path watched for a drive
pub fn resource_for_drive(drive_id: &DriveId) -> String {
    format!("/drives/{}/root", drive_id.as_str())
}

/// Inverse of [`resource_for_drive`]: extract the drive id from a watched
/// resource path
pub fn drive_from_resource(resource: &str) -> Option<DriveId> {
    let rest = resource.strip_prefix("/drives/")?;
    let (drive, tail) = rest.split_once('/')?;
    if tail != "root" {
        return None;
    }
    DriveId::new(drive.to_string()).ok()
}
