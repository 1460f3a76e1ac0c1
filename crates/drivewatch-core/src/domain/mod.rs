//! Domain entities and value types
//!
//! The mirror is modelled by four entities: [`ItemRecord`] (one file or
//! folder), [`ChangeEvent`] (one audit record), [`DriveCursor`] (per-drive
//! incremental sync state) and [`Subscription`] (one live push
//! subscription). Identifiers that come from the provider are wrapped in
//! validated newtypes; locally assigned ids are plain `i64` rowids.

pub mod cursor;
pub mod errors;
pub mod event;
pub mod item;
pub mod newtypes;
pub mod subscription;

pub use cursor::DriveCursor;
pub use errors::DomainError;
pub use event::{ChangeEvent, ChangeKind, NewChangeEvent};
pub use item::{child_path, ItemKind, ItemRecord, ItemUpsert};
pub use newtypes::{DeltaCursor, DriveId, ExternalId, SubscriptionId};
pub use subscription::Subscription;
