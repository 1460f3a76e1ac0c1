//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the interfaces the domain core depends on; their
//! implementations live in adapter crates.
//!
//! - [`IProviderGateway`] - delta queries, subscription CRUD, identity probes
//! - [`IItemRepository`] / [`IEventRepository`] / [`ICursorRepository`] /
//!   [`ISubscriptionRepository`] - persistent mirror state
//! - [`IJobQueue`] - at-least-once FIFO carrying reconciliation jobs

pub mod job_queue;
pub mod provider_gateway;
pub mod repositories;

pub use job_queue::{IJobQueue, QueueError, SyncJob};
pub use provider_gateway::{
    DeltaEntry, DeltaPage, GatewayError, IProviderGateway, IdentityProbe, InvalidReason,
    NewSubscription, Principal, ProviderSubscription,
};
pub use repositories::{
    ICursorRepository, IEventRepository, IItemRepository, ISubscriptionRepository, StoreError,
};
