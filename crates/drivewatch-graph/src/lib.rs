//! Drivewatch Graph - Microsoft Graph adapter
//!
//! Implements the `IProviderGateway` port from `drivewatch-core` against
//! the Microsoft Graph API v1.0:
//!
//! - [`client::GraphClient`] - authenticated HTTP client with status
//!   classification and retry/backoff for throttled and transient failures
//! - [`delta`] - delta feed queries and payload narrowing
//! - [`subscriptions`] - change-notification subscription CRUD
//! - [`provider::GraphGateway`] - the port implementation tying it together

pub mod client;
pub mod delta;
pub mod provider;
pub mod subscriptions;

pub use client::GraphClient;
pub use provider::GraphGateway;
