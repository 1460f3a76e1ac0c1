//! Integration tests for the Microsoft Graph adapter
//!
//! Uses wiremock to simulate the Graph API and verifies identity probes,
//! delta pagination, throttle retry and subscription CRUD against the
//! port contract.

mod test_delta;
mod test_identity;
mod test_subscriptions;
