//! Drivewatch Server - inbound HTTP surface
//!
//! Serves the three endpoints of the mirror service:
//!
//! - `POST /bootstrap` - operator-triggered gate + subscription + full sync
//! - `POST /notify` - provider push: handshake echo or notification fan-in
//! - `GET /healthz` - liveness probe
//!
//! The binary (`drivewatchd`) wires configuration, the SQLite store, the
//! Graph gateway, the reconciliation worker and this router together.

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;
