//! Portal HTTP surface.
//!
//! Role-scoped endpoints over the lifecycle/emergency/records domain
//! modules. GET display routes answer with JSON page models; state-
//! changing POSTs take form bodies and answer with redirects. The router
//! is composable — `portal_router()` returns a `Router` that can be
//! mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::portal_router;
pub use server::{start_portal_server, PortalServer};
pub use types::ApiContext;
