//! Shared types for the portal API layer.

use std::sync::Arc;

use uuid::Uuid;

use crate::core_state::CoreState;
use crate::models::enums::Role;

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

/// Authenticated principal, injected into request extensions by the auth
/// middleware. The role is resolved once here and dispatched on
/// explicitly in handlers — no per-handler profile sniffing.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub account_id: Uuid,
    pub role: Role,
    /// The presented bearer token, kept for logout revocation.
    pub token: String,
}
