//! Portal endpoint handlers, one module per page group.
//!
//! Shared conventions: entity-not-found and wrong-role conditions fall
//! through to a silent `/dashboard` redirect (never surfaced, never
//! logged); stale compare-and-set failures surface as 409.

pub mod admin;
pub mod auth;
pub mod billing;
pub mod booking;
pub mod caregiver;
pub mod dashboard;
pub mod doctor;
pub mod emergency;
pub mod notifications;
pub mod prescriptions;
pub mod profile;
pub mod records;

use axum::response::{IntoResponse, Redirect, Response};

/// The silent fallback for not-found and wrong-role conditions.
pub(crate) fn dashboard_redirect() -> Response {
    Redirect::to("/dashboard").into_response()
}

pub(crate) fn redirect_to(path: &str) -> Response {
    Redirect::to(path).into_response()
}
