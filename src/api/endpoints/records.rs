//! The patient's own health-record page. First view bootstraps the
//! record with defaults synthesized from the request history.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::endpoints::{dashboard_redirect, redirect_to};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CurrentUser};
use crate::db::repository::get_patient_by_account;
use crate::models::enums::Role;
use crate::models::HealthRecord;
use crate::records::ensure_health_record;

#[derive(Serialize)]
pub struct HealthRecordView {
    pub record: HealthRecord,
}

/// `GET /health-records`
pub async fn health_records(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Response, ApiError> {
    if user.role != Role::Patient {
        return Ok(dashboard_redirect());
    }
    let conn = ctx.core.open_db()?;
    let Some(patient) = get_patient_by_account(&conn, &user.account_id)? else {
        return Ok(redirect_to("/profile"));
    };
    let record = ensure_health_record(&conn, &patient.id)?;
    Ok(Json(HealthRecordView { record }).into_response())
}
