//! Patient prescription views: the full list and the reminders page
//! derived from it.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::endpoints::{dashboard_redirect, redirect_to};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CurrentUser};
use crate::db::repository::{get_patient_by_account, list_prescriptions_by_patient};
use crate::lifecycle::{medication_reminders, MedicationReminder};
use crate::models::enums::Role;
use crate::models::Prescription;

#[derive(Serialize)]
pub struct PrescriptionsView {
    pub prescriptions: Vec<Prescription>,
}

/// `GET /prescriptions`
pub async fn prescriptions(
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
    let prescriptions = list_prescriptions_by_patient(&conn, &patient.id)?;
    Ok(Json(PrescriptionsView { prescriptions }).into_response())
}

#[derive(Serialize)]
pub struct RemindersView {
    pub reminders: Vec<MedicationReminder>,
}

/// `GET /medication-reminders`
pub async fn reminders(
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
    let reminders = medication_reminders(&conn, &patient.id)?;
    Ok(Json(RemindersView { reminders }).into_response())
}
