//! Notifications: feedback entries surfaced per role, and the patient's
//! sent → read flip.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::api::endpoints::{dashboard_redirect, redirect_to};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CurrentUser};
use crate::db::repository::{
    get_caregiver_by_account, get_patient_by_account, list_feedback_for_patient,
};
use crate::emergency::{feedback_for_caregiver, mark_feedback_read, EmergencyError, FeedbackFeedItem};
use crate::models::enums::Role;
use crate::models::FeedbackEntry;

#[derive(Serialize)]
pub struct PatientNotificationsView {
    pub notifications: Vec<FeedbackEntry>,
}

#[derive(Serialize)]
pub struct CaregiverNotificationsView {
    pub notifications: Vec<FeedbackFeedItem>,
}

/// `GET /notifications` — patients see their own feedback, caregivers
/// their assigned patients', doctors are sent to their work queue.
pub async fn notifications(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Response, ApiError> {
    let conn = ctx.core.open_db()?;
    match user.role {
        Role::Patient => {
            let Some(patient) = get_patient_by_account(&conn, &user.account_id)? else {
                return Ok(redirect_to("/profile"));
            };
            let notifications = list_feedback_for_patient(&conn, &patient.id)?;
            Ok(Json(PatientNotificationsView { notifications }).into_response())
        }
        Role::Caregiver => {
            let Some(caregiver) = get_caregiver_by_account(&conn, &user.account_id)? else {
                return Ok(redirect_to("/profile"));
            };
            let notifications = feedback_for_caregiver(&conn, &caregiver.id)?;
            Ok(Json(CaregiverNotificationsView { notifications }).into_response())
        }
        Role::Doctor => Ok(redirect_to("/doctor/requests")),
        Role::Admin => Ok(dashboard_redirect()),
    }
}

/// `POST /notifications/:feedback_id/read`
pub async fn mark_read(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<CurrentUser>,
    Path(feedback_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    if user.role != Role::Patient {
        return Ok(dashboard_redirect());
    }
    let conn = ctx.core.open_db()?;
    let Some(patient) = get_patient_by_account(&conn, &user.account_id)? else {
        return Ok(dashboard_redirect());
    };

    match mark_feedback_read(&conn, &patient.id, &feedback_id) {
        Ok(()) => Ok(redirect_to("/notifications")),
        Err(EmergencyError::Stale) => Err(ApiError::StaleState),
        Err(EmergencyError::NotFound | EmergencyError::NotPermitted) => Ok(dashboard_redirect()),
        Err(EmergencyError::Database(e)) => Err(e.into()),
    }
}
