//! The emergency button and the caregiver's alert actions.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::api::endpoints::{dashboard_redirect, redirect_to};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CurrentUser};
use crate::db::repository::{get_caregiver_by_account, get_patient_by_account};
use crate::emergency::{
    acknowledge_alert, raise_alert, resolve_alert, sent_alerts_for_caregiver, AlertFeedItem,
    EmergencyError,
};
use crate::models::enums::Role;

/// `POST /emergency-button` — raise an alert to the default caregiver.
/// No caregiver in the store means no alert; either way, back to the
/// dashboard.
pub async fn emergency_button(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Response, ApiError> {
    if user.role != Role::Patient {
        return Ok(dashboard_redirect());
    }
    let conn = ctx.core.open_db()?;
    let Some(patient) = get_patient_by_account(&conn, &user.account_id)? else {
        return Ok(dashboard_redirect());
    };
    raise_alert(&conn, &patient.id)?;
    Ok(dashboard_redirect())
}

#[derive(Serialize)]
pub struct EmergencyAlertsView {
    pub emergency_notifications: Vec<AlertFeedItem>,
}

/// `GET /caregiver/emergency-alerts`
pub async fn emergency_alerts(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Response, ApiError> {
    if user.role != Role::Caregiver {
        return Ok(dashboard_redirect());
    }
    let conn = ctx.core.open_db()?;
    let Some(caregiver) = get_caregiver_by_account(&conn, &user.account_id)? else {
        return Ok(redirect_to("/profile"));
    };
    let emergency_notifications = sent_alerts_for_caregiver(&conn, &caregiver.id)?;
    Ok(Json(EmergencyAlertsView {
        emergency_notifications,
    })
    .into_response())
}

/// `POST /emergency/:alert_id/acknowledge`
pub async fn acknowledge(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<CurrentUser>,
    Path(alert_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    if user.role != Role::Caregiver {
        return Ok(dashboard_redirect());
    }
    let mut conn = ctx.core.open_db()?;
    let Some(caregiver) = get_caregiver_by_account(&conn, &user.account_id)? else {
        return Ok(dashboard_redirect());
    };

    match acknowledge_alert(&mut conn, &caregiver.id, &alert_id) {
        Ok(_) => Ok(dashboard_redirect()),
        Err(EmergencyError::Stale) => Err(ApiError::StaleState),
        Err(EmergencyError::NotFound | EmergencyError::NotPermitted) => Ok(dashboard_redirect()),
        Err(EmergencyError::Database(e)) => Err(e.into()),
    }
}

/// `POST /emergency/:alert_id/resolve`
pub async fn resolve(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<CurrentUser>,
    Path(alert_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    if user.role != Role::Caregiver {
        return Ok(dashboard_redirect());
    }
    let conn = ctx.core.open_db()?;
    let Some(caregiver) = get_caregiver_by_account(&conn, &user.account_id)? else {
        return Ok(dashboard_redirect());
    };

    match resolve_alert(&conn, &caregiver.id, &alert_id) {
        Ok(()) => Ok(dashboard_redirect()),
        Err(EmergencyError::Stale) => Err(ApiError::StaleState),
        Err(EmergencyError::NotFound | EmergencyError::NotPermitted) => Ok(dashboard_redirect()),
        Err(EmergencyError::Database(e)) => Err(e.into()),
    }
}
