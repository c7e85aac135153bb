//! Role dashboards. Each role lands here after login; incomplete
//! profiles bounce to `/profile`, unverified doctors to their holding
//! page, admins to `/admin/dashboard`.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::endpoints::redirect_to;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CurrentUser};
use crate::db::repository::{
    get_caregiver_by_account, get_doctor_by_account, get_patient_by_account,
    list_requests_by_patient,
};
use crate::emergency::{feedback_for_caregiver, sent_alerts_for_caregiver, AlertFeedItem, FeedbackFeedItem};
use crate::models::enums::Role;
use crate::models::{PatientProfile, ServiceRequest};

#[derive(Serialize)]
pub struct PatientDashboard {
    pub profile: PatientProfile,
    pub requests: Vec<ServiceRequest>,
}

#[derive(Serialize)]
pub struct CaregiverDashboard {
    pub assigned_patient_count: usize,
    pub emergency_notifications: Vec<AlertFeedItem>,
    pub feedback_notifications: Vec<FeedbackFeedItem>,
}

#[derive(Serialize)]
pub struct DoctorDashboard {
    pub pending_in_specialization: usize,
}

/// `GET /dashboard`
pub async fn dashboard(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Response, ApiError> {
    let conn = ctx.core.open_db()?;

    match user.role {
        Role::Patient => {
            let Some(profile) = get_patient_by_account(&conn, &user.account_id)? else {
                return Ok(redirect_to("/profile"));
            };
            if profile.first_name.is_none() {
                return Ok(redirect_to("/profile"));
            }
            let requests = list_requests_by_patient(&conn, &profile.id)?;
            Ok(Json(PatientDashboard { profile, requests }).into_response())
        }
        Role::Caregiver => {
            let Some(profile) = get_caregiver_by_account(&conn, &user.account_id)? else {
                return Ok(redirect_to("/profile"));
            };
            if profile.first_name.is_none() {
                return Ok(redirect_to("/profile"));
            }
            let emergency_notifications = sent_alerts_for_caregiver(&conn, &profile.id)?;
            let feedback_notifications = feedback_for_caregiver(&conn, &profile.id)?;
            let assigned_patient_count =
                crate::db::repository::assigned_patient_ids(&conn, &profile.id)?.len();
            Ok(Json(CaregiverDashboard {
                assigned_patient_count,
                emergency_notifications,
                feedback_notifications,
            })
            .into_response())
        }
        Role::Doctor => {
            let Some(profile) = get_doctor_by_account(&conn, &user.account_id)? else {
                return Ok(redirect_to("/profile"));
            };
            if profile.first_name.is_none() {
                return Ok(redirect_to("/profile"));
            }
            if !profile.verified {
                return Ok(redirect_to("/unverified-doctor"));
            }
            let pending = match crate::lifecycle::doctor_work_queue(&conn, &profile) {
                Ok(queue) => queue.len(),
                Err(_) => 0,
            };
            Ok(Json(DoctorDashboard {
                pending_in_specialization: pending,
            })
            .into_response())
        }
        Role::Admin => Ok(redirect_to("/admin/dashboard")),
    }
}
