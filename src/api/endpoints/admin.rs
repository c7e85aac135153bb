//! Administration: doctor verification, account management, live report
//! counts, and caregiver assignment.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Form, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::endpoints::{dashboard_redirect, redirect_to};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CurrentUser};
use crate::db::repository::{
    assign_patient, count_accounts_by_role, count_alerts_by_status, count_bills_by_status,
    count_requests_by_status, get_admin_by_account, get_caregiver, get_doctor, get_patient,
    list_accounts, list_unverified_doctors, set_doctor_verified, unassign_patient,
};
use crate::models::enums::Role;
use crate::models::{AdminProfile, DoctorProfile};

/// Resolve the acting admin, or the page to bounce to instead. Admins
/// without granted permissions are sent to finish their profile.
fn load_admin(
    conn: &rusqlite::Connection,
    user: &CurrentUser,
) -> Result<Result<AdminProfile, Response>, ApiError> {
    if user.role != Role::Admin {
        return Ok(Err(dashboard_redirect()));
    }
    match get_admin_by_account(conn, &user.account_id)? {
        Some(admin) if admin.has_permissions() => Ok(Ok(admin)),
        _ => Ok(Err(redirect_to("/profile"))),
    }
}

#[derive(Serialize)]
pub struct AdminDashboardView {
    pub unverified_doctors: Vec<DoctorProfile>,
}

/// `GET /admin/dashboard` — the verification queue.
pub async fn admin_dashboard(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Response, ApiError> {
    let conn = ctx.core.open_db()?;
    if let Err(bounce) = load_admin(&conn, &user)? {
        return Ok(bounce);
    }
    let unverified_doctors = list_unverified_doctors(&conn)?;
    Ok(Json(AdminDashboardView { unverified_doctors }).into_response())
}

#[derive(Deserialize)]
pub struct VerifyForm {
    /// "verify" or "reject".
    pub action: String,
    #[allow(dead_code)]
    pub reason: Option<String>,
}

/// `POST /admin/doctors/:doctor_id/verify`
pub async fn verify_doctor(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<CurrentUser>,
    Path(doctor_id): Path<Uuid>,
    Form(form): Form<VerifyForm>,
) -> Result<Response, ApiError> {
    let conn = ctx.core.open_db()?;
    if let Err(bounce) = load_admin(&conn, &user)? {
        return Ok(bounce);
    }
    if get_doctor(&conn, &doctor_id)?.is_none() {
        return Ok(dashboard_redirect());
    }

    let verified = match form.action.as_str() {
        "verify" => true,
        "reject" => false,
        other => {
            return Err(ApiError::BadRequest(format!("Unknown action: {other}")));
        }
    };
    set_doctor_verified(&conn, &doctor_id, verified)?;
    tracing::info!(doctor_id = %doctor_id, verified, "Doctor verification updated");
    Ok(redirect_to("/admin/dashboard"))
}

#[derive(Serialize)]
pub struct AccountRow {
    pub id: Uuid,
    pub email: String,
    pub role: &'static str,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct ManageUsersView {
    pub users: Vec<AccountRow>,
}

/// `GET /admin/users`
pub async fn manage_users(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Response, ApiError> {
    let conn = ctx.core.open_db()?;
    if let Err(bounce) = load_admin(&conn, &user)? {
        return Ok(bounce);
    }

    let users = list_accounts(&conn)?
        .into_iter()
        .map(|account| AccountRow {
            id: account.id,
            email: account.email,
            role: account.role.as_str(),
            created_at: account.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        })
        .collect();
    Ok(Json(ManageUsersView { users }).into_response())
}

#[derive(Serialize)]
pub struct ReportsView {
    pub accounts_by_role: Vec<(String, i64)>,
    pub requests_by_status: Vec<(String, i64)>,
    pub alerts_by_status: Vec<(String, i64)>,
    pub bills_by_status: Vec<(String, i64)>,
}

/// `GET /admin/reports` — live counts.
pub async fn reports(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Response, ApiError> {
    let conn = ctx.core.open_db()?;
    if let Err(bounce) = load_admin(&conn, &user)? {
        return Ok(bounce);
    }

    Ok(Json(ReportsView {
        accounts_by_role: count_accounts_by_role(&conn)?,
        requests_by_status: count_requests_by_status(&conn)?,
        alerts_by_status: count_alerts_by_status(&conn)?,
        bills_by_status: count_bills_by_status(&conn)?,
    })
    .into_response())
}

#[derive(Deserialize)]
pub struct AssignmentForm {
    pub caregiver_id: Uuid,
    pub patient_id: Uuid,
}

/// `POST /admin/assignments` — assign a patient to a caregiver.
/// Re-assignment is a no-op.
pub async fn assign(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<CurrentUser>,
    Form(form): Form<AssignmentForm>,
) -> Result<Response, ApiError> {
    let conn = ctx.core.open_db()?;
    if let Err(bounce) = load_admin(&conn, &user)? {
        return Ok(bounce);
    }
    if get_caregiver(&conn, &form.caregiver_id)?.is_none()
        || get_patient(&conn, &form.patient_id)?.is_none()
    {
        return Ok(dashboard_redirect());
    }

    assign_patient(&conn, &form.caregiver_id, &form.patient_id)?;
    Ok(redirect_to("/admin/dashboard"))
}

/// `POST /admin/assignments/remove`
pub async fn unassign(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<CurrentUser>,
    Form(form): Form<AssignmentForm>,
) -> Result<Response, ApiError> {
    let conn = ctx.core.open_db()?;
    if let Err(bounce) = load_admin(&conn, &user)? {
        return Ok(bounce);
    }

    unassign_patient(&conn, &form.caregiver_id, &form.patient_id)?;
    Ok(redirect_to("/admin/dashboard"))
}
