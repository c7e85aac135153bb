//! Registration, login, and logout.
//!
//! Login is the one POST that answers with a body instead of a bare
//! redirect: the client needs the bearer token alongside the landing
//! route. "Invalid credentials" is the one inline user-visible error.

use std::str::FromStr;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Form, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::endpoints::redirect_to;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CurrentUser};
use crate::auth::{hash_password, verify_password};
use crate::db::repository::{
    get_account_by_email, get_admin_by_account, get_caregiver_by_account, get_doctor_by_account,
    get_patient_by_account, insert_account,
};
use crate::models::enums::Role;
use crate::models::Account;

#[derive(Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub role: String,
}

/// `POST /register` — create an account, then land on the login page.
pub async fn register(
    State(ctx): State<ApiContext>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, ApiError> {
    let role = Role::from_str(&form.role)
        .map_err(|_| ApiError::BadRequest(format!("Unknown role: {}", form.role)))?;
    if form.email.trim().is_empty() || form.password.is_empty() {
        return Err(ApiError::BadRequest("Email and password are required".into()));
    }

    let conn = ctx.core.open_db()?;
    if get_account_by_email(&conn, &form.email)?.is_some() {
        return Err(ApiError::BadRequest("Email already registered".into()));
    }

    let account = Account {
        id: Uuid::new_v4(),
        email: form.email.trim().to_string(),
        password_hash: hash_password(&form.password)
            .map_err(|e| ApiError::Internal(e.to_string()))?,
        role,
        created_at: chrono::Utc::now().naive_utc(),
    };
    insert_account(&conn, &account)?;
    tracing::info!(account_id = %account.id, role = role.as_str(), "Account registered");

    Ok(redirect_to("/login"))
}

/// `GET /` — the portal has no anonymous landing page.
pub async fn home() -> Response {
    redirect_to("/login")
}

#[derive(Serialize)]
pub struct LoginView {
    pub error: Option<&'static str>,
}

/// `GET /login` — the login page model.
pub async fn login_page() -> Json<LoginView> {
    Json(LoginView { error: None })
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub redirect: String,
}

/// `POST /login` — authenticate and hand out a session token plus the
/// role-appropriate landing route.
pub async fn login(
    State(ctx): State<ApiContext>,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    let conn = ctx.core.open_db()?;

    let account = match get_account_by_email(&conn, &form.email)? {
        Some(account) if verify_password(&form.password, &account.password_hash) => account,
        _ => {
            // Re-present the login page with the inline error.
            return Ok(Json(LoginView {
                error: Some("Invalid credentials"),
            })
            .into_response());
        }
    };

    let redirect = landing_route(&conn, &account)?;
    let token = ctx.core.issue_session(account.id, account.role)?;
    tracing::info!(account_id = %account.id, "Login");

    Ok(Json(LoginResponse {
        token,
        redirect: redirect.to_string(),
    })
    .into_response())
}

/// Where a fresh login lands: incomplete profiles go to `/profile`,
/// unverified doctors to their holding page, admins to their dashboard.
fn landing_route(
    conn: &rusqlite::Connection,
    account: &Account,
) -> Result<&'static str, ApiError> {
    let route = match account.role {
        Role::Patient => match get_patient_by_account(conn, &account.id)? {
            Some(patient) if patient.first_name.is_some() => "/dashboard",
            _ => "/profile",
        },
        Role::Caregiver => match get_caregiver_by_account(conn, &account.id)? {
            Some(caregiver) if caregiver.first_name.is_some() => "/dashboard",
            _ => "/profile",
        },
        Role::Doctor => match get_doctor_by_account(conn, &account.id)? {
            Some(doctor) if doctor.first_name.is_some() => {
                if doctor.verified {
                    "/dashboard"
                } else {
                    "/unverified-doctor"
                }
            }
            _ => "/profile",
        },
        Role::Admin => match get_admin_by_account(conn, &account.id)? {
            Some(admin) if admin.has_permissions() => "/admin/dashboard",
            _ => "/profile",
        },
    };
    Ok(route)
}

/// `POST /logout` — revoke the session, land on the login page.
pub async fn logout(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Response, ApiError> {
    ctx.core.revoke_session(&user.token)?;
    Ok(redirect_to("/login"))
}

#[derive(Serialize)]
pub struct UnverifiedDoctorView {
    pub message: &'static str,
}

/// `GET /unverified-doctor` — holding page until an admin verifies.
pub async fn unverified_doctor() -> Json<UnverifiedDoctorView> {
    Json(UnverifiedDoctorView {
        message: "Your credentials are awaiting administrator verification.",
    })
}
