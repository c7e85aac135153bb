//! The role-branched profile page: view (lazily creating the profile row
//! on first visit) and edit.

use std::str::FromStr;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Form, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::endpoints::redirect_to;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CurrentUser};
use crate::db::repository::{
    get_admin_by_account, get_caregiver_by_account, get_doctor_by_account, get_patient_by_account,
    insert_admin, insert_caregiver, insert_doctor, insert_patient, update_admin_permissions,
    update_caregiver, update_doctor, update_patient,
};
use crate::models::enums::{Role, Specialization};
use crate::models::{AdminProfile, CaregiverProfile, DoctorProfile, PatientProfile};

/// The profile page model: exactly one variant is populated.
#[derive(Serialize)]
pub struct ProfileView {
    pub role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient: Option<PatientProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caregiver: Option<CaregiverProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor: Option<DoctorProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<AdminProfile>,
}

/// `GET /profile` — view the role profile, creating an empty one on
/// first visit.
pub async fn profile_page(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Response, ApiError> {
    let conn = ctx.core.open_db()?;
    let mut view = ProfileView {
        role: user.role.as_str(),
        patient: None,
        caregiver: None,
        doctor: None,
        admin: None,
    };

    match user.role {
        Role::Patient => view.patient = Some(ensure_patient(&conn, &user.account_id)?),
        Role::Caregiver => view.caregiver = Some(ensure_caregiver(&conn, &user.account_id)?),
        Role::Doctor => view.doctor = Some(ensure_doctor(&conn, &user.account_id)?),
        Role::Admin => view.admin = Some(ensure_admin(&conn, &user.account_id)?),
    }

    Ok(Json(view).into_response())
}

/// Superset of every role's editable fields; the role decides which are
/// read.
#[derive(Deserialize)]
pub struct ProfileForm {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub emergency_contact: Option<String>,
    pub relationship: Option<String>,
    pub contact_number: Option<String>,
    pub specialization: Option<String>,
    pub license_number: Option<String>,
    pub permissions: Option<String>,
}

/// `POST /profile` — save the role profile, then land on the dashboard.
pub async fn update_profile(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<CurrentUser>,
    Form(form): Form<ProfileForm>,
) -> Result<Response, ApiError> {
    let conn = ctx.core.open_db()?;

    match user.role {
        Role::Patient => {
            let mut patient = ensure_patient(&conn, &user.account_id)?;
            patient.first_name = form.first_name.or(patient.first_name);
            patient.last_name = form.last_name.or(patient.last_name);
            patient.gender = form.gender.or(patient.gender);
            patient.address = form.address.or(patient.address);
            patient.emergency_contact = form.emergency_contact.or(patient.emergency_contact);
            update_patient(&conn, &patient)?;
        }
        Role::Caregiver => {
            let mut caregiver = ensure_caregiver(&conn, &user.account_id)?;
            caregiver.first_name = form.first_name.or(caregiver.first_name);
            caregiver.last_name = form.last_name.or(caregiver.last_name);
            caregiver.relationship = form.relationship.or(caregiver.relationship);
            caregiver.contact_number = form.contact_number.or(caregiver.contact_number);
            update_caregiver(&conn, &caregiver)?;
        }
        Role::Doctor => {
            let mut doctor = ensure_doctor(&conn, &user.account_id)?;
            if let Some(raw) = form.specialization {
                let specialization = Specialization::from_str(&raw)
                    .map_err(|_| ApiError::BadRequest(format!("Unknown specialization: {raw}")))?;
                doctor.specialization = Some(specialization);
            }
            doctor.first_name = form.first_name.or(doctor.first_name);
            doctor.last_name = form.last_name.or(doctor.last_name);
            doctor.license_number = form.license_number.or(doctor.license_number);
            update_doctor(&conn, &doctor)?;
        }
        Role::Admin => {
            let admin = ensure_admin(&conn, &user.account_id)?;
            if let Some(permissions) = form.permissions {
                update_admin_permissions(&conn, &admin.id, &permissions)?;
            }
        }
    }

    Ok(redirect_to("/dashboard"))
}

// ── Lazy profile creation ───────────────────────────────

pub(crate) fn ensure_patient(
    conn: &rusqlite::Connection,
    account_id: &Uuid,
) -> Result<PatientProfile, ApiError> {
    if let Some(patient) = get_patient_by_account(conn, account_id)? {
        return Ok(patient);
    }
    let patient = PatientProfile {
        id: Uuid::new_v4(),
        account_id: *account_id,
        first_name: None,
        last_name: None,
        gender: None,
        address: None,
        emergency_contact: None,
    };
    insert_patient(conn, &patient)?;
    Ok(patient)
}

pub(crate) fn ensure_caregiver(
    conn: &rusqlite::Connection,
    account_id: &Uuid,
) -> Result<CaregiverProfile, ApiError> {
    if let Some(caregiver) = get_caregiver_by_account(conn, account_id)? {
        return Ok(caregiver);
    }
    let caregiver = CaregiverProfile {
        id: Uuid::new_v4(),
        account_id: *account_id,
        first_name: None,
        last_name: None,
        relationship: None,
        contact_number: None,
    };
    insert_caregiver(conn, &caregiver)?;
    Ok(caregiver)
}

pub(crate) fn ensure_doctor(
    conn: &rusqlite::Connection,
    account_id: &Uuid,
) -> Result<DoctorProfile, ApiError> {
    if let Some(doctor) = get_doctor_by_account(conn, account_id)? {
        return Ok(doctor);
    }
    let doctor = DoctorProfile {
        id: Uuid::new_v4(),
        account_id: *account_id,
        first_name: None,
        last_name: None,
        specialization: None,
        license_number: None,
        verified: false,
    };
    insert_doctor(conn, &doctor)?;
    Ok(doctor)
}

pub(crate) fn ensure_admin(
    conn: &rusqlite::Connection,
    account_id: &Uuid,
) -> Result<AdminProfile, ApiError> {
    if let Some(admin) = get_admin_by_account(conn, account_id)? {
        return Ok(admin);
    }
    let admin = AdminProfile {
        id: Uuid::new_v4(),
        account_id: *account_id,
        permissions: "{}".to_string(),
    };
    insert_admin(conn, &admin)?;
    Ok(admin)
}
