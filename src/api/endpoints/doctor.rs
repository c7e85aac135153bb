//! The doctor work queue and clinical actions on accepted requests.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Form, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::endpoints::{dashboard_redirect, redirect_to};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CurrentUser};
use crate::db::repository::{
    get_doctor_by_account, get_health_record_by_patient, get_patient, has_accepted_request,
};
use crate::lifecycle::{
    accept_request, complete_session, doctor_work_queue, issue_prescription, record_observation,
    reject_request, set_service_cost, LifecycleError, PrescriptionInput,
};
use crate::models::enums::Role;
use crate::models::{DoctorProfile, HealthRecord, PatientProfile, ServiceRequest};
use crate::records::{apply_record_update, ensure_health_record, RecordUpdate};

/// Resolve the acting doctor, or the page to bounce to instead.
fn load_doctor(
    conn: &rusqlite::Connection,
    user: &CurrentUser,
) -> Result<Result<DoctorProfile, Response>, ApiError> {
    if user.role != Role::Doctor {
        return Ok(Err(dashboard_redirect()));
    }
    match get_doctor_by_account(conn, &user.account_id)? {
        Some(doctor) => Ok(Ok(doctor)),
        None => Ok(Err(redirect_to("/profile"))),
    }
}

#[derive(Serialize)]
pub struct WorkQueueView {
    pub pending_requests: Vec<ServiceRequest>,
}

/// `GET /doctor/requests` — pending requests in the doctor's own
/// specialization.
pub async fn view_requests(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Response, ApiError> {
    let conn = ctx.core.open_db()?;
    let doctor = match load_doctor(&conn, &user)? {
        Ok(doctor) => doctor,
        Err(bounce) => return Ok(bounce),
    };

    match doctor_work_queue(&conn, &doctor) {
        Ok(pending_requests) => Ok(Json(WorkQueueView { pending_requests }).into_response()),
        Err(LifecycleError::NotPermitted) => Ok(redirect_to("/unverified-doctor")),
        Err(LifecycleError::Database(e)) => Err(e.into()),
        Err(_) => Ok(dashboard_redirect()),
    }
}

/// `POST /doctor/requests/:id/accept` — on success, straight to the
/// patient's records; on a specialization mismatch, back to the
/// (filtered) queue with nothing mutated.
pub async fn accept(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<CurrentUser>,
    Path(request_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let conn = ctx.core.open_db()?;
    let doctor = match load_doctor(&conn, &user)? {
        Ok(doctor) => doctor,
        Err(bounce) => return Ok(bounce),
    };

    match accept_request(&conn, &doctor, &request_id) {
        Ok(request) => Ok(redirect_to(&format!(
            "/doctor/health-records/{}",
            request.patient_id
        ))),
        Err(LifecycleError::SpecializationMismatch) => Ok(redirect_to("/doctor/requests")),
        Err(LifecycleError::Stale) => Err(ApiError::StaleState),
        Err(LifecycleError::NotFound | LifecycleError::NotPermitted) => Ok(dashboard_redirect()),
        Err(LifecycleError::Database(e)) => Err(e.into()),
    }
}

#[derive(Deserialize)]
pub struct RejectForm {
    /// Accepted but not persisted.
    pub reason: Option<String>,
}

/// `POST /doctor/requests/:id/reject`
pub async fn reject(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<CurrentUser>,
    Path(request_id): Path<Uuid>,
    Form(form): Form<RejectForm>,
) -> Result<Response, ApiError> {
    let conn = ctx.core.open_db()?;
    let doctor = match load_doctor(&conn, &user)? {
        Ok(doctor) => doctor,
        Err(bounce) => return Ok(bounce),
    };

    match reject_request(&conn, &doctor, &request_id, form.reason.as_deref()) {
        Ok(()) => Ok(redirect_to("/doctor/requests")),
        Err(LifecycleError::Stale) => Err(ApiError::StaleState),
        Err(LifecycleError::NotFound | LifecycleError::NotPermitted) => Ok(dashboard_redirect()),
        Err(LifecycleError::SpecializationMismatch) => Ok(redirect_to("/doctor/requests")),
        Err(LifecycleError::Database(e)) => Err(e.into()),
    }
}

#[derive(Serialize)]
pub struct PatientRecordView {
    pub patient: PatientProfile,
    pub record: Option<HealthRecord>,
    /// Whether the acting doctor may update the record.
    pub editable: bool,
}

/// `GET /doctor/health-records/:patient_id` — any doctor may view;
/// access during an accepted request bootstraps the record and unlocks
/// editing.
pub async fn patient_records(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<CurrentUser>,
    Path(patient_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let conn = ctx.core.open_db()?;
    let doctor = match load_doctor(&conn, &user)? {
        Ok(doctor) => doctor,
        Err(bounce) => return Ok(bounce),
    };

    let Some(patient) = get_patient(&conn, &patient_id)? else {
        return Ok(dashboard_redirect());
    };

    let editable = has_accepted_request(&conn, &doctor.id, &patient_id)?;
    let record = if editable {
        Some(ensure_health_record(&conn, &patient_id)?)
    } else {
        get_health_record_by_patient(&conn, &patient_id)?
    };

    Ok(Json(PatientRecordView {
        patient,
        record,
        editable,
    })
    .into_response())
}

/// `POST /doctor/health-records/:patient_id` — in-place record update,
/// gated on an accepted request.
pub async fn update_patient_record(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<CurrentUser>,
    Path(patient_id): Path<Uuid>,
    Form(update): Form<RecordUpdate>,
) -> Result<Response, ApiError> {
    let conn = ctx.core.open_db()?;
    let doctor = match load_doctor(&conn, &user)? {
        Ok(doctor) => doctor,
        Err(bounce) => return Ok(bounce),
    };

    if get_patient(&conn, &patient_id)?.is_none() {
        return Ok(dashboard_redirect());
    }
    if !has_accepted_request(&conn, &doctor.id, &patient_id)? {
        return Ok(dashboard_redirect());
    }

    apply_record_update(&conn, &patient_id, update)?;
    Ok(redirect_to(&format!("/doctor/health-records/{patient_id}")))
}

#[derive(Deserialize)]
pub struct ObservationForm {
    pub notes: String,
}

/// `POST /doctor/requests/:id/observations`
pub async fn observations(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<CurrentUser>,
    Path(request_id): Path<Uuid>,
    Form(form): Form<ObservationForm>,
) -> Result<Response, ApiError> {
    let mut conn = ctx.core.open_db()?;
    let doctor = match load_doctor(&conn, &user)? {
        Ok(doctor) => doctor,
        Err(bounce) => return Ok(bounce),
    };
    if form.notes.trim().is_empty() {
        return Err(ApiError::BadRequest("Notes must not be empty".into()));
    }

    match record_observation(&mut conn, &doctor, &request_id, &form.notes) {
        Ok(_) => {
            let patient_id = crate::db::repository::get_service_request(&conn, &request_id)?
                .map(|r| r.patient_id);
            match patient_id {
                Some(id) => Ok(redirect_to(&format!("/doctor/health-records/{id}"))),
                None => Ok(dashboard_redirect()),
            }
        }
        Err(LifecycleError::NotFound | LifecycleError::NotPermitted) => Ok(dashboard_redirect()),
        Err(LifecycleError::Stale) => Err(ApiError::StaleState),
        Err(LifecycleError::SpecializationMismatch) => Ok(dashboard_redirect()),
        Err(LifecycleError::Database(e)) => Err(e.into()),
    }
}

#[derive(Deserialize)]
pub struct PrescriptionForm {
    pub medication_name: String,
    pub dosage: String,
    pub duration: String,
    pub additional_notes: Option<String>,
}

/// `POST /doctor/requests/:id/prescriptions`
pub async fn prescriptions(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<CurrentUser>,
    Path(request_id): Path<Uuid>,
    Form(form): Form<PrescriptionForm>,
) -> Result<Response, ApiError> {
    let mut conn = ctx.core.open_db()?;
    let doctor = match load_doctor(&conn, &user)? {
        Ok(doctor) => doctor,
        Err(bounce) => return Ok(bounce),
    };
    if form.medication_name.trim().is_empty() {
        return Err(ApiError::BadRequest("Medication name is required".into()));
    }

    let input = PrescriptionInput {
        medication_name: form.medication_name,
        dosage: form.dosage,
        duration: form.duration,
        additional_notes: form.additional_notes.unwrap_or_default(),
    };
    match issue_prescription(&mut conn, &doctor, &request_id, input) {
        Ok(prescription) => {
            let patient_id =
                crate::db::repository::get_service_request(&conn, &prescription.request_id)?
                    .map(|r| r.patient_id);
            match patient_id {
                Some(id) => Ok(redirect_to(&format!("/doctor/health-records/{id}"))),
                None => Ok(dashboard_redirect()),
            }
        }
        Err(LifecycleError::NotFound | LifecycleError::NotPermitted) => Ok(dashboard_redirect()),
        Err(LifecycleError::Stale) => Err(ApiError::StaleState),
        Err(LifecycleError::SpecializationMismatch) => Ok(dashboard_redirect()),
        Err(LifecycleError::Database(e)) => Err(e.into()),
    }
}

#[derive(Deserialize)]
pub struct CostForm {
    pub service_cost: f64,
}

/// `POST /doctor/requests/:id/cost`
pub async fn cost(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<CurrentUser>,
    Path(request_id): Path<Uuid>,
    Form(form): Form<CostForm>,
) -> Result<Response, ApiError> {
    let conn = ctx.core.open_db()?;
    let doctor = match load_doctor(&conn, &user)? {
        Ok(doctor) => doctor,
        Err(bounce) => return Ok(bounce),
    };
    if !form.service_cost.is_finite() || form.service_cost < 0.0 {
        return Err(ApiError::BadRequest("Service cost must be non-negative".into()));
    }

    match set_service_cost(&conn, &doctor, &request_id, form.service_cost) {
        Ok(bill) => {
            let patient_id = crate::db::repository::get_service_request(&conn, &bill.request_id)?
                .map(|r| r.patient_id);
            match patient_id {
                Some(id) => Ok(redirect_to(&format!("/doctor/health-records/{id}"))),
                None => Ok(dashboard_redirect()),
            }
        }
        Err(LifecycleError::NotFound | LifecycleError::NotPermitted) => Ok(dashboard_redirect()),
        Err(LifecycleError::Stale) => Err(ApiError::StaleState),
        Err(LifecycleError::SpecializationMismatch) => Ok(dashboard_redirect()),
        Err(LifecycleError::Database(e)) => Err(e.into()),
    }
}

/// `POST /doctor/requests/:id/complete`
pub async fn complete(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<CurrentUser>,
    Path(request_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let conn = ctx.core.open_db()?;
    let doctor = match load_doctor(&conn, &user)? {
        Ok(doctor) => doctor,
        Err(bounce) => return Ok(bounce),
    };

    match complete_session(&conn, &doctor, &request_id) {
        Ok(()) => Ok(redirect_to("/doctor/requests")),
        Err(LifecycleError::Stale) => Err(ApiError::StaleState),
        Err(LifecycleError::NotFound | LifecycleError::NotPermitted) => Ok(dashboard_redirect()),
        Err(LifecycleError::SpecializationMismatch) => Ok(dashboard_redirect()),
        Err(LifecycleError::Database(e)) => Err(e.into()),
    }
}
