//! Caregiver pages: monitoring, medication management, appointment
//! scheduling, and the assigned-patient roster.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::api::endpoints::{dashboard_redirect, redirect_to};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CurrentUser};
use crate::db::repository::{
    assigned_patient_ids, get_caregiver_by_account, get_patient, list_pending_by_patient,
    list_prescriptions_by_patient,
};
use crate::lifecycle::{complete_prescription, schedule_request, LifecycleError};
use crate::models::enums::Role;
use crate::models::{CaregiverProfile, PatientProfile, Prescription, ServiceRequest};
use crate::records::{health_metric_ranges, monitoring_feed, HealthMetricRanges, MonitoringEntry};

/// Resolve the acting caregiver, or the page to bounce to instead.
fn load_caregiver(
    conn: &rusqlite::Connection,
    user: &CurrentUser,
) -> Result<Result<CaregiverProfile, Response>, ApiError> {
    if user.role != Role::Caregiver {
        return Ok(Err(dashboard_redirect()));
    }
    match get_caregiver_by_account(conn, &user.account_id)? {
        Some(caregiver) => Ok(Ok(caregiver)),
        None => Ok(Err(redirect_to("/profile"))),
    }
}

#[derive(Serialize)]
pub struct MonitoringView {
    pub health_records: Vec<MonitoringEntry>,
    pub health_metrics_ranges: HealthMetricRanges,
}

/// `GET /caregiver/monitoring-tools`
pub async fn monitoring_tools(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Response, ApiError> {
    let conn = ctx.core.open_db()?;
    let caregiver = match load_caregiver(&conn, &user)? {
        Ok(caregiver) => caregiver,
        Err(bounce) => return Ok(bounce),
    };

    Ok(Json(MonitoringView {
        health_records: monitoring_feed(&conn, &caregiver.id)?,
        health_metrics_ranges: health_metric_ranges(),
    })
    .into_response())
}

#[derive(Serialize)]
pub struct PatientPrescriptions {
    pub patient: PatientProfile,
    pub prescriptions: Vec<Prescription>,
}

#[derive(Serialize)]
pub struct MedicationManagementView {
    pub prescriptions: Vec<PatientPrescriptions>,
}

/// `GET /caregiver/medication-management`
pub async fn medication_management(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Response, ApiError> {
    let conn = ctx.core.open_db()?;
    let caregiver = match load_caregiver(&conn, &user)? {
        Ok(caregiver) => caregiver,
        Err(bounce) => return Ok(bounce),
    };

    let mut entries = Vec::new();
    for patient_id in assigned_patient_ids(&conn, &caregiver.id)? {
        let Some(patient) = get_patient(&conn, &patient_id)? else {
            continue;
        };
        let prescriptions = list_prescriptions_by_patient(&conn, &patient_id)?;
        entries.push(PatientPrescriptions {
            patient,
            prescriptions,
        });
    }
    Ok(Json(MedicationManagementView {
        prescriptions: entries,
    })
    .into_response())
}

/// `POST /caregiver/prescriptions/:id/complete`
pub async fn mark_prescription_completed(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<CurrentUser>,
    Path(prescription_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let conn = ctx.core.open_db()?;
    let caregiver = match load_caregiver(&conn, &user)? {
        Ok(caregiver) => caregiver,
        Err(bounce) => return Ok(bounce),
    };

    match complete_prescription(&conn, &caregiver.id, &prescription_id) {
        Ok(()) => Ok(redirect_to("/caregiver/medication-management")),
        Err(LifecycleError::Stale) => Err(ApiError::StaleState),
        Err(LifecycleError::NotFound | LifecycleError::NotPermitted) => Ok(dashboard_redirect()),
        Err(LifecycleError::SpecializationMismatch) => Ok(dashboard_redirect()),
        Err(LifecycleError::Database(e)) => Err(e.into()),
    }
}

#[derive(Serialize)]
pub struct PatientRequests {
    pub patient: PatientProfile,
    pub pending_requests: Vec<ServiceRequest>,
}

#[derive(Serialize)]
pub struct SchedulingView {
    pub service_requests: Vec<PatientRequests>,
}

/// `GET /caregiver/appointment-scheduling`
pub async fn appointment_scheduling(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Response, ApiError> {
    let conn = ctx.core.open_db()?;
    let caregiver = match load_caregiver(&conn, &user)? {
        Ok(caregiver) => caregiver,
        Err(bounce) => return Ok(bounce),
    };

    let mut entries = Vec::new();
    for patient_id in assigned_patient_ids(&conn, &caregiver.id)? {
        let Some(patient) = get_patient(&conn, &patient_id)? else {
            continue;
        };
        let pending_requests = list_pending_by_patient(&conn, &patient_id)?;
        entries.push(PatientRequests {
            patient,
            pending_requests,
        });
    }
    Ok(Json(SchedulingView {
        service_requests: entries,
    })
    .into_response())
}

/// `POST /caregiver/schedule/:request_id`
pub async fn schedule(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<CurrentUser>,
    Path(request_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let conn = ctx.core.open_db()?;
    let caregiver = match load_caregiver(&conn, &user)? {
        Ok(caregiver) => caregiver,
        Err(bounce) => return Ok(bounce),
    };

    match schedule_request(&conn, &caregiver.id, &request_id) {
        Ok(()) => Ok(redirect_to("/caregiver/appointment-scheduling")),
        Err(LifecycleError::Stale) => Err(ApiError::StaleState),
        Err(LifecycleError::NotFound | LifecycleError::NotPermitted) => Ok(dashboard_redirect()),
        Err(LifecycleError::SpecializationMismatch) => Ok(dashboard_redirect()),
        Err(LifecycleError::Database(e)) => Err(e.into()),
    }
}

#[derive(Serialize)]
pub struct AssignedUsersView {
    pub patients: Vec<PatientProfile>,
}

/// `GET /caregiver/assigned-users`
pub async fn assigned_users(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Response, ApiError> {
    let conn = ctx.core.open_db()?;
    let caregiver = match load_caregiver(&conn, &user)? {
        Ok(caregiver) => caregiver,
        Err(bounce) => return Ok(bounce),
    };

    let mut patients = Vec::new();
    for patient_id in assigned_patient_ids(&conn, &caregiver.id)? {
        if let Some(patient) = get_patient(&conn, &patient_id)? {
            patients.push(patient);
        }
    }
    Ok(Json(AssignedUsersView { patients }).into_response())
}
