//! Patient billing: the bill list and the pending → paid flip.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::api::endpoints::{dashboard_redirect, redirect_to};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CurrentUser};
use crate::db::repository::{get_patient_by_account, list_bills_by_patient};
use crate::lifecycle::{pay_bill, LifecycleError};
use crate::models::enums::Role;
use crate::models::Bill;

#[derive(Serialize)]
pub struct BillingView {
    pub bills: Vec<Bill>,
}

/// `GET /billing`
pub async fn billing(
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
    let bills = list_bills_by_patient(&conn, &patient.id)?;
    Ok(Json(BillingView { bills }).into_response())
}

/// `POST /billing/:bill_id/pay`
pub async fn pay(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<CurrentUser>,
    Path(bill_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    if user.role != Role::Patient {
        return Ok(dashboard_redirect());
    }
    let conn = ctx.core.open_db()?;
    let Some(patient) = get_patient_by_account(&conn, &user.account_id)? else {
        return Ok(dashboard_redirect());
    };

    match pay_bill(&conn, &patient.id, &bill_id) {
        Ok(()) => Ok(redirect_to("/billing")),
        Err(LifecycleError::Stale) => Err(ApiError::StaleState),
        Err(LifecycleError::NotFound | LifecycleError::NotPermitted) => Ok(dashboard_redirect()),
        Err(LifecycleError::SpecializationMismatch) => Ok(dashboard_redirect()),
        Err(LifecycleError::Database(e)) => Err(e.into()),
    }
}
