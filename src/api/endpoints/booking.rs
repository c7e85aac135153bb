//! Service booking: the patient picks a specialization and submits.

use std::str::FromStr;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Form, Json};
use serde::{Deserialize, Serialize};

use crate::api::endpoints::{dashboard_redirect, redirect_to};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CurrentUser};
use crate::db::repository::get_patient_by_account;
use crate::lifecycle::book_request;
use crate::models::enums::{Role, Specialization};

#[derive(Serialize)]
pub struct BookingView {
    pub specializations: Vec<&'static str>,
}

/// `GET /service-booking` — the choices offered on the booking form.
pub async fn booking_page(
    Extension(user): Extension<CurrentUser>,
) -> Result<Response, ApiError> {
    if user.role != Role::Patient {
        return Ok(dashboard_redirect());
    }
    Ok(Json(BookingView {
        specializations: Specialization::ALL.iter().map(|s| s.as_str()).collect(),
    })
    .into_response())
}

#[derive(Deserialize)]
pub struct BookingForm {
    pub specialization: String,
}

/// `POST /service-booking` — create a pending request.
pub async fn book(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<CurrentUser>,
    Form(form): Form<BookingForm>,
) -> Result<Response, ApiError> {
    if user.role != Role::Patient {
        return Ok(dashboard_redirect());
    }
    let specialization = Specialization::from_str(&form.specialization).map_err(|_| {
        ApiError::BadRequest(format!("Unknown specialization: {}", form.specialization))
    })?;

    let conn = ctx.core.open_db()?;
    let Some(patient) = get_patient_by_account(&conn, &user.account_id)? else {
        return Ok(redirect_to("/profile"));
    };
    book_request(&conn, &patient.id, specialization)?;
    Ok(dashboard_redirect())
}
