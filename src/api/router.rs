//! Portal router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! `/register` and `/login` are public; everything else sits behind the
//! bearer-token auth middleware, with `Extension(ApiContext)` as the
//! outermost layer so the middleware can reach shared state.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the portal router.
pub fn portal_router(core: Arc<CoreState>) -> Router {
    let ctx = ApiContext::new(core);
    build_router(ctx)
}

fn build_router(ctx: ApiContext) -> Router {
    let public = Router::new()
        .route("/", get(endpoints::auth::home))
        .route("/register", post(endpoints::auth::register))
        .route(
            "/login",
            get(endpoints::auth::login_page).post(endpoints::auth::login),
        )
        .with_state(ctx.clone());

    let protected = Router::new()
        .route("/logout", post(endpoints::auth::logout))
        .route("/unverified-doctor", get(endpoints::auth::unverified_doctor))
        .route("/dashboard", get(endpoints::dashboard::dashboard))
        .route(
            "/profile",
            get(endpoints::profile::profile_page).post(endpoints::profile::update_profile),
        )
        // Patient pages
        .route(
            "/service-booking",
            get(endpoints::booking::booking_page).post(endpoints::booking::book),
        )
        .route("/emergency-button", post(endpoints::emergency::emergency_button))
        .route("/health-records", get(endpoints::records::health_records))
        .route("/prescriptions", get(endpoints::prescriptions::prescriptions))
        .route(
            "/medication-reminders",
            get(endpoints::prescriptions::reminders),
        )
        .route("/billing", get(endpoints::billing::billing))
        .route("/billing/:bill_id/pay", post(endpoints::billing::pay))
        .route("/notifications", get(endpoints::notifications::notifications))
        .route(
            "/notifications/:feedback_id/read",
            post(endpoints::notifications::mark_read),
        )
        // Caregiver pages
        .route(
            "/caregiver/monitoring-tools",
            get(endpoints::caregiver::monitoring_tools),
        )
        .route(
            "/caregiver/medication-management",
            get(endpoints::caregiver::medication_management),
        )
        .route(
            "/caregiver/prescriptions/:prescription_id/complete",
            post(endpoints::caregiver::mark_prescription_completed),
        )
        .route(
            "/caregiver/appointment-scheduling",
            get(endpoints::caregiver::appointment_scheduling),
        )
        .route(
            "/caregiver/schedule/:request_id",
            post(endpoints::caregiver::schedule),
        )
        .route(
            "/caregiver/assigned-users",
            get(endpoints::caregiver::assigned_users),
        )
        .route(
            "/caregiver/emergency-alerts",
            get(endpoints::emergency::emergency_alerts),
        )
        .route(
            "/emergency/:alert_id/acknowledge",
            post(endpoints::emergency::acknowledge),
        )
        .route(
            "/emergency/:alert_id/resolve",
            post(endpoints::emergency::resolve),
        )
        // Doctor pages
        .route("/doctor/requests", get(endpoints::doctor::view_requests))
        .route(
            "/doctor/requests/:request_id/accept",
            post(endpoints::doctor::accept),
        )
        .route(
            "/doctor/requests/:request_id/reject",
            post(endpoints::doctor::reject),
        )
        .route(
            "/doctor/requests/:request_id/observations",
            post(endpoints::doctor::observations),
        )
        .route(
            "/doctor/requests/:request_id/prescriptions",
            post(endpoints::doctor::prescriptions),
        )
        .route("/doctor/requests/:request_id/cost", post(endpoints::doctor::cost))
        .route(
            "/doctor/requests/:request_id/complete",
            post(endpoints::doctor::complete),
        )
        .route(
            "/doctor/health-records/:patient_id",
            get(endpoints::doctor::patient_records).post(endpoints::doctor::update_patient_record),
        )
        // Admin pages
        .route("/admin/dashboard", get(endpoints::admin::admin_dashboard))
        .route(
            "/admin/doctors/:doctor_id/verify",
            post(endpoints::admin::verify_doctor),
        )
        .route("/admin/users", get(endpoints::admin::manage_users))
        .route("/admin/reports", get(endpoints::admin::reports))
        .route("/admin/assignments", post(endpoints::admin::assign))
        .route("/admin/assignments/remove", post(endpoints::admin::unassign))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        // Extension must be outermost so the middleware can extract ApiContext
        .layer(axum::Extension(ctx));

    Router::new().merge(public).merge(protected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::db::repository::{
        get_account_by_email, get_doctor_by_account, get_patient_by_account, set_doctor_verified,
    };
    use crate::emergency::ACKNOWLEDGMENT_MESSAGE;

    struct TestPortal {
        app: Router,
        core: Arc<CoreState>,
        _tmp: tempfile::TempDir,
    }

    fn test_portal() -> TestPortal {
        let tmp = tempfile::tempdir().unwrap();
        let core = Arc::new(CoreState::with_database_path(tmp.path().join("portal.db")));
        let app = portal_router(core.clone());
        TestPortal {
            app,
            core,
            _tmp: tmp,
        }
    }

    fn form_request(uri: &str, token: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn response_json(response: axum::http::Response<Body>) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 1 << 20)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn location(response: &axum::http::Response<Body>) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    /// Register an account and log in; returns the bearer token.
    async fn register_and_login(portal: &TestPortal, email: &str, role: &str) -> String {
        let response = portal
            .app
            .clone()
            .oneshot(form_request(
                "/register",
                None,
                &format!("email={email}&password=pass-1234&role={role}"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let response = portal
            .app
            .clone()
            .oneshot(form_request(
                "/login",
                None,
                &format!("email={email}&password=pass-1234"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        json["token"].as_str().unwrap().to_string()
    }

    /// Fill in the role profile so dashboards stop bouncing to /profile.
    async fn complete_profile(portal: &TestPortal, token: &str, fields: &str) {
        let response = portal
            .app
            .clone()
            .oneshot(form_request("/profile", Some(token), fields))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    async fn make_patient(portal: &TestPortal, email: &str) -> (String, Uuid) {
        let token = register_and_login(portal, email, "patient").await;
        complete_profile(portal, &token, "first_name=Edna&last_name=Mason").await;
        let conn = portal.core.open_db().unwrap();
        let account = get_account_by_email(&conn, email).unwrap().unwrap();
        let patient = get_patient_by_account(&conn, &account.id).unwrap().unwrap();
        (token, patient.id)
    }

    async fn make_caregiver(portal: &TestPortal, email: &str) -> (String, Uuid) {
        let token = register_and_login(portal, email, "caregiver").await;
        complete_profile(portal, &token, "first_name=Cora&relationship=daughter").await;
        let conn = portal.core.open_db().unwrap();
        let account = get_account_by_email(&conn, email).unwrap().unwrap();
        let caregiver = crate::db::repository::get_caregiver_by_account(&conn, &account.id)
            .unwrap()
            .unwrap();
        (token, caregiver.id)
    }

    /// Register a doctor, complete their profile, and flip the
    /// verification gate directly in the store.
    async fn make_verified_doctor(
        portal: &TestPortal,
        email: &str,
        specialization: &str,
    ) -> (String, Uuid) {
        let token = register_and_login(portal, email, "doctor").await;
        complete_profile(
            portal,
            &token,
            &format!("first_name=Greg&specialization={specialization}&license_number=LIC-77"),
        )
        .await;
        let conn = portal.core.open_db().unwrap();
        let account = get_account_by_email(&conn, email).unwrap().unwrap();
        let doctor = get_doctor_by_account(&conn, &account.id).unwrap().unwrap();
        set_doctor_verified(&conn, &doctor.id, true).unwrap();
        (token, doctor.id)
    }

    async fn make_admin(portal: &TestPortal, email: &str) -> String {
        let token = register_and_login(portal, email, "admin").await;
        complete_profile(
            portal,
            &token,
            "permissions=%7B%22manage_users%22%3A%20true%7D",
        )
        .await;
        token
    }

    // ── Authentication ──────────────────────────────────────

    #[tokio::test]
    async fn protected_routes_require_auth() {
        let portal = test_portal();
        for uri in ["/dashboard", "/profile", "/notifications", "/doctor/requests"] {
            let response = portal
                .app
                .clone()
                .oneshot(get_request(uri, None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn invalid_credentials_render_inline_error() {
        let portal = test_portal();
        register_and_login(&portal, "edna@example.com", "patient").await;

        let response = portal
            .app
            .clone()
            .oneshot(form_request(
                "/login",
                None,
                "email=edna@example.com&password=wrong",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["error"], "Invalid credentials");
        assert!(json.get("token").is_none());
    }

    #[tokio::test]
    async fn login_lands_on_profile_until_completed() {
        let portal = test_portal();
        let _ = register_and_login(&portal, "edna@example.com", "patient").await;

        // First login (profile row not yet created) → /profile.
        let response = portal
            .app
            .clone()
            .oneshot(form_request(
                "/login",
                None,
                "email=edna@example.com&password=pass-1234",
            ))
            .await
            .unwrap();
        let json = response_json(response).await;
        assert_eq!(json["redirect"], "/profile");

        let token = json["token"].as_str().unwrap().to_string();
        complete_profile(&portal, &token, "first_name=Edna").await;

        let response = portal
            .app
            .clone()
            .oneshot(form_request(
                "/login",
                None,
                "email=edna@example.com&password=pass-1234",
            ))
            .await
            .unwrap();
        let json = response_json(response).await;
        assert_eq!(json["redirect"], "/dashboard");
    }

    #[tokio::test]
    async fn unverified_doctor_lands_on_holding_page() {
        let portal = test_portal();
        let token = register_and_login(&portal, "doc@example.com", "doctor").await;
        complete_profile(
            &portal,
            &token,
            "first_name=Greg&specialization=cardiologist&license_number=LIC-1",
        )
        .await;

        let response = portal
            .app
            .clone()
            .oneshot(form_request(
                "/login",
                None,
                "email=doc@example.com&password=pass-1234",
            ))
            .await
            .unwrap();
        let json = response_json(response).await;
        assert_eq!(json["redirect"], "/unverified-doctor");
    }

    #[tokio::test]
    async fn logout_revokes_the_token() {
        let portal = test_portal();
        let (token, _) = make_patient(&portal, "edna@example.com").await;

        let response = portal
            .app
            .clone()
            .oneshot(form_request("/logout", Some(&token), ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");

        let response = portal
            .app
            .clone()
            .oneshot(get_request("/dashboard", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() {
        let portal = test_portal();
        register_and_login(&portal, "dup@example.com", "patient").await;

        let response = portal
            .app
            .clone()
            .oneshot(form_request(
                "/register",
                None,
                "email=dup@example.com&password=other&role=doctor",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    // ── Role gating ─────────────────────────────────────────

    #[tokio::test]
    async fn wrong_role_falls_through_to_dashboard() {
        let portal = test_portal();
        let (caregiver_token, _) = make_caregiver(&portal, "cora@example.com").await;

        for uri in ["/health-records", "/prescriptions", "/billing"] {
            let response = portal
                .app
                .clone()
                .oneshot(get_request(uri, Some(&caregiver_token)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
            assert_eq!(location(&response), "/dashboard", "{uri}");
        }
    }

    // ── Scenario A: booking through completion ──────────────

    #[tokio::test]
    async fn scenario_booking_accept_complete() {
        let portal = test_portal();
        let (patient_token, patient_id) = make_patient(&portal, "edna@example.com").await;
        let (d1_token, _) =
            make_verified_doctor(&portal, "neuro@example.com", "neurologist").await;
        let (d2_token, d2_id) =
            make_verified_doctor(&portal, "cardio@example.com", "cardiologist").await;

        // Patient books a cardiologist request.
        let response = portal
            .app
            .clone()
            .oneshot(form_request(
                "/service-booking",
                Some(&patient_token),
                "specialization=cardiologist",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let conn = portal.core.open_db().unwrap();
        let request = crate::db::repository::list_requests_by_patient(&conn, &patient_id)
            .unwrap()
            .remove(0);
        assert_eq!(request.status.as_str(), "pending");

        // Wrong-specialization doctor: nothing mutates, back to the queue.
        let response = portal
            .app
            .clone()
            .oneshot(form_request(
                &format!("/doctor/requests/{}/accept", request.id),
                Some(&d1_token),
                "",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/doctor/requests");
        let loaded = crate::db::repository::get_service_request(&conn, &request.id)
            .unwrap()
            .unwrap();
        assert_eq!(loaded.status.as_str(), "pending");
        assert!(loaded.doctor_id.is_none());

        // The neurologist's queue does not even list the request.
        let response = portal
            .app
            .clone()
            .oneshot(get_request("/doctor/requests", Some(&d1_token)))
            .await
            .unwrap();
        let json = response_json(response).await;
        assert_eq!(json["pending_requests"].as_array().unwrap().len(), 0);

        // Matching doctor accepts and is sent to the patient's records.
        let response = portal
            .app
            .clone()
            .oneshot(form_request(
                &format!("/doctor/requests/{}/accept", request.id),
                Some(&d2_token),
                "",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            location(&response),
            format!("/doctor/health-records/{patient_id}")
        );
        let loaded = crate::db::repository::get_service_request(&conn, &request.id)
            .unwrap()
            .unwrap();
        assert_eq!(loaded.status.as_str(), "accepted");
        assert_eq!(loaded.doctor_id, Some(d2_id));

        // Treat: observation, prescription, cost.
        let response = portal
            .app
            .clone()
            .oneshot(form_request(
                &format!("/doctor/requests/{}/observations", request.id),
                Some(&d2_token),
                "notes=BP+slightly+elevated",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let response = portal
            .app
            .clone()
            .oneshot(form_request(
                &format!("/doctor/requests/{}/prescriptions", request.id),
                Some(&d2_token),
                "medication_name=Atenolol&dosage=50mg&duration=30+days&additional_notes=With+food",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let response = portal
            .app
            .clone()
            .oneshot(form_request(
                &format!("/doctor/requests/{}/cost", request.id),
                Some(&d2_token),
                "service_cost=150.00",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        // Complete; the request becomes terminal.
        let response = portal
            .app
            .clone()
            .oneshot(form_request(
                &format!("/doctor/requests/{}/complete", request.id),
                Some(&d2_token),
                "",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let loaded = crate::db::repository::get_service_request(&conn, &request.id)
            .unwrap()
            .unwrap();
        assert_eq!(loaded.status.as_str(), "completed");

        // Any further accept fails with a stale-state conflict.
        let response = portal
            .app
            .clone()
            .oneshot(form_request(
                &format!("/doctor/requests/{}/accept", request.id),
                Some(&d2_token),
                "",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        // Patient sees the prescription and the bill.
        let response = portal
            .app
            .clone()
            .oneshot(get_request("/prescriptions", Some(&patient_token)))
            .await
            .unwrap();
        let json = response_json(response).await;
        assert_eq!(json["prescriptions"][0]["medication_name"], "Atenolol");

        let response = portal
            .app
            .clone()
            .oneshot(get_request("/billing", Some(&patient_token)))
            .await
            .unwrap();
        let json = response_json(response).await;
        assert_eq!(json["bills"][0]["payment_status"], "pending");
        assert_eq!(json["bills"][0]["service_cost"], 150.0);
    }

    #[tokio::test]
    async fn bill_payment_flips_once() {
        let portal = test_portal();
        let (patient_token, patient_id) = make_patient(&portal, "edna@example.com").await;
        let (doctor_token, _) =
            make_verified_doctor(&portal, "cardio@example.com", "cardiologist").await;

        portal
            .app
            .clone()
            .oneshot(form_request(
                "/service-booking",
                Some(&patient_token),
                "specialization=cardiologist",
            ))
            .await
            .unwrap();
        let conn = portal.core.open_db().unwrap();
        let request = crate::db::repository::list_requests_by_patient(&conn, &patient_id)
            .unwrap()
            .remove(0);
        portal
            .app
            .clone()
            .oneshot(form_request(
                &format!("/doctor/requests/{}/accept", request.id),
                Some(&doctor_token),
                "",
            ))
            .await
            .unwrap();
        portal
            .app
            .clone()
            .oneshot(form_request(
                &format!("/doctor/requests/{}/cost", request.id),
                Some(&doctor_token),
                "service_cost=99.50",
            ))
            .await
            .unwrap();

        let bill = crate::db::repository::list_bills_by_patient(&conn, &patient_id)
            .unwrap()
            .remove(0);

        let response = portal
            .app
            .clone()
            .oneshot(form_request(
                &format!("/billing/{}/pay", bill.id),
                Some(&patient_token),
                "",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/billing");

        // Second payment attempt is a stale-state conflict.
        let response = portal
            .app
            .clone()
            .oneshot(form_request(
                &format!("/billing/{}/pay", bill.id),
                Some(&patient_token),
                "",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    // ── Scenario B: emergency flow ──────────────────────────

    #[tokio::test]
    async fn scenario_emergency_acknowledge_resolve() {
        let portal = test_portal();
        let (caregiver_token, caregiver_id) = make_caregiver(&portal, "cora@example.com").await;
        let (patient_token, patient_id) = make_patient(&portal, "edna@example.com").await;

        // Caregiver sees the alert on their dashboard only when assigned.
        let conn = portal.core.open_db().unwrap();
        crate::db::repository::assign_patient(&conn, &caregiver_id, &patient_id).unwrap();

        let response = portal
            .app
            .clone()
            .oneshot(form_request("/emergency-button", Some(&patient_token), ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        // Exactly one alert, sent, directed at the first caregiver.
        let alerts = crate::db::repository::list_sent_alerts_for_patient(&conn, &patient_id)
            .unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].caregiver_id, caregiver_id);

        let response = portal
            .app
            .clone()
            .oneshot(get_request(
                "/caregiver/emergency-alerts",
                Some(&caregiver_token),
            ))
            .await
            .unwrap();
        let json = response_json(response).await;
        assert_eq!(json["emergency_notifications"].as_array().unwrap().len(), 1);

        // Acknowledge: status + exactly one feedback entry.
        let alert_id = alerts[0].id;
        let response = portal
            .app
            .clone()
            .oneshot(form_request(
                &format!("/emergency/{alert_id}/acknowledge"),
                Some(&caregiver_token),
                "",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let alert = crate::db::repository::get_alert(&conn, &alert_id).unwrap().unwrap();
        assert_eq!(alert.status.as_str(), "acknowledged");
        let feedback = crate::db::repository::list_feedback_by_alert(&conn, &alert_id).unwrap();
        assert_eq!(feedback.len(), 1);
        assert_eq!(feedback[0].message, ACKNOWLEDGMENT_MESSAGE);
        assert_eq!(feedback[0].status.as_str(), "sent");

        // The patient sees it under notifications.
        let response = portal
            .app
            .clone()
            .oneshot(get_request("/notifications", Some(&patient_token)))
            .await
            .unwrap();
        let json = response_json(response).await;
        assert_eq!(json["notifications"][0]["message"], ACKNOWLEDGMENT_MESSAGE);

        // Resolve: terminal, feedback untouched.
        let response = portal
            .app
            .clone()
            .oneshot(form_request(
                &format!("/emergency/{alert_id}/resolve"),
                Some(&caregiver_token),
                "",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let alert = crate::db::repository::get_alert(&conn, &alert_id).unwrap().unwrap();
        assert_eq!(alert.status.as_str(), "resolved");
        let feedback = crate::db::repository::list_feedback_by_alert(&conn, &alert_id).unwrap();
        assert_eq!(feedback.len(), 1);
        assert_eq!(feedback[0].status.as_str(), "sent");

        // Double acknowledge after resolve is a conflict.
        let response = portal
            .app
            .clone()
            .oneshot(form_request(
                &format!("/emergency/{alert_id}/acknowledge"),
                Some(&caregiver_token),
                "",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    // ── Scenario C: assignment dedup (redesigned) ───────────

    #[tokio::test]
    async fn scenario_double_assignment_is_deduplicated() {
        let portal = test_portal();
        let admin_token = make_admin(&portal, "root@example.com").await;
        let (_, caregiver_id) = make_caregiver(&portal, "cora@example.com").await;
        let (_, patient_id) = make_patient(&portal, "edna@example.com").await;

        let body = format!("caregiver_id={caregiver_id}&patient_id={patient_id}");
        for _ in 0..2 {
            let response = portal
                .app
                .clone()
                .oneshot(form_request("/admin/assignments", Some(&admin_token), &body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(location(&response), "/admin/dashboard");
        }

        let conn = portal.core.open_db().unwrap();
        let ids = crate::db::repository::assigned_patient_ids(&conn, &caregiver_id).unwrap();
        assert_eq!(ids, vec![patient_id]);
    }

    // ── Record bootstrap over HTTP ──────────────────────────

    #[tokio::test]
    async fn health_record_bootstraps_once_with_history() {
        let portal = test_portal();
        let (patient_token, _) = make_patient(&portal, "edna@example.com").await;

        portal
            .app
            .clone()
            .oneshot(form_request(
                "/service-booking",
                Some(&patient_token),
                "specialization=geriatrician",
            ))
            .await
            .unwrap();

        let response = portal
            .app
            .clone()
            .oneshot(get_request("/health-records", Some(&patient_token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        let history = json["record"]["medical_history"].as_str().unwrap();
        assert!(history.contains("- Geriatrician: No specific issues noted."));
        assert_eq!(json["record"]["current_medications"], "None");
        let first_id = json["record"]["id"].as_str().unwrap().to_string();

        // Second view reuses the stored record.
        let response = portal
            .app
            .clone()
            .oneshot(get_request("/health-records", Some(&patient_token)))
            .await
            .unwrap();
        let json = response_json(response).await;
        assert_eq!(json["record"]["id"].as_str().unwrap(), first_id);
    }

    // ── Admin verification queue ────────────────────────────

    #[tokio::test]
    async fn admin_verifies_doctor_over_http() {
        let portal = test_portal();
        let admin_token = make_admin(&portal, "root@example.com").await;
        let doctor_token = register_and_login(&portal, "doc@example.com", "doctor").await;
        complete_profile(
            &portal,
            &doctor_token,
            "first_name=Greg&specialization=neurologist&license_number=LIC-9",
        )
        .await;

        let response = portal
            .app
            .clone()
            .oneshot(get_request("/admin/dashboard", Some(&admin_token)))
            .await
            .unwrap();
        let json = response_json(response).await;
        let doctors = json["unverified_doctors"].as_array().unwrap();
        assert_eq!(doctors.len(), 1);
        let doctor_id = doctors[0]["id"].as_str().unwrap().to_string();

        let response = portal
            .app
            .clone()
            .oneshot(form_request(
                &format!("/admin/doctors/{doctor_id}/verify"),
                Some(&admin_token),
                "action=verify",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let response = portal
            .app
            .clone()
            .oneshot(get_request("/admin/dashboard", Some(&admin_token)))
            .await
            .unwrap();
        let json = response_json(response).await;
        assert!(json["unverified_doctors"].as_array().unwrap().is_empty());

        // The doctor's work queue is reachable now.
        let response = portal
            .app
            .clone()
            .oneshot(get_request("/doctor/requests", Some(&doctor_token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn reports_count_entities() {
        let portal = test_portal();
        let admin_token = make_admin(&portal, "root@example.com").await;
        make_patient(&portal, "edna@example.com").await;
        make_caregiver(&portal, "cora@example.com").await;

        let response = portal
            .app
            .clone()
            .oneshot(get_request("/admin/reports", Some(&admin_token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        let roles = json["accounts_by_role"].as_array().unwrap();
        assert!(roles
            .iter()
            .any(|row| row[0] == "patient" && row[1] == 1));
        assert!(roles.iter().any(|row| row[0] == "admin" && row[1] == 1));
    }
}
