//! Service-request lifecycle — booking, the doctor work queue, and the
//! pending → accepted/rejected/scheduled → completed state machine.
//!
//! Every transition is a compare-and-set against the expected prior
//! status; a lost race surfaces as `LifecycleError::Stale` instead of
//! silently overwriting another actor's write. Multi-row writes (a
//! clinical row plus its notification fan-out) share one transaction.

use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::db::repository::{
    cas_accept_request, cas_update_request_status, get_prescription, get_service_request,
    insert_bill, insert_observation, insert_prescription, insert_service_request, is_assigned,
    list_pending_by_specialization, list_prescriptions_by_patient,
};
use crate::db::DatabaseError;
use crate::emergency::attach_clinical_feedback;
use crate::models::enums::{PaymentStatus, RequestStatus, Specialization};
use crate::models::{Bill, DoctorProfile, Observation, Prescription, ServiceRequest};

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("entity not found")]
    NotFound,
    #[error("action not permitted for this actor")]
    NotPermitted,
    #[error("doctor specialization does not match the request")]
    SpecializationMismatch,
    #[error("request state changed underneath the caller")]
    Stale,
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

// ── Booking ─────────────────────────────────────────────

/// Patient submits a booking; the request starts pending with an
/// immutable specialization.
pub fn book_request(
    conn: &Connection,
    patient_id: &Uuid,
    specialization: Specialization,
) -> Result<ServiceRequest, DatabaseError> {
    let request = ServiceRequest {
        id: Uuid::new_v4(),
        patient_id: *patient_id,
        doctor_id: None,
        specialization,
        status: RequestStatus::Pending,
        created_at: chrono::Utc::now().naive_utc(),
    };
    insert_service_request(conn, &request)?;
    tracing::info!(request_id = %request.id, specialization = specialization.as_str(), "Service request booked");
    Ok(request)
}

// ── Doctor transitions ──────────────────────────────────

/// The work queue a verified doctor sees: pending requests for their own
/// specialization only.
pub fn doctor_work_queue(
    conn: &Connection,
    doctor: &DoctorProfile,
) -> Result<Vec<ServiceRequest>, LifecycleError> {
    if !doctor.verified {
        return Err(LifecycleError::NotPermitted);
    }
    let specialization = doctor.specialization.ok_or(LifecycleError::NotPermitted)?;
    Ok(list_pending_by_specialization(conn, specialization)?)
}

/// pending → accepted, binding the acting doctor.
///
/// Guards: the doctor is verified and their specialization exactly
/// matches the request's. A mismatch mutates nothing — the caller
/// re-presents the (specialization-filtered) pending queue.
pub fn accept_request(
    conn: &Connection,
    doctor: &DoctorProfile,
    request_id: &Uuid,
) -> Result<ServiceRequest, LifecycleError> {
    if !doctor.verified {
        return Err(LifecycleError::NotPermitted);
    }
    let request = get_service_request(conn, request_id)?.ok_or(LifecycleError::NotFound)?;
    if doctor.specialization != Some(request.specialization) {
        return Err(LifecycleError::SpecializationMismatch);
    }
    if !cas_accept_request(conn, request_id, &doctor.id)? {
        return Err(LifecycleError::Stale);
    }
    get_service_request(conn, request_id)?.ok_or(LifecycleError::NotFound)
}

/// pending → rejected (terminal). The reason is accepted but not persisted.
pub fn reject_request(
    conn: &Connection,
    doctor: &DoctorProfile,
    request_id: &Uuid,
    _reason: Option<&str>,
) -> Result<(), LifecycleError> {
    if !doctor.verified {
        return Err(LifecycleError::NotPermitted);
    }
    if get_service_request(conn, request_id)?.is_none() {
        return Err(LifecycleError::NotFound);
    }
    if !cas_update_request_status(conn, request_id, RequestStatus::Pending, RequestStatus::Rejected)?
    {
        return Err(LifecycleError::Stale);
    }
    Ok(())
}

/// accepted → completed (terminal), by the assigned doctor.
pub fn complete_session(
    conn: &Connection,
    doctor: &DoctorProfile,
    request_id: &Uuid,
) -> Result<(), LifecycleError> {
    load_accepted_for_doctor(conn, doctor, request_id)?;
    if !cas_update_request_status(
        conn,
        request_id,
        RequestStatus::Accepted,
        RequestStatus::Completed,
    )? {
        return Err(LifecycleError::Stale);
    }
    Ok(())
}

/// Append a clinical note, fanning it out to the patient's notifications
/// in the same transaction. Status is unchanged.
pub fn record_observation(
    conn: &mut Connection,
    doctor: &DoctorProfile,
    request_id: &Uuid,
    notes: &str,
) -> Result<Observation, LifecycleError> {
    let request = load_accepted_for_doctor(conn, doctor, request_id)?;

    let tx = conn.transaction().map_err(DatabaseError::from)?;
    let observation = Observation {
        id: Uuid::new_v4(),
        request_id: *request_id,
        notes: notes.to_string(),
        created_at: chrono::Utc::now().naive_utc(),
    };
    insert_observation(&tx, &observation)?;
    attach_clinical_feedback(&tx, &request.patient_id, notes)?;
    tx.commit().map_err(DatabaseError::from)?;
    Ok(observation)
}

/// Prescription form fields as submitted by the doctor.
#[derive(Debug, Clone)]
pub struct PrescriptionInput {
    pub medication_name: String,
    pub dosage: String,
    pub duration: String,
    pub additional_notes: String,
}

/// Append a prescription; the patient is notified through the same
/// feedback channel as observations.
pub fn issue_prescription(
    conn: &mut Connection,
    doctor: &DoctorProfile,
    request_id: &Uuid,
    input: PrescriptionInput,
) -> Result<Prescription, LifecycleError> {
    let request = load_accepted_for_doctor(conn, doctor, request_id)?;

    let tx = conn.transaction().map_err(DatabaseError::from)?;
    let prescription = Prescription {
        id: Uuid::new_v4(),
        request_id: *request_id,
        medication_name: input.medication_name,
        dosage: input.dosage,
        duration: input.duration,
        additional_notes: input.additional_notes,
        created_at: chrono::Utc::now().naive_utc(),
    };
    insert_prescription(&tx, &prescription)?;
    let message = format!(
        "New prescription: {} ({}, {})",
        prescription.medication_name, prescription.dosage, prescription.duration
    );
    attach_clinical_feedback(&tx, &request.patient_id, &message)?;
    tx.commit().map_err(DatabaseError::from)?;
    Ok(prescription)
}

/// Create the bill for an accepted request; payment starts pending.
pub fn set_service_cost(
    conn: &Connection,
    doctor: &DoctorProfile,
    request_id: &Uuid,
    service_cost: f64,
) -> Result<Bill, LifecycleError> {
    load_accepted_for_doctor(conn, doctor, request_id)?;
    let bill = Bill {
        id: Uuid::new_v4(),
        request_id: *request_id,
        service_cost,
        payment_status: PaymentStatus::Pending,
        created_at: chrono::Utc::now().naive_utc(),
    };
    insert_bill(conn, &bill)?;
    Ok(bill)
}

fn load_accepted_for_doctor(
    conn: &Connection,
    doctor: &DoctorProfile,
    request_id: &Uuid,
) -> Result<ServiceRequest, LifecycleError> {
    let request = get_service_request(conn, request_id)?.ok_or(LifecycleError::NotFound)?;
    if request.status != RequestStatus::Accepted || request.doctor_id != Some(doctor.id) {
        return Err(LifecycleError::NotPermitted);
    }
    Ok(request)
}

// ── Caregiver transitions ───────────────────────────────

/// pending → scheduled by a caregiver the patient is assigned to.
/// No doctor assignment happens here.
pub fn schedule_request(
    conn: &Connection,
    caregiver_id: &Uuid,
    request_id: &Uuid,
) -> Result<(), LifecycleError> {
    let request = get_service_request(conn, request_id)?.ok_or(LifecycleError::NotFound)?;
    if !is_assigned(conn, caregiver_id, &request.patient_id)? {
        return Err(LifecycleError::NotPermitted);
    }
    if !cas_update_request_status(
        conn,
        request_id,
        RequestStatus::Pending,
        RequestStatus::Scheduled,
    )? {
        return Err(LifecycleError::Stale);
    }
    Ok(())
}

/// Caregiver closes out a treatment via one of its prescriptions:
/// the owning request moves accepted → completed.
pub fn complete_prescription(
    conn: &Connection,
    caregiver_id: &Uuid,
    prescription_id: &Uuid,
) -> Result<(), LifecycleError> {
    let prescription =
        get_prescription(conn, prescription_id)?.ok_or(LifecycleError::NotFound)?;
    let request =
        get_service_request(conn, &prescription.request_id)?.ok_or(LifecycleError::NotFound)?;
    if !is_assigned(conn, caregiver_id, &request.patient_id)? {
        return Err(LifecycleError::NotPermitted);
    }
    if !cas_update_request_status(
        conn,
        &request.id,
        RequestStatus::Accepted,
        RequestStatus::Completed,
    )? {
        return Err(LifecycleError::Stale);
    }
    Ok(())
}

// ── Patient transitions ─────────────────────────────────

/// Patient confirms payment on their own bill: pending → paid, once.
pub fn pay_bill(
    conn: &Connection,
    patient_id: &Uuid,
    bill_id: &Uuid,
) -> Result<(), LifecycleError> {
    let bill = crate::db::repository::get_bill(conn, bill_id)?.ok_or(LifecycleError::NotFound)?;
    let request =
        get_service_request(conn, &bill.request_id)?.ok_or(LifecycleError::NotFound)?;
    if request.patient_id != *patient_id {
        return Err(LifecycleError::NotPermitted);
    }
    if !crate::db::repository::cas_mark_bill_paid(conn, bill_id)? {
        return Err(LifecycleError::Stale);
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════
// Reminder view
// ═══════════════════════════════════════════════════════════

/// A medication reminder derived from a prescription.
#[derive(Debug, Clone, Serialize)]
pub struct MedicationReminder {
    pub prescription_id: Uuid,
    pub medication_name: String,
    pub dosage: String,
    pub duration: String,
}

/// Reminders for the patient: every prescription across their requests.
pub fn medication_reminders(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<MedicationReminder>, DatabaseError> {
    let prescriptions = list_prescriptions_by_patient(conn, patient_id)?;
    Ok(prescriptions
        .into_iter()
        .map(|rx| MedicationReminder {
            prescription_id: rx.id,
            medication_name: rx.medication_name,
            dosage: rx.dosage,
            duration: rx.duration,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{
        assign_patient, get_bill, insert_account, insert_caregiver, insert_doctor, insert_patient,
        list_feedback_for_patient, list_observations_by_request,
    };
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::Role;
    use crate::models::{Account, CaregiverProfile, PatientProfile};

    fn seed_account(conn: &Connection, role: Role) -> Uuid {
        let account = Account {
            id: Uuid::new_v4(),
            email: format!("{}@example.com", Uuid::new_v4()),
            password_hash: "hash".to_string(),
            role,
            created_at: chrono::Utc::now().naive_utc(),
        };
        insert_account(conn, &account).unwrap();
        account.id
    }

    fn seed_patient(conn: &Connection) -> Uuid {
        let patient = PatientProfile {
            id: Uuid::new_v4(),
            account_id: seed_account(conn, Role::Patient),
            first_name: Some("Edna".to_string()),
            last_name: None,
            gender: None,
            address: None,
            emergency_contact: None,
        };
        insert_patient(conn, &patient).unwrap();
        patient.id
    }

    fn seed_doctor(conn: &Connection, spec: Specialization, verified: bool) -> DoctorProfile {
        let doctor = DoctorProfile {
            id: Uuid::new_v4(),
            account_id: seed_account(conn, Role::Doctor),
            first_name: Some("Greg".to_string()),
            last_name: None,
            specialization: Some(spec),
            license_number: Some("LIC-1".to_string()),
            verified,
        };
        insert_doctor(conn, &doctor).unwrap();
        doctor
    }

    fn seed_caregiver(conn: &Connection) -> Uuid {
        let caregiver = CaregiverProfile {
            id: Uuid::new_v4(),
            account_id: seed_account(conn, Role::Caregiver),
            first_name: Some("Cora".to_string()),
            last_name: None,
            relationship: None,
            contact_number: None,
        };
        insert_caregiver(conn, &caregiver).unwrap();
        caregiver.id
    }

    #[test]
    fn booked_request_starts_pending() {
        let conn = open_memory_database().unwrap();
        let patient_id = seed_patient(&conn);
        let request = book_request(&conn, &patient_id, Specialization::Cardiologist).unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
        assert!(request.doctor_id.is_none());
    }

    #[test]
    fn accept_requires_matching_specialization() {
        let conn = open_memory_database().unwrap();
        let patient_id = seed_patient(&conn);
        let request = book_request(&conn, &patient_id, Specialization::Cardiologist).unwrap();

        let neurologist = seed_doctor(&conn, Specialization::Neurologist, true);
        let result = accept_request(&conn, &neurologist, &request.id);
        assert!(matches!(
            result,
            Err(LifecycleError::SpecializationMismatch)
        ));
        // Nothing mutated.
        let loaded = get_service_request(&conn, &request.id).unwrap().unwrap();
        assert_eq!(loaded.status, RequestStatus::Pending);

        let cardiologist = seed_doctor(&conn, Specialization::Cardiologist, true);
        let accepted = accept_request(&conn, &cardiologist, &request.id).unwrap();
        assert_eq!(accepted.status, RequestStatus::Accepted);
        assert_eq!(accepted.doctor_id, Some(cardiologist.id));
    }

    #[test]
    fn accept_requires_verification() {
        let conn = open_memory_database().unwrap();
        let patient_id = seed_patient(&conn);
        let request = book_request(&conn, &patient_id, Specialization::Cardiologist).unwrap();

        let unverified = seed_doctor(&conn, Specialization::Cardiologist, false);
        assert!(matches!(
            accept_request(&conn, &unverified, &request.id),
            Err(LifecycleError::NotPermitted)
        ));
    }

    #[test]
    fn second_accept_is_stale() {
        let conn = open_memory_database().unwrap();
        let patient_id = seed_patient(&conn);
        let request = book_request(&conn, &patient_id, Specialization::Cardiologist).unwrap();

        let first = seed_doctor(&conn, Specialization::Cardiologist, true);
        let second = seed_doctor(&conn, Specialization::Cardiologist, true);
        accept_request(&conn, &first, &request.id).unwrap();

        assert!(matches!(
            accept_request(&conn, &second, &request.id),
            Err(LifecycleError::Stale)
        ));
        // The winner's binding survives.
        let loaded = get_service_request(&conn, &request.id).unwrap().unwrap();
        assert_eq!(loaded.doctor_id, Some(first.id));
    }

    #[test]
    fn full_treatment_flow_ends_terminal() {
        let mut conn = open_memory_database().unwrap();
        let patient_id = seed_patient(&conn);
        let request = book_request(&conn, &patient_id, Specialization::Cardiologist).unwrap();
        let doctor = seed_doctor(&conn, Specialization::Cardiologist, true);
        accept_request(&conn, &doctor, &request.id).unwrap();

        record_observation(&mut conn, &doctor, &request.id, "BP elevated").unwrap();
        issue_prescription(
            &mut conn,
            &doctor,
            &request.id,
            PrescriptionInput {
                medication_name: "Atenolol".to_string(),
                dosage: "50mg".to_string(),
                duration: "30 days".to_string(),
                additional_notes: "With food".to_string(),
            },
        )
        .unwrap();
        let bill = set_service_cost(&conn, &doctor, &request.id, 150.0).unwrap();
        assert_eq!(bill.payment_status, PaymentStatus::Pending);

        complete_session(&conn, &doctor, &request.id).unwrap();
        let loaded = get_service_request(&conn, &request.id).unwrap().unwrap();
        assert_eq!(loaded.status, RequestStatus::Completed);

        // Terminal: any further accept fails.
        assert!(matches!(
            accept_request(&conn, &doctor, &request.id),
            Err(LifecycleError::Stale)
        ));
    }

    #[test]
    fn clinical_actions_require_assigned_doctor() {
        let mut conn = open_memory_database().unwrap();
        let patient_id = seed_patient(&conn);
        let request = book_request(&conn, &patient_id, Specialization::Cardiologist).unwrap();
        let owner = seed_doctor(&conn, Specialization::Cardiologist, true);
        let intruder = seed_doctor(&conn, Specialization::Cardiologist, true);
        accept_request(&conn, &owner, &request.id).unwrap();

        assert!(matches!(
            record_observation(&mut conn, &intruder, &request.id, "notes"),
            Err(LifecycleError::NotPermitted)
        ));
        assert!(matches!(
            complete_session(&conn, &intruder, &request.id),
            Err(LifecycleError::NotPermitted)
        ));
    }

    #[test]
    fn observation_fans_out_to_feedback() {
        let mut conn = open_memory_database().unwrap();
        let patient_id = seed_patient(&conn);
        let _caregiver = seed_caregiver(&conn);
        let request = book_request(&conn, &patient_id, Specialization::Cardiologist).unwrap();
        let doctor = seed_doctor(&conn, Specialization::Cardiologist, true);
        accept_request(&conn, &doctor, &request.id).unwrap();

        record_observation(&mut conn, &doctor, &request.id, "BP elevated").unwrap();

        let feedback = list_feedback_for_patient(&conn, &patient_id).unwrap();
        assert_eq!(feedback.len(), 1);
        assert_eq!(feedback[0].message, "BP elevated");
    }

    #[test]
    fn observation_without_caregiver_still_saves() {
        let mut conn = open_memory_database().unwrap();
        let patient_id = seed_patient(&conn);
        let request = book_request(&conn, &patient_id, Specialization::Cardiologist).unwrap();
        let doctor = seed_doctor(&conn, Specialization::Cardiologist, true);
        accept_request(&conn, &doctor, &request.id).unwrap();

        record_observation(&mut conn, &doctor, &request.id, "Stable").unwrap();

        assert_eq!(
            list_observations_by_request(&conn, &request.id).unwrap().len(),
            1
        );
        assert!(list_feedback_for_patient(&conn, &patient_id)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn schedule_requires_assignment_and_assigns_no_doctor() {
        let conn = open_memory_database().unwrap();
        let patient_id = seed_patient(&conn);
        let caregiver_id = seed_caregiver(&conn);
        let request = book_request(&conn, &patient_id, Specialization::Geriatrician).unwrap();

        assert!(matches!(
            schedule_request(&conn, &caregiver_id, &request.id),
            Err(LifecycleError::NotPermitted)
        ));

        assign_patient(&conn, &caregiver_id, &patient_id).unwrap();
        schedule_request(&conn, &caregiver_id, &request.id).unwrap();

        let loaded = get_service_request(&conn, &request.id).unwrap().unwrap();
        assert_eq!(loaded.status, RequestStatus::Scheduled);
        assert!(loaded.doctor_id.is_none());
    }

    #[test]
    fn caregiver_completes_via_prescription() {
        let mut conn = open_memory_database().unwrap();
        let patient_id = seed_patient(&conn);
        let caregiver_id = seed_caregiver(&conn);
        assign_patient(&conn, &caregiver_id, &patient_id).unwrap();
        let request = book_request(&conn, &patient_id, Specialization::Cardiologist).unwrap();
        let doctor = seed_doctor(&conn, Specialization::Cardiologist, true);
        accept_request(&conn, &doctor, &request.id).unwrap();
        let rx = issue_prescription(
            &mut conn,
            &doctor,
            &request.id,
            PrescriptionInput {
                medication_name: "Atenolol".to_string(),
                dosage: "50mg".to_string(),
                duration: "30 days".to_string(),
                additional_notes: String::new(),
            },
        )
        .unwrap();

        complete_prescription(&conn, &caregiver_id, &rx.id).unwrap();
        let loaded = get_service_request(&conn, &request.id).unwrap().unwrap();
        assert_eq!(loaded.status, RequestStatus::Completed);
    }

    #[test]
    fn bill_pays_once_and_only_for_owner() {
        let conn = open_memory_database().unwrap();
        let patient_id = seed_patient(&conn);
        let other_patient = seed_patient(&conn);
        let request = book_request(&conn, &patient_id, Specialization::Cardiologist).unwrap();
        let doctor = seed_doctor(&conn, Specialization::Cardiologist, true);
        accept_request(&conn, &doctor, &request.id).unwrap();
        let bill = set_service_cost(&conn, &doctor, &request.id, 99.5).unwrap();

        assert!(matches!(
            pay_bill(&conn, &other_patient, &bill.id),
            Err(LifecycleError::NotPermitted)
        ));
        pay_bill(&conn, &patient_id, &bill.id).unwrap();
        assert!(matches!(
            pay_bill(&conn, &patient_id, &bill.id),
            Err(LifecycleError::Stale)
        ));
        let loaded = get_bill(&conn, &bill.id).unwrap().unwrap();
        assert_eq!(loaded.payment_status, PaymentStatus::Paid);
    }

    #[test]
    fn work_queue_filters_to_own_specialization() {
        let conn = open_memory_database().unwrap();
        let patient_id = seed_patient(&conn);
        book_request(&conn, &patient_id, Specialization::Cardiologist).unwrap();
        book_request(&conn, &patient_id, Specialization::Neurologist).unwrap();

        let doctor = seed_doctor(&conn, Specialization::Neurologist, true);
        let queue = doctor_work_queue(&conn, &doctor).unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].specialization, Specialization::Neurologist);

        let unverified = seed_doctor(&conn, Specialization::Neurologist, false);
        assert!(matches!(
            doctor_work_queue(&conn, &unverified),
            Err(LifecycleError::NotPermitted)
        ));
    }
}
