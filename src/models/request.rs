use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{PaymentStatus, RequestStatus, Specialization};

/// A patient-initiated unit of work routed to a doctor by specialization.
/// Owns observations, prescriptions, and bills (cascade on delete).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub id: Uuid,
    pub patient_id: Uuid,
    /// Set when a doctor accepts; never set by caregiver scheduling.
    pub doctor_id: Option<Uuid>,
    /// Immutable after creation.
    pub specialization: Specialization,
    pub status: RequestStatus,
    pub created_at: NaiveDateTime,
}

/// A clinical note appended to an accepted request, ordered by creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub id: Uuid,
    pub request_id: Uuid,
    pub notes: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub id: Uuid,
    pub request_id: Uuid,
    pub medication_name: String,
    pub dosage: String,
    pub duration: String,
    pub additional_notes: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bill {
    pub id: Uuid,
    pub request_id: Uuid,
    pub service_cost: f64,
    /// pending → paid, exactly once, never reverses.
    pub payment_status: PaymentStatus,
    pub created_at: NaiveDateTime,
}
