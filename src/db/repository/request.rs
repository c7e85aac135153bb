use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::repository::parse_timestamp;
use crate::db::DatabaseError;
use crate::models::enums::{PaymentStatus, RequestStatus, Specialization};
use crate::models::{Bill, Observation, Prescription, ServiceRequest};

// ── Service requests ────────────────────────────────────

pub fn insert_service_request(
    conn: &Connection,
    request: &ServiceRequest,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO service_requests (id, patient_id, doctor_id, specialization, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            request.id.to_string(),
            request.patient_id.to_string(),
            request.doctor_id.map(|id| id.to_string()),
            request.specialization.as_str(),
            request.status.as_str(),
            request.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

fn request_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String, Option<String>, String, String, String)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn build_request(
    (id, patient_id, doctor_id, specialization, status, created_at): (
        String,
        String,
        Option<String>,
        String,
        String,
        String,
    ),
) -> Result<ServiceRequest, DatabaseError> {
    Ok(ServiceRequest {
        id: Uuid::parse_str(&id).unwrap_or_default(),
        patient_id: Uuid::parse_str(&patient_id).unwrap_or_default(),
        doctor_id: doctor_id.and_then(|d| Uuid::parse_str(&d).ok()),
        specialization: Specialization::from_str(&specialization)?,
        status: RequestStatus::from_str(&status)?,
        created_at: parse_timestamp(&created_at),
    })
}

const REQUEST_COLS: &str = "id, patient_id, doctor_id, specialization, status, created_at";

pub fn get_service_request(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<ServiceRequest>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {REQUEST_COLS} FROM service_requests WHERE id = ?1"),
            params![id.to_string()],
            request_from_row,
        )
        .optional()?;
    row.map(build_request).transpose()
}

pub fn list_requests_by_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<ServiceRequest>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REQUEST_COLS} FROM service_requests WHERE patient_id = ?1
         ORDER BY created_at DESC"
    ))?;
    let rows = stmt.query_map(params![patient_id.to_string()], request_from_row)?;

    let mut requests = Vec::new();
    for row in rows {
        requests.push(build_request(row?)?);
    }
    Ok(requests)
}

/// The doctor work queue: pending requests for one specialization,
/// oldest first.
pub fn list_pending_by_specialization(
    conn: &Connection,
    specialization: Specialization,
) -> Result<Vec<ServiceRequest>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REQUEST_COLS} FROM service_requests
         WHERE status = 'pending' AND specialization = ?1
         ORDER BY created_at"
    ))?;
    let rows = stmt.query_map(params![specialization.as_str()], request_from_row)?;

    let mut requests = Vec::new();
    for row in rows {
        requests.push(build_request(row?)?);
    }
    Ok(requests)
}

pub fn list_pending_by_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<ServiceRequest>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REQUEST_COLS} FROM service_requests
         WHERE status = 'pending' AND patient_id = ?1
         ORDER BY created_at"
    ))?;
    let rows = stmt.query_map(params![patient_id.to_string()], request_from_row)?;

    let mut requests = Vec::new();
    for row in rows {
        requests.push(build_request(row?)?);
    }
    Ok(requests)
}

/// Distinct specializations the patient has ever requested,
/// for the health-record bootstrap narrative.
pub fn distinct_specializations_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Specialization>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT specialization FROM service_requests WHERE patient_id = ?1",
    )?;
    let rows = stmt.query_map(params![patient_id.to_string()], |row| {
        row.get::<_, String>(0)
    })?;

    let mut specializations = Vec::new();
    for row in rows {
        specializations.push(Specialization::from_str(&row?)?);
    }
    Ok(specializations)
}

/// Whether the doctor currently has an accepted request for the patient —
/// the gate for clinical record access.
pub fn has_accepted_request(
    conn: &Connection,
    doctor_id: &Uuid,
    patient_id: &Uuid,
) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM service_requests
         WHERE doctor_id = ?1 AND patient_id = ?2 AND status = 'accepted'",
        params![doctor_id.to_string(), patient_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Compare-and-set transition: succeeds only if the row is still in
/// `expected`. Returns false on a lost race (or terminal state).
pub fn cas_update_request_status(
    conn: &Connection,
    id: &Uuid,
    expected: RequestStatus,
    new: RequestStatus,
) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE service_requests SET status = ?3 WHERE id = ?1 AND status = ?2",
        params![id.to_string(), expected.as_str(), new.as_str()],
    )?;
    Ok(updated == 1)
}

/// Accept is the one transition that also binds the doctor, in the same
/// guarded write.
pub fn cas_accept_request(
    conn: &Connection,
    id: &Uuid,
    doctor_id: &Uuid,
) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE service_requests SET status = 'accepted', doctor_id = ?2
         WHERE id = ?1 AND status = 'pending'",
        params![id.to_string(), doctor_id.to_string()],
    )?;
    Ok(updated == 1)
}

// ── Observations ────────────────────────────────────────

pub fn insert_observation(conn: &Connection, obs: &Observation) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO observations (id, request_id, notes, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            obs.id.to_string(),
            obs.request_id.to_string(),
            obs.notes,
            obs.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

pub fn list_observations_by_request(
    conn: &Connection,
    request_id: &Uuid,
) -> Result<Vec<Observation>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, request_id, notes, created_at FROM observations
         WHERE request_id = ?1 ORDER BY created_at",
    )?;
    let rows = stmt.query_map(params![request_id.to_string()], |row| {
        Ok(Observation {
            id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap_or_default(),
            request_id: Uuid::parse_str(&row.get::<_, String>(1)?).unwrap_or_default(),
            notes: row.get(2)?,
            created_at: parse_timestamp(&row.get::<_, String>(3)?),
        })
    })?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

// ── Prescriptions ───────────────────────────────────────

pub fn insert_prescription(conn: &Connection, rx: &Prescription) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO prescriptions (id, request_id, medication_name, dosage, duration,
         additional_notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            rx.id.to_string(),
            rx.request_id.to_string(),
            rx.medication_name,
            rx.dosage,
            rx.duration,
            rx.additional_notes,
            rx.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

fn prescription_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Prescription> {
    Ok(Prescription {
        id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap_or_default(),
        request_id: Uuid::parse_str(&row.get::<_, String>(1)?).unwrap_or_default(),
        medication_name: row.get(2)?,
        dosage: row.get(3)?,
        duration: row.get(4)?,
        additional_notes: row.get(5)?,
        created_at: parse_timestamp(&row.get::<_, String>(6)?),
    })
}

const PRESCRIPTION_COLS: &str =
    "id, request_id, medication_name, dosage, duration, additional_notes, created_at";

pub fn get_prescription(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<Prescription>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {PRESCRIPTION_COLS} FROM prescriptions WHERE id = ?1"),
            params![id.to_string()],
            prescription_from_row,
        )
        .optional()?;
    Ok(row)
}

pub fn list_prescriptions_by_request(
    conn: &Connection,
    request_id: &Uuid,
) -> Result<Vec<Prescription>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PRESCRIPTION_COLS} FROM prescriptions
         WHERE request_id = ?1 ORDER BY created_at"
    ))?;
    let rows = stmt.query_map(params![request_id.to_string()], prescription_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// All prescriptions across a patient's requests, newest first.
pub fn list_prescriptions_by_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Prescription>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.request_id, p.medication_name, p.dosage, p.duration,
         p.additional_notes, p.created_at
         FROM prescriptions p
         JOIN service_requests r ON r.id = p.request_id
         WHERE r.patient_id = ?1
         ORDER BY p.created_at DESC",
    )?;
    let rows = stmt.query_map(params![patient_id.to_string()], prescription_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

// ── Bills ───────────────────────────────────────────────

pub fn insert_bill(conn: &Connection, bill: &Bill) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO bills (id, request_id, service_cost, payment_status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            bill.id.to_string(),
            bill.request_id.to_string(),
            bill.service_cost,
            bill.payment_status.as_str(),
            bill.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

fn bill_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String, f64, String, String)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn build_bill(
    (id, request_id, service_cost, payment_status, created_at): (String, String, f64, String, String),
) -> Result<Bill, DatabaseError> {
    Ok(Bill {
        id: Uuid::parse_str(&id).unwrap_or_default(),
        request_id: Uuid::parse_str(&request_id).unwrap_or_default(),
        service_cost,
        payment_status: PaymentStatus::from_str(&payment_status)?,
        created_at: parse_timestamp(&created_at),
    })
}

pub fn get_bill(conn: &Connection, id: &Uuid) -> Result<Option<Bill>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, request_id, service_cost, payment_status, created_at
             FROM bills WHERE id = ?1",
            params![id.to_string()],
            bill_from_row,
        )
        .optional()?;
    row.map(build_bill).transpose()
}

pub fn list_bills_by_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Bill>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT b.id, b.request_id, b.service_cost, b.payment_status, b.created_at
         FROM bills b
         JOIN service_requests r ON r.id = b.request_id
         WHERE r.patient_id = ?1
         ORDER BY b.created_at DESC",
    )?;
    let rows = stmt.query_map(params![patient_id.to_string()], bill_from_row)?;

    let mut bills = Vec::new();
    for row in rows {
        bills.push(build_bill(row?)?);
    }
    Ok(bills)
}

/// pending → paid, exactly once. Returns false if the bill was already paid.
pub fn cas_mark_bill_paid(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE bills SET payment_status = 'paid'
         WHERE id = ?1 AND payment_status = 'pending'",
        params![id.to_string()],
    )?;
    Ok(updated == 1)
}

/// (status, count) pairs for the admin reports view.
pub fn count_requests_by_status(conn: &Connection) -> Result<Vec<(String, i64)>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT status, COUNT(*) FROM service_requests GROUP BY status ORDER BY status",
    )?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn count_bills_by_status(conn: &Connection) -> Result<Vec<(String, i64)>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT payment_status, COUNT(*) FROM bills GROUP BY payment_status ORDER BY payment_status",
    )?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}
