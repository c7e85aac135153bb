use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::sqlite::now_timestamp;
use crate::db::DatabaseError;
use crate::models::enums::Specialization;
use crate::models::{AdminProfile, CaregiverProfile, DoctorProfile, PatientProfile};

// ── Patients ────────────────────────────────────────────

pub fn insert_patient(conn: &Connection, patient: &PatientProfile) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, account_id, first_name, last_name, gender, address, emergency_contact)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            patient.id.to_string(),
            patient.account_id.to_string(),
            patient.first_name,
            patient.last_name,
            patient.gender,
            patient.address,
            patient.emergency_contact,
        ],
    )?;
    Ok(())
}

fn patient_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PatientProfile> {
    Ok(PatientProfile {
        id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap_or_default(),
        account_id: Uuid::parse_str(&row.get::<_, String>(1)?).unwrap_or_default(),
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        gender: row.get(4)?,
        address: row.get(5)?,
        emergency_contact: row.get(6)?,
    })
}

const PATIENT_COLS: &str =
    "id, account_id, first_name, last_name, gender, address, emergency_contact";

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Option<PatientProfile>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {PATIENT_COLS} FROM patients WHERE id = ?1"),
            params![id.to_string()],
            patient_from_row,
        )
        .optional()?;
    Ok(row)
}

pub fn get_patient_by_account(
    conn: &Connection,
    account_id: &Uuid,
) -> Result<Option<PatientProfile>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {PATIENT_COLS} FROM patients WHERE account_id = ?1"),
            params![account_id.to_string()],
            patient_from_row,
        )
        .optional()?;
    Ok(row)
}

pub fn update_patient(conn: &Connection, patient: &PatientProfile) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE patients SET first_name = ?2, last_name = ?3, gender = ?4,
         address = ?5, emergency_contact = ?6 WHERE id = ?1",
        params![
            patient.id.to_string(),
            patient.first_name,
            patient.last_name,
            patient.gender,
            patient.address,
            patient.emergency_contact,
        ],
    )?;
    Ok(())
}

// ── Caregivers ──────────────────────────────────────────

pub fn insert_caregiver(
    conn: &Connection,
    caregiver: &CaregiverProfile,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO caregivers (id, account_id, first_name, last_name, relationship, contact_number)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            caregiver.id.to_string(),
            caregiver.account_id.to_string(),
            caregiver.first_name,
            caregiver.last_name,
            caregiver.relationship,
            caregiver.contact_number,
        ],
    )?;
    Ok(())
}

fn caregiver_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CaregiverProfile> {
    Ok(CaregiverProfile {
        id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap_or_default(),
        account_id: Uuid::parse_str(&row.get::<_, String>(1)?).unwrap_or_default(),
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        relationship: row.get(4)?,
        contact_number: row.get(5)?,
    })
}

const CAREGIVER_COLS: &str =
    "id, account_id, first_name, last_name, relationship, contact_number";

pub fn get_caregiver(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<CaregiverProfile>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {CAREGIVER_COLS} FROM caregivers WHERE id = ?1"),
            params![id.to_string()],
            caregiver_from_row,
        )
        .optional()?;
    Ok(row)
}

pub fn get_caregiver_by_account(
    conn: &Connection,
    account_id: &Uuid,
) -> Result<Option<CaregiverProfile>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {CAREGIVER_COLS} FROM caregivers WHERE account_id = ?1"),
            params![account_id.to_string()],
            caregiver_from_row,
        )
        .optional()?;
    Ok(row)
}

pub fn update_caregiver(
    conn: &Connection,
    caregiver: &CaregiverProfile,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE caregivers SET first_name = ?2, last_name = ?3, relationship = ?4,
         contact_number = ?5 WHERE id = ?1",
        params![
            caregiver.id.to_string(),
            caregiver.first_name,
            caregiver.last_name,
            caregiver.relationship,
            caregiver.contact_number,
        ],
    )?;
    Ok(())
}

/// The default caregiver for emergency routing: first by insertion order.
pub fn first_caregiver(conn: &Connection) -> Result<Option<CaregiverProfile>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {CAREGIVER_COLS} FROM caregivers ORDER BY rowid LIMIT 1"),
            [],
            caregiver_from_row,
        )
        .optional()?;
    Ok(row)
}

// ── Doctors ─────────────────────────────────────────────

pub fn insert_doctor(conn: &Connection, doctor: &DoctorProfile) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO doctors (id, account_id, first_name, last_name, specialization, license_number, verified)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            doctor.id.to_string(),
            doctor.account_id.to_string(),
            doctor.first_name,
            doctor.last_name,
            doctor.specialization.map(|s| s.as_str()),
            doctor.license_number,
            doctor.verified as i32,
        ],
    )?;
    Ok(())
}

fn doctor_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DoctorProfile> {
    let specialization = row
        .get::<_, Option<String>>(4)?
        .and_then(|s| Specialization::from_str(&s).ok());
    Ok(DoctorProfile {
        id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap_or_default(),
        account_id: Uuid::parse_str(&row.get::<_, String>(1)?).unwrap_or_default(),
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        specialization,
        license_number: row.get(5)?,
        verified: row.get::<_, i32>(6)? != 0,
    })
}

const DOCTOR_COLS: &str =
    "id, account_id, first_name, last_name, specialization, license_number, verified";

pub fn get_doctor(conn: &Connection, id: &Uuid) -> Result<Option<DoctorProfile>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {DOCTOR_COLS} FROM doctors WHERE id = ?1"),
            params![id.to_string()],
            doctor_from_row,
        )
        .optional()?;
    Ok(row)
}

pub fn get_doctor_by_account(
    conn: &Connection,
    account_id: &Uuid,
) -> Result<Option<DoctorProfile>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {DOCTOR_COLS} FROM doctors WHERE account_id = ?1"),
            params![account_id.to_string()],
            doctor_from_row,
        )
        .optional()?;
    Ok(row)
}

pub fn update_doctor(conn: &Connection, doctor: &DoctorProfile) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE doctors SET first_name = ?2, last_name = ?3, specialization = ?4,
         license_number = ?5 WHERE id = ?1",
        params![
            doctor.id.to_string(),
            doctor.first_name,
            doctor.last_name,
            doctor.specialization.map(|s| s.as_str()),
            doctor.license_number,
        ],
    )?;
    Ok(())
}

/// Flip the admin-controlled verification gate.
pub fn set_doctor_verified(
    conn: &Connection,
    id: &Uuid,
    verified: bool,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE doctors SET verified = ?2 WHERE id = ?1",
        params![id.to_string(), verified as i32],
    )?;
    Ok(())
}

pub fn list_unverified_doctors(conn: &Connection) -> Result<Vec<DoctorProfile>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOCTOR_COLS} FROM doctors WHERE verified = 0"
    ))?;
    let rows = stmt.query_map([], doctor_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

// ── Admins ──────────────────────────────────────────────

pub fn insert_admin(conn: &Connection, admin: &AdminProfile) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO admins (id, account_id, permissions) VALUES (?1, ?2, ?3)",
        params![
            admin.id.to_string(),
            admin.account_id.to_string(),
            admin.permissions,
        ],
    )?;
    Ok(())
}

pub fn get_admin_by_account(
    conn: &Connection,
    account_id: &Uuid,
) -> Result<Option<AdminProfile>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, account_id, permissions FROM admins WHERE account_id = ?1",
            params![account_id.to_string()],
            |row| {
                Ok(AdminProfile {
                    id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap_or_default(),
                    account_id: Uuid::parse_str(&row.get::<_, String>(1)?).unwrap_or_default(),
                    permissions: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

pub fn update_admin_permissions(
    conn: &Connection,
    id: &Uuid,
    permissions: &str,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE admins SET permissions = ?2 WHERE id = ?1",
        params![id.to_string(), permissions],
    )?;
    Ok(())
}

// ── Caregiver assignments ───────────────────────────────

/// Assign a patient to a caregiver. Re-assignment is a no-op; returns
/// whether a new row was inserted.
pub fn assign_patient(
    conn: &Connection,
    caregiver_id: &Uuid,
    patient_id: &Uuid,
) -> Result<bool, DatabaseError> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO caregiver_assignments (caregiver_id, patient_id, assigned_at)
         VALUES (?1, ?2, ?3)",
        params![
            caregiver_id.to_string(),
            patient_id.to_string(),
            now_timestamp(),
        ],
    )?;
    Ok(inserted > 0)
}

pub fn unassign_patient(
    conn: &Connection,
    caregiver_id: &Uuid,
    patient_id: &Uuid,
) -> Result<bool, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM caregiver_assignments WHERE caregiver_id = ?1 AND patient_id = ?2",
        params![caregiver_id.to_string(), patient_id.to_string()],
    )?;
    Ok(deleted > 0)
}

pub fn assigned_patient_ids(
    conn: &Connection,
    caregiver_id: &Uuid,
) -> Result<Vec<Uuid>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT patient_id FROM caregiver_assignments WHERE caregiver_id = ?1 ORDER BY assigned_at",
    )?;
    let rows = stmt.query_map(params![caregiver_id.to_string()], |row| {
        row.get::<_, String>(0)
    })?;

    let mut ids = Vec::new();
    for row in rows {
        ids.push(Uuid::parse_str(&row?).unwrap_or_default());
    }
    Ok(ids)
}

pub fn is_assigned(
    conn: &Connection,
    caregiver_id: &Uuid,
    patient_id: &Uuid,
) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM caregiver_assignments WHERE caregiver_id = ?1 AND patient_id = ?2",
        params![caregiver_id.to_string(), patient_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
