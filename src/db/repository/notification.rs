use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::repository::parse_timestamp;
use crate::db::DatabaseError;
use crate::models::enums::{AlertStatus, FeedbackStatus};
use crate::models::{EmergencyAlert, FeedbackEntry};

// ── Emergency alerts ────────────────────────────────────

pub fn insert_alert(conn: &Connection, alert: &EmergencyAlert) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO emergency_alerts (id, patient_id, caregiver_id, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            alert.id.to_string(),
            alert.patient_id.to_string(),
            alert.caregiver_id.to_string(),
            alert.status.as_str(),
            alert.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

fn alert_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String, String, String, String)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn build_alert(
    (id, patient_id, caregiver_id, status, created_at): (String, String, String, String, String),
) -> Result<EmergencyAlert, DatabaseError> {
    Ok(EmergencyAlert {
        id: Uuid::parse_str(&id).unwrap_or_default(),
        patient_id: Uuid::parse_str(&patient_id).unwrap_or_default(),
        caregiver_id: Uuid::parse_str(&caregiver_id).unwrap_or_default(),
        status: AlertStatus::from_str(&status)?,
        created_at: parse_timestamp(&created_at),
    })
}

const ALERT_COLS: &str = "id, patient_id, caregiver_id, status, created_at";

pub fn get_alert(conn: &Connection, id: &Uuid) -> Result<Option<EmergencyAlert>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {ALERT_COLS} FROM emergency_alerts WHERE id = ?1"),
            params![id.to_string()],
            alert_from_row,
        )
        .optional()?;
    row.map(build_alert).transpose()
}

/// The patient's most recent sent-state alert, if any — the anchor for
/// clinical-update feedback.
pub fn latest_sent_alert_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Option<EmergencyAlert>, DatabaseError> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {ALERT_COLS} FROM emergency_alerts
                 WHERE patient_id = ?1 AND status = 'sent'
                 ORDER BY created_at DESC, rowid DESC LIMIT 1"
            ),
            params![patient_id.to_string()],
            alert_from_row,
        )
        .optional()?;
    row.map(build_alert).transpose()
}

/// Sent alerts raised by one patient, newest first.
pub fn list_sent_alerts_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<EmergencyAlert>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ALERT_COLS} FROM emergency_alerts
         WHERE patient_id = ?1 AND status = 'sent'
         ORDER BY created_at DESC, rowid DESC"
    ))?;
    let rows = stmt.query_map(params![patient_id.to_string()], alert_from_row)?;

    let mut alerts = Vec::new();
    for row in rows {
        alerts.push(build_alert(row?)?);
    }
    Ok(alerts)
}

/// Compare-and-set transition; the alert lifecycle is forward-only.
pub fn cas_update_alert_status(
    conn: &Connection,
    id: &Uuid,
    expected: AlertStatus,
    new: AlertStatus,
) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE emergency_alerts SET status = ?3 WHERE id = ?1 AND status = ?2",
        params![id.to_string(), expected.as_str(), new.as_str()],
    )?;
    Ok(updated == 1)
}

pub fn count_alerts_by_status(conn: &Connection) -> Result<Vec<(String, i64)>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT status, COUNT(*) FROM emergency_alerts GROUP BY status ORDER BY status",
    )?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

// ── Feedback entries ────────────────────────────────────

pub fn insert_feedback(conn: &Connection, entry: &FeedbackEntry) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO feedback_entries (id, alert_id, message, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            entry.id.to_string(),
            entry.alert_id.to_string(),
            entry.message,
            entry.status.as_str(),
            entry.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

fn feedback_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String, String, String, String)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn build_feedback(
    (id, alert_id, message, status, created_at): (String, String, String, String, String),
) -> Result<FeedbackEntry, DatabaseError> {
    Ok(FeedbackEntry {
        id: Uuid::parse_str(&id).unwrap_or_default(),
        alert_id: Uuid::parse_str(&alert_id).unwrap_or_default(),
        message,
        status: FeedbackStatus::from_str(&status)?,
        created_at: parse_timestamp(&created_at),
    })
}

const FEEDBACK_COLS: &str = "id, alert_id, message, status, created_at";

pub fn list_feedback_by_alert(
    conn: &Connection,
    alert_id: &Uuid,
) -> Result<Vec<FeedbackEntry>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {FEEDBACK_COLS} FROM feedback_entries
         WHERE alert_id = ?1 ORDER BY created_at DESC, rowid DESC"
    ))?;
    let rows = stmt.query_map(params![alert_id.to_string()], feedback_from_row)?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(build_feedback(row?)?);
    }
    Ok(entries)
}

/// All feedback across a patient's alerts, newest first — the patient's
/// notifications view.
pub fn list_feedback_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<FeedbackEntry>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT f.id, f.alert_id, f.message, f.status, f.created_at
         FROM feedback_entries f
         JOIN emergency_alerts a ON a.id = f.alert_id
         WHERE a.patient_id = ?1
         ORDER BY f.created_at DESC, f.rowid DESC",
    )?;
    let rows = stmt.query_map(params![patient_id.to_string()], feedback_from_row)?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(build_feedback(row?)?);
    }
    Ok(entries)
}

/// The patient who raised the alert a feedback entry hangs off —
/// ownership check for read-marking.
pub fn feedback_patient_id(
    conn: &Connection,
    feedback_id: &Uuid,
) -> Result<Option<Uuid>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT a.patient_id FROM feedback_entries f
             JOIN emergency_alerts a ON a.id = f.alert_id
             WHERE f.id = ?1",
            params![feedback_id.to_string()],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(row.map(|id| Uuid::parse_str(&id).unwrap_or_default()))
}

pub fn cas_mark_feedback_read(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE feedback_entries SET status = 'read'
         WHERE id = ?1 AND status = 'sent'",
        params![id.to_string()],
    )?;
    Ok(updated == 1)
}
