use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::repository::parse_timestamp;
use crate::db::DatabaseError;
use crate::models::HealthRecord;

pub fn insert_health_record(conn: &Connection, record: &HealthRecord) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO health_records (id, patient_id, medical_history, current_medications,
         allergies, blood_pressure, heart_rate, sugar_level, last_updated)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            record.id.to_string(),
            record.patient_id.to_string(),
            record.medical_history,
            record.current_medications,
            record.allergies,
            record.blood_pressure,
            record.heart_rate,
            record.sugar_level,
            record.last_updated.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<HealthRecord> {
    Ok(HealthRecord {
        id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap_or_default(),
        patient_id: Uuid::parse_str(&row.get::<_, String>(1)?).unwrap_or_default(),
        medical_history: row.get(2)?,
        current_medications: row.get(3)?,
        allergies: row.get(4)?,
        blood_pressure: row.get(5)?,
        heart_rate: row.get(6)?,
        sugar_level: row.get(7)?,
        last_updated: parse_timestamp(&row.get::<_, String>(8)?),
    })
}

pub fn get_health_record_by_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Option<HealthRecord>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, patient_id, medical_history, current_medications, allergies,
             blood_pressure, heart_rate, sugar_level, last_updated
             FROM health_records WHERE patient_id = ?1",
            params![patient_id.to_string()],
            record_from_row,
        )
        .optional()?;
    Ok(row)
}

/// Overwrite the mutable fields of an existing record, in place.
pub fn update_health_record(conn: &Connection, record: &HealthRecord) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE health_records SET medical_history = ?2, current_medications = ?3,
         allergies = ?4, blood_pressure = ?5, heart_rate = ?6, sugar_level = ?7,
         last_updated = ?8 WHERE id = ?1",
        params![
            record.id.to_string(),
            record.medical_history,
            record.current_medications,
            record.allergies,
            record.blood_pressure,
            record.heart_rate,
            record.sugar_level,
            record.last_updated.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}
