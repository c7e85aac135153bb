//! Clinical records: bootstrap-on-first-access and in-place updates,
//! plus the caregiver monitoring view.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::repository::{
    assigned_patient_ids, distinct_specializations_for_patient, get_health_record_by_patient,
    get_patient, insert_health_record, update_health_record,
};
use crate::db::DatabaseError;
use crate::models::enums::Specialization;
use crate::models::{HealthRecord, PatientProfile};

/// Sentinel for "no known medications/allergies" on a fresh record.
pub const NONE_SENTINEL: &str = "None";

const HISTORY_HEADER: &str = "Default Medical History:\n";

/// Get the patient's record, creating it on first access.
///
/// The bootstrap runs at most once: the narrative is synthesized from the
/// request history at creation time and never re-triggered by new requests.
pub fn ensure_health_record(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<HealthRecord, DatabaseError> {
    if let Some(record) = get_health_record_by_patient(conn, patient_id)? {
        return Ok(record);
    }

    let record = HealthRecord {
        id: Uuid::new_v4(),
        patient_id: *patient_id,
        medical_history: Some(default_history(conn, patient_id)?),
        current_medications: Some(NONE_SENTINEL.to_string()),
        allergies: Some(NONE_SENTINEL.to_string()),
        blood_pressure: None,
        heart_rate: None,
        sugar_level: None,
        last_updated: chrono::Utc::now().naive_utc(),
    };
    insert_health_record(conn, &record)?;
    tracing::info!(patient_id = %patient_id, "Health record bootstrapped");
    Ok(record)
}

/// One templated line per distinct specialization ever requested,
/// scanned in a fixed order.
fn default_history(conn: &Connection, patient_id: &Uuid) -> Result<String, DatabaseError> {
    let requested = distinct_specializations_for_patient(conn, patient_id)?;
    let mut history = String::from(HISTORY_HEADER);
    for specialization in Specialization::ALL {
        if requested.contains(&specialization) {
            history.push_str(&format!(
                "- {}: No specific issues noted.\n",
                specialization.display_name()
            ));
        }
    }
    Ok(history)
}

/// Partial update applied over the stored record; absent fields keep
/// their current values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordUpdate {
    pub medical_history: Option<String>,
    pub current_medications: Option<String>,
    pub allergies: Option<String>,
    pub blood_pressure: Option<String>,
    pub heart_rate: Option<i32>,
    pub sugar_level: Option<f64>,
}

/// Update the record in place (creating it first if this is the first
/// access), stamping `last_updated`.
pub fn apply_record_update(
    conn: &Connection,
    patient_id: &Uuid,
    update: RecordUpdate,
) -> Result<HealthRecord, DatabaseError> {
    let mut record = ensure_health_record(conn, patient_id)?;

    if let Some(history) = update.medical_history {
        record.medical_history = Some(history);
    }
    if let Some(medications) = update.current_medications {
        record.current_medications = Some(medications);
    }
    if let Some(allergies) = update.allergies {
        record.allergies = Some(allergies);
    }
    if let Some(blood_pressure) = update.blood_pressure {
        record.blood_pressure = Some(blood_pressure);
    }
    if let Some(heart_rate) = update.heart_rate {
        record.heart_rate = Some(heart_rate);
    }
    if let Some(sugar_level) = update.sugar_level {
        record.sugar_level = Some(sugar_level);
    }
    record.last_updated = chrono::Utc::now().naive_utc();

    update_health_record(conn, &record)?;
    Ok(record)
}

// ═══════════════════════════════════════════════════════════
// Monitoring view
// ═══════════════════════════════════════════════════════════

/// Estimated healthy ranges shown alongside vitals on the monitoring page.
#[derive(Debug, Clone, Serialize)]
pub struct HealthMetricRanges {
    /// Systolic mmHg considered low / high.
    pub blood_pressure_low: (u32, u32),
    pub blood_pressure_high: (u32, u32),
    pub heart_rate: (u32, u32),
    /// Fasting glucose, mg/dL.
    pub sugar_level: (u32, u32),
}

pub fn health_metric_ranges() -> HealthMetricRanges {
    HealthMetricRanges {
        blood_pressure_low: (90, 120),
        blood_pressure_high: (140, 180),
        heart_rate: (60, 100),
        sugar_level: (70, 110),
    }
}

/// A patient row on the caregiver monitoring page. The record is read,
/// not bootstrapped — monitoring never creates records.
#[derive(Debug, Clone, Serialize)]
pub struct MonitoringEntry {
    pub patient: PatientProfile,
    pub record: Option<HealthRecord>,
}

pub fn monitoring_feed(
    conn: &Connection,
    caregiver_id: &Uuid,
) -> Result<Vec<MonitoringEntry>, DatabaseError> {
    let mut feed = Vec::new();
    for patient_id in assigned_patient_ids(conn, caregiver_id)? {
        let Some(patient) = get_patient(conn, &patient_id)? else {
            continue;
        };
        let record = get_health_record_by_patient(conn, &patient_id)?;
        feed.push(MonitoringEntry { patient, record });
    }
    Ok(feed)
}
