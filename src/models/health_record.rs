use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The one-per-patient aggregate of medical history, medications,
/// allergies, and vitals. Created on first access with defaults
/// synthesized from the patient's request history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub medical_history: Option<String>,
    pub current_medications: Option<String>,
    pub allergies: Option<String>,
    /// Formatted pair, e.g. "120/80".
    pub blood_pressure: Option<String>,
    pub heart_rate: Option<i32>,
    pub sugar_level: Option<f64>,
    pub last_updated: NaiveDateTime,
}
