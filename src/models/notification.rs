use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{AlertStatus, FeedbackStatus};

/// A patient-raised, caregiver-directed signal.
/// Status moves sent → acknowledged → resolved, forward only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyAlert {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub caregiver_id: Uuid,
    pub status: AlertStatus,
    pub created_at: NaiveDateTime,
}

/// A message attached to an alert: emergency acknowledgment replies and
/// clinical-update notifications both land here, surfaced on the
/// patient's notifications view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub id: Uuid,
    pub alert_id: Uuid,
    pub message: String,
    pub status: FeedbackStatus,
    pub created_at: NaiveDateTime,
}
