//! Emergency alerts and the notification fan-out.
//!
//! Alerts are patient-raised and caregiver-directed; their status moves
//! sent → acknowledged → resolved, forward only. Feedback entries hang
//! off alerts and carry both acknowledgment replies and clinical-update
//! notifications surfaced on the patient's notifications view.

use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::db::repository::{
    assigned_patient_ids, cas_mark_feedback_read, cas_update_alert_status, feedback_patient_id,
    first_caregiver, get_alert, get_patient, insert_alert, insert_feedback,
    latest_sent_alert_for_patient, list_feedback_for_patient, list_sent_alerts_for_patient,
};
use crate::db::DatabaseError;
use crate::models::enums::{AlertStatus, FeedbackStatus};
use crate::models::{EmergencyAlert, FeedbackEntry};

/// Fixed reassurance message created when a caregiver acknowledges.
pub const ACKNOWLEDGMENT_MESSAGE: &str = "Help is on the way!";

#[derive(Debug, thiserror::Error)]
pub enum EmergencyError {
    #[error("entity not found")]
    NotFound,
    #[error("action not permitted for this actor")]
    NotPermitted,
    #[error("alert state changed underneath the caller")]
    Stale,
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Raise an alert from the emergency button.
///
/// Routing policy: the first caregiver by insertion order, regardless of
/// assignment — the dashboard view filters by assignment, this path does
/// not. Returns `None` (no alert) when the store has no caregiver at all.
pub fn raise_alert(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Option<EmergencyAlert>, DatabaseError> {
    let Some(caregiver) = first_caregiver(conn)? else {
        return Ok(None);
    };

    let alert = EmergencyAlert {
        id: Uuid::new_v4(),
        patient_id: *patient_id,
        caregiver_id: caregiver.id,
        status: AlertStatus::Sent,
        created_at: chrono::Utc::now().naive_utc(),
    };
    insert_alert(conn, &alert)?;
    tracing::info!(alert_id = %alert.id, "Emergency alert raised");
    Ok(Some(alert))
}

/// sent → acknowledged, plus exactly one feedback entry, atomically.
pub fn acknowledge_alert(
    conn: &mut Connection,
    caregiver_id: &Uuid,
    alert_id: &Uuid,
) -> Result<FeedbackEntry, EmergencyError> {
    let alert = get_alert(conn, alert_id)?.ok_or(EmergencyError::NotFound)?;
    if alert.caregiver_id != *caregiver_id {
        return Err(EmergencyError::NotPermitted);
    }

    let tx = conn.transaction().map_err(DatabaseError::from)?;
    if !cas_update_alert_status(&tx, alert_id, AlertStatus::Sent, AlertStatus::Acknowledged)? {
        return Err(EmergencyError::Stale);
    }
    let entry = FeedbackEntry {
        id: Uuid::new_v4(),
        alert_id: *alert_id,
        message: ACKNOWLEDGMENT_MESSAGE.to_string(),
        status: FeedbackStatus::Sent,
        created_at: chrono::Utc::now().naive_utc(),
    };
    insert_feedback(&tx, &entry)?;
    tx.commit().map_err(DatabaseError::from)?;
    Ok(entry)
}

/// acknowledged → resolved. Feedback entries are untouched.
pub fn resolve_alert(
    conn: &Connection,
    caregiver_id: &Uuid,
    alert_id: &Uuid,
) -> Result<(), EmergencyError> {
    let alert = get_alert(conn, alert_id)?.ok_or(EmergencyError::NotFound)?;
    if alert.caregiver_id != *caregiver_id {
        return Err(EmergencyError::NotPermitted);
    }
    if !cas_update_alert_status(conn, alert_id, AlertStatus::Acknowledged, AlertStatus::Resolved)? {
        return Err(EmergencyError::Stale);
    }
    Ok(())
}

/// Attach a clinical-update feedback entry to the patient's most recent
/// sent alert, synthesizing one addressed to the default caregiver when
/// no sent alert exists. With no alert and no caregiver the update is a
/// silent no-op, not an error.
pub fn attach_clinical_feedback(
    conn: &Connection,
    patient_id: &Uuid,
    message: &str,
) -> Result<Option<FeedbackEntry>, DatabaseError> {
    let alert_id = match latest_sent_alert_for_patient(conn, patient_id)? {
        Some(alert) => alert.id,
        None => match first_caregiver(conn)? {
            Some(caregiver) => {
                let alert = EmergencyAlert {
                    id: Uuid::new_v4(),
                    patient_id: *patient_id,
                    caregiver_id: caregiver.id,
                    status: AlertStatus::Sent,
                    created_at: chrono::Utc::now().naive_utc(),
                };
                insert_alert(conn, &alert)?;
                alert.id
            }
            None => return Ok(None),
        },
    };

    let entry = FeedbackEntry {
        id: Uuid::new_v4(),
        alert_id,
        message: message.to_string(),
        status: FeedbackStatus::Sent,
        created_at: chrono::Utc::now().naive_utc(),
    };
    insert_feedback(conn, &entry)?;
    Ok(Some(entry))
}

/// Patient marks one of their feedback entries read (sent → read).
pub fn mark_feedback_read(
    conn: &Connection,
    patient_id: &Uuid,
    feedback_id: &Uuid,
) -> Result<(), EmergencyError> {
    let owner = feedback_patient_id(conn, feedback_id)?.ok_or(EmergencyError::NotFound)?;
    if owner != *patient_id {
        return Err(EmergencyError::NotPermitted);
    }
    if !cas_mark_feedback_read(conn, feedback_id)? {
        return Err(EmergencyError::Stale);
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════
// Caregiver feed views
// ═══════════════════════════════════════════════════════════

/// A sent alert joined with its patient's name, for the caregiver feed.
#[derive(Debug, Clone, Serialize)]
pub struct AlertFeedItem {
    pub alert: EmergencyAlert,
    pub patient_name: String,
}

/// Sent alerts raised by the caregiver's assigned patients, newest first.
/// A caregiver must reload to see new ones — there is no push.
pub fn sent_alerts_for_caregiver(
    conn: &Connection,
    caregiver_id: &Uuid,
) -> Result<Vec<AlertFeedItem>, DatabaseError> {
    let mut feed = Vec::new();
    for patient_id in assigned_patient_ids(conn, caregiver_id)? {
        let patient_name = get_patient(conn, &patient_id)?
            .map(|p| p.display_name())
            .unwrap_or_default();
        for alert in list_sent_alerts_for_patient(conn, &patient_id)? {
            feed.push(AlertFeedItem {
                alert,
                patient_name: patient_name.clone(),
            });
        }
    }
    feed.sort_by(|a, b| b.alert.created_at.cmp(&a.alert.created_at));
    Ok(feed)
}

/// A feedback entry joined with its patient's name.
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackFeedItem {
    pub entry: FeedbackEntry,
    pub patient_name: String,
}

/// All feedback across the caregiver's assigned patients, newest first.
pub fn feedback_for_caregiver(
    conn: &Connection,
    caregiver_id: &Uuid,
) -> Result<Vec<FeedbackFeedItem>, DatabaseError> {
    let mut feed = Vec::new();
    for patient_id in assigned_patient_ids(conn, caregiver_id)? {
        let patient_name = get_patient(conn, &patient_id)?
            .map(|p| p.display_name())
            .unwrap_or_default();
        for entry in list_feedback_for_patient(conn, &patient_id)? {
            feed.push(FeedbackFeedItem {
                entry,
                patient_name: patient_name.clone(),
            });
        }
    }
    feed.sort_by(|a, b| b.entry.created_at.cmp(&a.entry.created_at));
    Ok(feed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{
        assign_patient, insert_account, insert_caregiver, insert_patient, list_feedback_by_alert,
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

    fn seed_patient(conn: &Connection, first_name: &str) -> Uuid {
        let patient = PatientProfile {
            id: Uuid::new_v4(),
            account_id: seed_account(conn, Role::Patient),
            first_name: Some(first_name.to_string()),
            last_name: None,
            gender: None,
            address: None,
            emergency_contact: None,
        };
        insert_patient(conn, &patient).unwrap();
        patient.id
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
    fn raise_alert_routes_to_first_caregiver() {
        let conn = open_memory_database().unwrap();
        let patient_id = seed_patient(&conn, "Edna");
        let first = seed_caregiver(&conn);
        let _second = seed_caregiver(&conn);

        let alert = raise_alert(&conn, &patient_id).unwrap().unwrap();
        assert_eq!(alert.caregiver_id, first);
        assert_eq!(alert.status, AlertStatus::Sent);
    }

    #[test]
    fn raise_alert_without_caregiver_is_noop() {
        let conn = open_memory_database().unwrap();
        let patient_id = seed_patient(&conn, "Edna");
        assert!(raise_alert(&conn, &patient_id).unwrap().is_none());
    }

    #[test]
    fn acknowledge_creates_one_feedback_entry() {
        let mut conn = open_memory_database().unwrap();
        let patient_id = seed_patient(&conn, "Edna");
        let caregiver_id = seed_caregiver(&conn);
        let alert = raise_alert(&conn, &patient_id).unwrap().unwrap();

        let entry = acknowledge_alert(&mut conn, &caregiver_id, &alert.id).unwrap();
        assert_eq!(entry.message, ACKNOWLEDGMENT_MESSAGE);
        assert_eq!(entry.status, FeedbackStatus::Sent);

        let entries = list_feedback_by_alert(&conn, &alert.id).unwrap();
        assert_eq!(entries.len(), 1);

        // Double acknowledge is stale — and adds no second entry.
        assert!(matches!(
            acknowledge_alert(&mut conn, &caregiver_id, &alert.id),
            Err(EmergencyError::Stale)
        ));
        assert_eq!(list_feedback_by_alert(&conn, &alert.id).unwrap().len(), 1);
    }

    #[test]
    fn acknowledge_requires_directed_caregiver() {
        let mut conn = open_memory_database().unwrap();
        let patient_id = seed_patient(&conn, "Edna");
        let _directed = seed_caregiver(&conn);
        let other = seed_caregiver(&conn);
        let alert = raise_alert(&conn, &patient_id).unwrap().unwrap();

        assert!(matches!(
            acknowledge_alert(&mut conn, &other, &alert.id),
            Err(EmergencyError::NotPermitted)
        ));
    }

    #[test]
    fn resolve_requires_acknowledged() {
        let mut conn = open_memory_database().unwrap();
        let patient_id = seed_patient(&conn, "Edna");
        let caregiver_id = seed_caregiver(&conn);
        let alert = raise_alert(&conn, &patient_id).unwrap().unwrap();

        assert!(matches!(
            resolve_alert(&conn, &caregiver_id, &alert.id),
            Err(EmergencyError::Stale)
        ));
        acknowledge_alert(&mut conn, &caregiver_id, &alert.id).unwrap();
        resolve_alert(&conn, &caregiver_id, &alert.id).unwrap();

        // Resolving does not touch the feedback entry.
        let entries = list_feedback_by_alert(&conn, &alert.id).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, FeedbackStatus::Sent);
    }

    #[test]
    fn clinical_feedback_reuses_sent_alert() {
        let conn = open_memory_database().unwrap();
        let patient_id = seed_patient(&conn, "Edna");
        let _caregiver_id = seed_caregiver(&conn);
        let alert = raise_alert(&conn, &patient_id).unwrap().unwrap();

        let entry = attach_clinical_feedback(&conn, &patient_id, "BP trending high")
            .unwrap()
            .unwrap();
        assert_eq!(entry.alert_id, alert.id);
        assert_eq!(entry.message, "BP trending high");
    }

    #[test]
    fn clinical_feedback_synthesizes_alert_when_none_sent() {
        let conn = open_memory_database().unwrap();
        let patient_id = seed_patient(&conn, "Edna");
        let caregiver_id = seed_caregiver(&conn);

        let entry = attach_clinical_feedback(&conn, &patient_id, "New prescription")
            .unwrap()
            .unwrap();
        let alert = get_alert(&conn, &entry.alert_id).unwrap().unwrap();
        assert_eq!(alert.patient_id, patient_id);
        assert_eq!(alert.caregiver_id, caregiver_id);
        assert_eq!(alert.status, AlertStatus::Sent);
    }

    #[test]
    fn clinical_feedback_noop_without_caregiver_or_alert() {
        let conn = open_memory_database().unwrap();
        let patient_id = seed_patient(&conn, "Edna");
        assert!(attach_clinical_feedback(&conn, &patient_id, "note")
            .unwrap()
            .is_none());
    }

    #[test]
    fn caregiver_feed_filters_by_assignment() {
        let conn = open_memory_database().unwrap();
        let assigned = seed_patient(&conn, "Edna");
        let unassigned = seed_patient(&conn, "Omar");
        let caregiver_id = seed_caregiver(&conn);
        assign_patient(&conn, &caregiver_id, &assigned).unwrap();

        raise_alert(&conn, &assigned).unwrap().unwrap();
        raise_alert(&conn, &unassigned).unwrap().unwrap();

        let feed = sent_alerts_for_caregiver(&conn, &caregiver_id).unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].patient_name, "Edna");
    }

    #[test]
    fn mark_feedback_read_checks_ownership() {
        let mut conn = open_memory_database().unwrap();
        let patient_id = seed_patient(&conn, "Edna");
        let other_patient = seed_patient(&conn, "Omar");
        let caregiver_id = seed_caregiver(&conn);
        let alert = raise_alert(&conn, &patient_id).unwrap().unwrap();
        let entry = acknowledge_alert(&mut conn, &caregiver_id, &alert.id).unwrap();

        assert!(matches!(
            mark_feedback_read(&conn, &other_patient, &entry.id),
            Err(EmergencyError::NotPermitted)
        ));
        mark_feedback_read(&conn, &patient_id, &entry.id).unwrap();
        assert!(matches!(
            mark_feedback_read(&conn, &patient_id, &entry.id),
            Err(EmergencyError::Stale)
        ));
    }
}
