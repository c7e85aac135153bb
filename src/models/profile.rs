use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::Specialization;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientProfile {
    pub id: Uuid,
    pub account_id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub emergency_contact: Option<String>,
}

impl PatientProfile {
    /// "First Last", falling back to whichever part exists.
    pub fn display_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.to_string(),
            (None, Some(last)) => last.to_string(),
            (None, None) => String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaregiverProfile {
    pub id: Uuid,
    pub account_id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub relationship: Option<String>,
    pub contact_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub id: Uuid,
    pub account_id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub specialization: Option<Specialization>,
    pub license_number: Option<String>,
    /// Admin-controlled gate for participation in clinical workflows.
    pub verified: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminProfile {
    pub id: Uuid,
    pub account_id: Uuid,
    /// Unstructured permission set, stored as JSON text.
    pub permissions: String,
}

impl AdminProfile {
    /// An admin with no granted permissions is treated as incomplete
    /// and is redirected to the profile page after login.
    pub fn has_permissions(&self) -> bool {
        !matches!(self.permissions.trim(), "" | "{}" | "null")
    }
}
