use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(Role {
    Patient => "patient",
    Caregiver => "caregiver",
    Doctor => "doctor",
    Admin => "admin",
});

str_enum!(Specialization {
    Neurologist => "neurologist",
    Cardiologist => "cardiologist",
    Geriatrician => "geriatrician",
});

impl Specialization {
    /// All specializations, in the order the record bootstrap scans them.
    pub const ALL: [Specialization; 3] = [
        Specialization::Cardiologist,
        Specialization::Neurologist,
        Specialization::Geriatrician,
    ];

    /// Capitalized display form ("Cardiologist").
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Neurologist => "Neurologist",
            Self::Cardiologist => "Cardiologist",
            Self::Geriatrician => "Geriatrician",
        }
    }
}

str_enum!(RequestStatus {
    Pending => "pending",
    Accepted => "accepted",
    Scheduled => "scheduled",
    Completed => "completed",
    Rejected => "rejected",
});

impl RequestStatus {
    /// Terminal states admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Rejected)
    }
}

str_enum!(PaymentStatus {
    Pending => "pending",
    Paid => "paid",
});

str_enum!(AlertStatus {
    Sent => "sent",
    Acknowledged => "acknowledged",
    Resolved => "resolved",
});

str_enum!(FeedbackStatus {
    Sent => "sent",
    Read => "read",
});
