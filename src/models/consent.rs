use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The authorization unit linking one patient to one professional.
///
/// At most one grant exists per (patient, professional) pair; re-granting
/// refreshes the existing row. Revocation flips `is_active` and keeps the
/// row for the audit history; expiry is never swept, only evaluated at
/// check time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentGrant {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub professional_id: Uuid,
    pub granted_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub is_emergency: bool,
}

impl ConsentGrant {
    /// A grant authorizes access iff it is active and not past its expiry.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        match self.expires_at {
            Some(expires_at) => expires_at > now,
            None => true,
        }
    }
}
