use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row of the append-only audit trail.
///
/// `user_id` is nullable: deleting an account leaves its audit history in
/// place with the actor reference cleared, never cascaded away.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: i64,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub ip_address: Option<String>,
    pub details: Option<String>,
    pub timestamp: DateTime<Utc>,
}
