//! Append-only audit recorder.
//!
//! `record` must never fail the operation it describes: a broken audit
//! write is reported on the log (the operational channel) and swallowed,
//! so a business transaction can never be rolled back by its own trail.

use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::repository::audit as audit_repo;
use crate::error::ServiceError;
use crate::models::AuditLogEntry;

/// Append one entry to the audit trail.
pub fn record(
    conn: &Connection,
    actor: Option<&Uuid>,
    action: &str,
    details: Option<&str>,
    origin: Option<&str>,
) {
    if let Err(e) = audit_repo::insert_entry(conn, actor, action, origin, details, Utc::now()) {
        tracing::warn!(action, error = %e, "audit write failed");
    }
}

/// Read-only dump for the admin surface, newest first.
pub fn list_logs(conn: &Connection) -> Result<Vec<AuditLogEntry>, ServiceError> {
    Ok(audit_repo::list_entries(conn)?)
}
