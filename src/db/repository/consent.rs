use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::{parse_uuid, DatabaseError};
use crate::models::ConsentGrant;

const GRANT_COLUMNS: &str =
    "id, patient_id, professional_id, granted_at, expires_at, is_active, is_emergency";

struct GrantRow {
    id: String,
    patient_id: String,
    professional_id: String,
    granted_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    is_active: i32,
    is_emergency: i32,
}

fn read_grant_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<GrantRow> {
    Ok(GrantRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        professional_id: row.get(2)?,
        granted_at: row.get(3)?,
        expires_at: row.get(4)?,
        is_active: row.get(5)?,
        is_emergency: row.get(6)?,
    })
}

fn grant_from_row(row: GrantRow) -> Result<ConsentGrant, DatabaseError> {
    Ok(ConsentGrant {
        id: parse_uuid("consent_grants.id", &row.id)?,
        patient_id: parse_uuid("consent_grants.patient_id", &row.patient_id)?,
        professional_id: parse_uuid("consent_grants.professional_id", &row.professional_id)?,
        granted_at: row.granted_at,
        expires_at: row.expires_at,
        is_active: row.is_active != 0,
        is_emergency: row.is_emergency != 0,
    })
}

/// Create or refresh the single grant for a (patient, professional) pair.
///
/// One atomic statement: two concurrent grants for the same pair can never
/// produce two rows; the loser's values are absorbed into the winner's
/// row. A refresh reactivates the grant and replaces the expiry but keeps
/// `granted_at` and `is_emergency` from the original grant.
pub fn upsert_grant(
    conn: &Connection,
    patient_id: &Uuid,
    professional_id: &Uuid,
    granted_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
) -> Result<ConsentGrant, DatabaseError> {
    conn.execute(
        "INSERT INTO consent_grants (id, patient_id, professional_id, granted_at, expires_at, is_active, is_emergency)
         VALUES (?1, ?2, ?3, ?4, ?5, 1, 0)
         ON CONFLICT (patient_id, professional_id)
         DO UPDATE SET is_active = 1, expires_at = excluded.expires_at",
        params![
            Uuid::new_v4().to_string(),
            patient_id.to_string(),
            professional_id.to_string(),
            granted_at,
            expires_at,
        ],
    )?;

    // Re-read: on refresh the row keeps its original id and granted_at.
    get_grant_for_pair(conn, patient_id, professional_id)?.ok_or_else(|| {
        DatabaseError::ConstraintViolation("upserted grant disappeared".to_string())
    })
}

pub fn get_grant(conn: &Connection, id: &Uuid) -> Result<Option<ConsentGrant>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {GRANT_COLUMNS} FROM consent_grants WHERE id = ?1"
    ))?;
    let row = stmt
        .query_row(params![id.to_string()], read_grant_row)
        .optional()?;
    row.map(grant_from_row).transpose()
}

pub fn get_grant_for_pair(
    conn: &Connection,
    patient_id: &Uuid,
    professional_id: &Uuid,
) -> Result<Option<ConsentGrant>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {GRANT_COLUMNS} FROM consent_grants
         WHERE patient_id = ?1 AND professional_id = ?2"
    ))?;
    let row = stmt
        .query_row(
            params![patient_id.to_string(), professional_id.to_string()],
            read_grant_row,
        )
        .optional()?;
    row.map(grant_from_row).transpose()
}

/// Soft-revoke: the row is kept for the audit history.
///
/// Scoped to the owning patient and to currently-active grants so the
/// caller cannot distinguish "not yours" from "already revoked".
pub fn deactivate_grant(
    conn: &Connection,
    grant_id: &Uuid,
    patient_id: &Uuid,
) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE consent_grants SET is_active = 0
         WHERE id = ?1 AND patient_id = ?2 AND is_active = 1",
        params![grant_id.to_string(), patient_id.to_string()],
    )?;
    Ok(updated > 0)
}

pub fn list_grants_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<ConsentGrant>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {GRANT_COLUMNS} FROM consent_grants
         WHERE patient_id = ?1 ORDER BY granted_at DESC"
    ))?;
    let rows = stmt
        .query_map(params![patient_id.to_string()], read_grant_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(grant_from_row).collect()
}
