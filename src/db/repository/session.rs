use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::{parse_uuid, DatabaseError};

/// A stored bearer-token session. Only the SHA-256 hash of the token ever
/// touches the database.
#[derive(Debug, Clone)]
pub struct SessionRow {
    pub token_hash: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

pub fn insert_session(conn: &Connection, session: &SessionRow) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO sessions (token_hash, user_id, created_at, expires_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            session.token_hash,
            session.user_id.to_string(),
            session.created_at,
            session.expires_at,
        ],
    )?;
    Ok(())
}

pub fn get_session(
    conn: &Connection,
    token_hash: &str,
) -> Result<Option<SessionRow>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT token_hash, user_id, created_at, expires_at FROM sessions WHERE token_hash = ?1",
            params![token_hash],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, DateTime<Utc>>(2)?,
                    row.get::<_, DateTime<Utc>>(3)?,
                ))
            },
        )
        .optional()?;

    row.map(|(token_hash, user_id, created_at, expires_at)| {
        Ok(SessionRow {
            token_hash,
            user_id: parse_uuid("sessions.user_id", &user_id)?,
            created_at,
            expires_at,
        })
    })
    .transpose()
}

pub fn delete_session(conn: &Connection, token_hash: &str) -> Result<bool, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM sessions WHERE token_hash = ?1",
        params![token_hash],
    )?;
    Ok(deleted > 0)
}

/// Housekeeping for the login path: drop sessions already past expiry.
pub fn delete_expired_sessions(conn: &Connection, now: DateTime<Utc>) -> Result<usize, DatabaseError> {
    let deleted = conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", params![now])?;
    Ok(deleted)
}
