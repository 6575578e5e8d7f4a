use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::{parse_uuid, DatabaseError};
use crate::models::AuditLogEntry;

/// Append one audit row. There is no update or delete counterpart; the
/// table only ever grows.
pub fn insert_entry(
    conn: &Connection,
    user_id: Option<&Uuid>,
    action: &str,
    ip_address: Option<&str>,
    details: Option<&str>,
    timestamp: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO audit_log (user_id, action, ip_address, details, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            user_id.map(|id| id.to_string()),
            action,
            ip_address,
            details,
            timestamp,
        ],
    )?;
    Ok(())
}

pub fn list_entries(conn: &Connection) -> Result<Vec<AuditLogEntry>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, action, ip_address, details, timestamp
         FROM audit_log ORDER BY timestamp DESC, id DESC",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, DateTime<Utc>>(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, user_id, action, ip_address, details, timestamp)| {
            Ok(AuditLogEntry {
                id,
                user_id: user_id
                    .as_deref()
                    .map(|v| parse_uuid("audit_log.user_id", v))
                    .transpose()?,
                action,
                ip_address,
                details,
                timestamp,
            })
        })
        .collect()
}

pub fn count_entries(conn: &Connection, action: &str) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM audit_log WHERE action = ?1",
        params![action],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::user::delete_user;
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::Role;
    use crate::testutil::seed_user;

    #[test]
    fn insert_and_list_entries() {
        let conn = open_memory_database().unwrap();
        let user = seed_user(&conn, "p@example.test", Role::Patient);

        insert_entry(&conn, Some(&user.id), "login", Some("10.0.0.5"), None, Utc::now()).unwrap();
        insert_entry(&conn, None, "system_start", None, Some("boot"), Utc::now()).unwrap();

        let entries = list_entries(&conn).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|e| e.action == "login" && e.user_id == Some(user.id)));
        assert!(entries.iter().any(|e| e.action == "system_start" && e.user_id.is_none()));
    }

    #[test]
    fn deleting_the_actor_nulls_the_reference() {
        let conn = open_memory_database().unwrap();
        let user = seed_user(&conn, "p@example.test", Role::Patient);
        insert_entry(&conn, Some(&user.id), "login", None, None, Utc::now()).unwrap();

        assert!(delete_user(&conn, &user.id).unwrap());

        let entries = list_entries(&conn).unwrap();
        assert_eq!(entries.len(), 1, "Audit rows must survive actor deletion");
        assert!(entries[0].user_id.is_none());
    }

    #[test]
    fn count_by_action() {
        let conn = open_memory_database().unwrap();
        insert_entry(&conn, None, "dep_access_allowed", None, None, Utc::now()).unwrap();
        insert_entry(&conn, None, "dep_access_allowed", None, None, Utc::now()).unwrap();
        insert_entry(&conn, None, "dep_access_denied", None, None, Utc::now()).unwrap();

        assert_eq!(count_entries(&conn, "dep_access_allowed").unwrap(), 2);
        assert_eq!(count_entries(&conn, "dep_access_denied").unwrap(), 1);
        assert_eq!(count_entries(&conn, "other").unwrap(), 0);
    }
}
