//! Consent ledger operations.
//!
//! A patient grants a professional time-boxed access to their dossier and
//! can revoke it at any point. One grant per (patient, professional) pair:
//! re-granting refreshes the row instead of stacking new ones. Revocation
//! keeps the row (the audit history needs it); expiry is only ever
//! observed at check time.

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use crate::audit;
use crate::db::repository::{consent as consent_repo, user as user_repo};
use crate::error::ServiceError;
use crate::models::{ConsentGrant, User};

/// Grant (or refresh) access for the professional registered under
/// `professional_email`, valid for `duration_days` from `now`.
///
/// The email is matched case-insensitively. Unknown email → NotFound;
/// a non-professional account → InvalidRole. Idempotent: granting twice
/// leaves a single grant carrying the latest expiry.
pub fn grant_access(
    conn: &Connection,
    patient: &User,
    professional_email: &str,
    duration_days: i64,
    now: DateTime<Utc>,
) -> Result<ConsentGrant, ServiceError> {
    if duration_days <= 0 {
        return Err(ServiceError::Validation(
            "expiration_days must be positive".to_string(),
        ));
    }

    let professional = user_repo::get_user_by_email(conn, professional_email)?
        .ok_or(ServiceError::NotFound("professional"))?;
    if !professional.role.is_professional() {
        return Err(ServiceError::InvalidRole(
            "email does not belong to a health professional".to_string(),
        ));
    }

    let expires_at = now + Duration::days(duration_days);
    let grant =
        consent_repo::upsert_grant(conn, &patient.id, &professional.id, now, Some(expires_at))?;

    let details = format!(
        "professional={} expires_at={}",
        professional.id,
        expires_at.to_rfc3339()
    );
    audit::record(conn, Some(&patient.id), "consent_granted", Some(&details), None);

    Ok(grant)
}

/// Revoke a grant owned by the calling patient.
///
/// A grant that does not exist, belongs to someone else, or is already
/// inactive all answer NotFound, so revocation leaks nothing about other
/// patients' ledgers.
pub fn revoke_access(
    conn: &Connection,
    patient: &User,
    grant_id: &Uuid,
) -> Result<(), ServiceError> {
    let revoked = consent_repo::deactivate_grant(conn, grant_id, &patient.id)?;
    if !revoked {
        return Err(ServiceError::NotFound("authorization"));
    }

    let details = format!("grant={grant_id}");
    audit::record(conn, Some(&patient.id), "consent_revoked", Some(&details), None);

    Ok(())
}

/// The patient's own ledger, newest first.
pub fn list_grants(conn: &Connection, patient: &User) -> Result<Vec<ConsentGrant>, ServiceError> {
    Ok(consent_repo::list_grants_for_patient(conn, &patient.id)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{check_access, AccessMode, AccessReason};
    use crate::db::repository::audit::count_entries;
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::Role;
    use crate::testutil::seed_user;

    #[test]
    fn grant_resolves_email_case_insensitively() {
        let conn = open_memory_database().unwrap();
        let patient = seed_user(&conn, "p@example.test", Role::Patient);
        seed_user(&conn, "doc@example.test", Role::Doctor);
        let now = Utc::now();

        let grant = grant_access(&conn, &patient, "Doc@Example.TEST", 7, now).unwrap();
        assert!(grant.is_active);
        assert_eq!(grant.expires_at, Some(now + Duration::days(7)));
        assert_eq!(count_entries(&conn, "consent_granted").unwrap(), 1);
    }

    #[test]
    fn unknown_email_is_not_found_and_writes_nothing() {
        let conn = open_memory_database().unwrap();
        let patient = seed_user(&conn, "p@example.test", Role::Patient);

        let err = grant_access(&conn, &patient, "ghost@example.test", 7, Utc::now()).unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("professional")));

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM consent_grants", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn granting_to_a_patient_is_invalid_role() {
        let conn = open_memory_database().unwrap();
        let patient = seed_user(&conn, "p@example.test", Role::Patient);
        seed_user(&conn, "friend@example.test", Role::Patient);

        let err = grant_access(&conn, &patient, "friend@example.test", 7, Utc::now()).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidRole(_)));
    }

    #[test]
    fn granting_twice_keeps_one_row_with_latest_expiry() {
        let conn = open_memory_database().unwrap();
        let patient = seed_user(&conn, "p@example.test", Role::Patient);
        seed_user(&conn, "d@example.test", Role::Doctor);
        let now = Utc::now();

        let first = grant_access(&conn, &patient, "d@example.test", 7, now).unwrap();
        let second = grant_access(&conn, &patient, "d@example.test", 30, now).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.expires_at, Some(now + Duration::days(30)));

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM consent_grants", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn non_positive_duration_is_rejected() {
        let conn = open_memory_database().unwrap();
        let patient = seed_user(&conn, "p@example.test", Role::Patient);
        seed_user(&conn, "d@example.test", Role::Doctor);

        for days in [0, -3] {
            let err = grant_access(&conn, &patient, "d@example.test", days, Utc::now())
                .unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)));
        }
    }

    #[test]
    fn grant_then_revoke_then_check_denies_inactive() {
        let conn = open_memory_database().unwrap();
        let patient = seed_user(&conn, "p@example.test", Role::Patient);
        let doctor = seed_user(&conn, "d@example.test", Role::Doctor);
        let now = Utc::now();

        let grant = grant_access(&conn, &patient, "d@example.test", 7, now).unwrap();
        revoke_access(&conn, &patient, &grant.id).unwrap();

        let decision = check_access(&conn, &doctor, &patient, AccessMode::Read, now).unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.reason, AccessReason::Inactive);
        assert_eq!(count_entries(&conn, "consent_revoked").unwrap(), 1);
    }

    #[test]
    fn revoke_conflates_foreign_and_missing_grants() {
        let conn = open_memory_database().unwrap();
        let patient = seed_user(&conn, "p@example.test", Role::Patient);
        let other = seed_user(&conn, "o@example.test", Role::Patient);
        seed_user(&conn, "d@example.test", Role::Doctor);

        let grant = grant_access(&conn, &patient, "d@example.test", 7, Utc::now()).unwrap();

        // Someone else's grant and a random id are indistinguishable.
        let foreign = revoke_access(&conn, &other, &grant.id).unwrap_err();
        let missing = revoke_access(&conn, &patient, &Uuid::new_v4()).unwrap_err();
        assert!(matches!(foreign, ServiceError::NotFound("authorization")));
        assert!(matches!(missing, ServiceError::NotFound("authorization")));
    }

    #[test]
    fn regrant_after_revoke_restores_access() {
        let conn = open_memory_database().unwrap();
        let patient = seed_user(&conn, "p@example.test", Role::Patient);
        let doctor = seed_user(&conn, "d@example.test", Role::Doctor);
        let now = Utc::now();

        let grant = grant_access(&conn, &patient, "d@example.test", 7, now).unwrap();
        revoke_access(&conn, &patient, &grant.id).unwrap();
        grant_access(&conn, &patient, "d@example.test", 7, now).unwrap();

        assert!(check_access(&conn, &doctor, &patient, AccessMode::Write, now)
            .unwrap()
            .allowed);
    }

    #[test]
    fn list_grants_shows_revoked_history() {
        let conn = open_memory_database().unwrap();
        let patient = seed_user(&conn, "p@example.test", Role::Patient);
        seed_user(&conn, "d@example.test", Role::Doctor);

        let grant = grant_access(&conn, &patient, "d@example.test", 7, Utc::now()).unwrap();
        revoke_access(&conn, &patient, &grant.id).unwrap();

        let grants = list_grants(&conn, &patient).unwrap();
        assert_eq!(grants.len(), 1);
        assert!(!grants[0].is_active);
    }
}
