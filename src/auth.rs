//! Opaque bearer-token authentication.
//!
//! Tokens are 32 random bytes, URL-safe base64 on the wire, SHA-256
//! hashed at rest. Authentication resolves a token to a verified
//! (identity, role) pair; everything downstream trusts that pairing and
//! never re-derives role from credentials.

use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use sha2::{Digest, Sha256};

use crate::audit;
use crate::config::TOKEN_TTL_HOURS;
use crate::db::repository::{session as session_repo, user as user_repo};
use crate::db::repository::session::SessionRow;
use crate::error::ServiceError;
use crate::identity::verify_password;
use crate::models::User;

/// Generate a random bearer token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Hash a bearer token for storage and lookup.
pub fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest)
}

/// Verify credentials and issue a token.
///
/// Unknown email and wrong password answer identically, so login cannot
/// be used to probe which addresses are registered. Professionals whose
/// account has not been validated yet cannot log in.
pub fn login(
    conn: &Connection,
    email: &str,
    password: &str,
    origin: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(String, User), ServiceError> {
    // Opportunistic sweep; dead sessions have no other reaper.
    session_repo::delete_expired_sessions(conn, now)?;

    let user = user_repo::get_user_by_email(conn, email)?
        .ok_or_else(|| ServiceError::AccessDenied("invalid credentials".into()))?;
    let stored = user_repo::get_password_hash(conn, &user.id)?
        .ok_or_else(|| ServiceError::AccessDenied("invalid credentials".into()))?;
    if !verify_password(password, &stored) {
        return Err(ServiceError::AccessDenied("invalid credentials".into()));
    }
    if !user.is_active {
        return Err(ServiceError::AccessDenied(
            "account awaiting validation".into(),
        ));
    }

    let token = generate_token();
    session_repo::insert_session(
        conn,
        &SessionRow {
            token_hash: hash_token(&token),
            user_id: user.id,
            created_at: now,
            expires_at: now + Duration::hours(TOKEN_TTL_HOURS),
        },
    )?;

    audit::record(conn, Some(&user.id), "login", None, origin);

    Ok((token, user))
}

/// Resolve a bearer token to its user.
///
/// Expired tokens are dropped on sight; a token whose account has been
/// deactivated since login stops working immediately.
pub fn authenticate(
    conn: &Connection,
    token: &str,
    now: DateTime<Utc>,
) -> Result<User, ServiceError> {
    let session = session_repo::get_session(conn, &hash_token(token))?
        .ok_or_else(|| ServiceError::AccessDenied("invalid token".into()))?;

    if session.expires_at <= now {
        session_repo::delete_session(conn, &session.token_hash)?;
        return Err(ServiceError::AccessDenied("token expired".into()));
    }

    let user = user_repo::get_user(conn, &session.user_id)?
        .ok_or_else(|| ServiceError::AccessDenied("invalid token".into()))?;
    if !user.is_active {
        return Err(ServiceError::AccessDenied("account deactivated".into()));
    }

    Ok(user)
}

/// Drop the session behind a token. Unknown tokens are a no-op.
pub fn logout(conn: &Connection, token: &str) -> Result<(), ServiceError> {
    session_repo::delete_session(conn, &hash_token(token))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::audit::count_entries;
    use crate::db::repository::user::set_user_active;
    use crate::db::sqlite::open_memory_database;
    use crate::identity::{register_doctor, register_patient, NewDoctorInput, NewPatientInput, NewUserInput};
    use crate::models::enums::Role;

    fn register(conn: &Connection, email: &str) -> User {
        register_patient(
            conn,
            &NewPatientInput {
                user: NewUserInput {
                    email: email.to_string(),
                    name: "Koffi".to_string(),
                    forename: "Aya".to_string(),
                    phone: None,
                    date_of_birth: None,
                    gender: "F".to_string(),
                    address: None,
                    password: "correct horse".to_string(),
                    password_confirm: "correct horse".to_string(),
                },
                blood_group: "A+".to_string(),
                genotype: None,
                diseases: None,
                allergies: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn login_issues_a_working_token() {
        let conn = open_memory_database().unwrap();
        let user = register(&conn, "p@example.test");
        let now = Utc::now();

        let (token, logged_in) = login(&conn, "p@example.test", "correct horse", None, now).unwrap();
        assert_eq!(logged_in.id, user.id);
        assert_eq!(count_entries(&conn, "login").unwrap(), 1);

        let resolved = authenticate(&conn, &token, now).unwrap();
        assert_eq!(resolved.id, user.id);
        assert_eq!(resolved.role, Role::Patient);
    }

    #[test]
    fn wrong_password_and_unknown_email_answer_identically() {
        let conn = open_memory_database().unwrap();
        register(&conn, "p@example.test");
        let now = Utc::now();

        let bad_pass = login(&conn, "p@example.test", "nope nope", None, now).unwrap_err();
        let bad_mail = login(&conn, "ghost@example.test", "nope nope", None, now).unwrap_err();
        assert_eq!(bad_pass.to_string(), bad_mail.to_string());
    }

    #[test]
    fn pending_professional_cannot_login() {
        let conn = open_memory_database().unwrap();
        register_doctor(
            &conn,
            &NewDoctorInput {
                user: NewUserInput {
                    email: "doc@example.test".to_string(),
                    name: "Koffi".to_string(),
                    forename: "Aya".to_string(),
                    phone: None,
                    date_of_birth: None,
                    gender: "M".to_string(),
                    address: None,
                    password: "correct horse".to_string(),
                    password_confirm: "correct horse".to_string(),
                },
                hospital: None,
            },
            Utc::now(),
        )
        .unwrap();

        let err = login(&conn, "doc@example.test", "correct horse", None, Utc::now()).unwrap_err();
        assert!(err.to_string().contains("awaiting validation"));
    }

    #[test]
    fn expired_token_is_rejected_and_dropped() {
        let conn = open_memory_database().unwrap();
        register(&conn, "p@example.test");
        let now = Utc::now();

        let (token, _) = login(&conn, "p@example.test", "correct horse", None, now).unwrap();
        let later = now + Duration::hours(TOKEN_TTL_HOURS + 1);

        let err = authenticate(&conn, &token, later).unwrap_err();
        assert!(err.to_string().contains("expired"));

        // Session row is gone; the token stays dead even "before" expiry.
        let err = authenticate(&conn, &token, now).unwrap_err();
        assert!(err.to_string().contains("invalid token"));
    }

    #[test]
    fn deactivated_account_loses_its_sessions() {
        let conn = open_memory_database().unwrap();
        let user = register(&conn, "p@example.test");
        let now = Utc::now();
        let (token, _) = login(&conn, "p@example.test", "correct horse", None, now).unwrap();

        set_user_active(&conn, &user.id, false, now).unwrap();

        let err = authenticate(&conn, &token, now).unwrap_err();
        assert!(err.to_string().contains("deactivated"));
    }

    #[test]
    fn logout_invalidates_the_token() {
        let conn = open_memory_database().unwrap();
        register(&conn, "p@example.test");
        let now = Utc::now();
        let (token, _) = login(&conn, "p@example.test", "correct horse", None, now).unwrap();

        logout(&conn, &token).unwrap();
        assert!(authenticate(&conn, &token, now).is_err());

        // Idempotent.
        logout(&conn, &token).unwrap();
    }
}
