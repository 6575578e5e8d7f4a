//! Dossier access authorization.
//!
//! Decides whether a professional may touch a patient's dossier:
//! 1. Actor must be a professional (Doctor or Laboratory) → else DENY
//! 2. A consent grant must exist for (patient, professional) → else DENY
//! 3. The grant must be active → else DENY
//! 4. The grant must not be past its expiry → else DENY
//! 5. Otherwise ALLOW: one valid grant covers both read and write.
//!
//! Default-deny, checked in order. Expiry is evaluated here, lazily, at
//! check time; nothing ever sweeps expired grants. Every decision, allow
//! or deny, lands in the audit trail.

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::audit;
use crate::db::repository::consent as consent_repo;
use crate::error::ServiceError;
use crate::models::User;

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// What the caller intends to do with the dossier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
}

impl AccessMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

/// Why access was granted (or denied), for the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessReason {
    /// A valid consent grant covers the pair.
    Granted,
    /// The actor is not a doctor or laboratory.
    NotProfessional,
    /// No grant exists for this (patient, professional) pair.
    NoGrant,
    /// The grant was revoked by the patient.
    Inactive,
    /// The grant's expiry has passed.
    Expired,
}

impl AccessReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::NotProfessional => "not_professional",
            Self::NoGrant => "no_grant",
            Self::Inactive => "inactive",
            Self::Expired => "expired",
        }
    }
}

/// Result of an authorization check.
#[derive(Debug, Clone)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: AccessReason,
}

impl AccessDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: AccessReason::Granted,
        }
    }

    fn deny(reason: AccessReason) -> Self {
        Self {
            allowed: false,
            reason,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Authorization check
// ═══════════════════════════════════════════════════════════

/// Check whether `professional` may access `patient`'s dossier.
///
/// Read and write go through the same validity test; a valid grant
/// authorizes both. The caller supplies `now` so expiry evaluation stays
/// deterministic under test.
///
/// Side effect: exactly one audit entry per call, allow or deny.
pub fn check_access(
    conn: &Connection,
    professional: &User,
    patient: &User,
    mode: AccessMode,
    now: DateTime<Utc>,
) -> Result<AccessDecision, ServiceError> {
    let decision = evaluate(conn, professional, patient, now)?;

    let action = if decision.allowed {
        "dep_access_allowed"
    } else {
        "dep_access_denied"
    };
    let details = format!(
        "patient={} mode={} reason={}",
        patient.id,
        mode.as_str(),
        decision.reason.as_str()
    );
    audit::record(conn, Some(&professional.id), action, Some(&details), None);

    Ok(decision)
}

fn evaluate(
    conn: &Connection,
    professional: &User,
    patient: &User,
    now: DateTime<Utc>,
) -> Result<AccessDecision, ServiceError> {
    // Rule 1: only professionals go through the consent ledger.
    if !professional.role.is_professional() {
        return Ok(AccessDecision::deny(AccessReason::NotProfessional));
    }

    // Rule 2: the pair must have a grant at all.
    let grant = match consent_repo::get_grant_for_pair(conn, &patient.id, &professional.id)? {
        Some(grant) => grant,
        None => return Ok(AccessDecision::deny(AccessReason::NoGrant)),
    };

    // Rules 3-4: revoked beats expired in the reported reason.
    if !grant.is_active {
        return Ok(AccessDecision::deny(AccessReason::Inactive));
    }
    if let Some(expires_at) = grant.expires_at {
        if expires_at <= now {
            return Ok(AccessDecision::deny(AccessReason::Expired));
        }
    }

    Ok(AccessDecision::allow())
}

/// Run the check and turn a deny into `ServiceError::AccessDenied`.
///
/// The gate used by every clinical write path: on deny the caller bails
/// out before creating any record.
pub fn require_access(
    conn: &Connection,
    professional: &User,
    patient: &User,
    mode: AccessMode,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    let decision = check_access(conn, professional, patient, mode, now)?;
    if decision.allowed {
        Ok(())
    } else {
        Err(ServiceError::AccessDenied(
            decision.reason.as_str().to_string(),
        ))
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::audit::count_entries;
    use crate::db::repository::consent::{deactivate_grant, upsert_grant};
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::Role;
    use crate::testutil::seed_user;
    use chrono::Duration;

    // ── Rule 1: professional role ────────────────────────

    #[test]
    fn patient_actor_is_denied() {
        let conn = open_memory_database().unwrap();
        let actor = seed_user(&conn, "a@example.test", Role::Patient);
        let patient = seed_user(&conn, "p@example.test", Role::Patient);

        let decision =
            check_access(&conn, &actor, &patient, AccessMode::Read, Utc::now()).unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.reason, AccessReason::NotProfessional);
    }

    #[test]
    fn admin_actor_is_denied() {
        let conn = open_memory_database().unwrap();
        let actor = seed_user(&conn, "a@example.test", Role::Admin);
        let patient = seed_user(&conn, "p@example.test", Role::Patient);

        let decision =
            check_access(&conn, &actor, &patient, AccessMode::Write, Utc::now()).unwrap();
        assert_eq!(decision.reason, AccessReason::NotProfessional);
    }

    // ── Rule 2: grant existence ──────────────────────────

    #[test]
    fn no_grant_is_denied() {
        let conn = open_memory_database().unwrap();
        let doctor = seed_user(&conn, "d@example.test", Role::Doctor);
        let patient = seed_user(&conn, "p@example.test", Role::Patient);

        let decision =
            check_access(&conn, &doctor, &patient, AccessMode::Read, Utc::now()).unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.reason, AccessReason::NoGrant);
    }

    #[test]
    fn grants_are_unidirectional_per_pair() {
        let conn = open_memory_database().unwrap();
        let doctor = seed_user(&conn, "d@example.test", Role::Doctor);
        let patient = seed_user(&conn, "p@example.test", Role::Patient);
        let other = seed_user(&conn, "o@example.test", Role::Patient);
        let now = Utc::now();

        upsert_grant(&conn, &patient.id, &doctor.id, now, None).unwrap();

        // Grant covers (patient, doctor) only, not other patients.
        assert!(check_access(&conn, &doctor, &patient, AccessMode::Read, now)
            .unwrap()
            .allowed);
        assert_eq!(
            check_access(&conn, &doctor, &other, AccessMode::Read, now)
                .unwrap()
                .reason,
            AccessReason::NoGrant
        );
    }

    // ── Rules 3-4: validity ──────────────────────────────

    #[test]
    fn revoked_grant_is_denied_inactive() {
        let conn = open_memory_database().unwrap();
        let doctor = seed_user(&conn, "d@example.test", Role::Doctor);
        let patient = seed_user(&conn, "p@example.test", Role::Patient);
        let now = Utc::now();

        let grant =
            upsert_grant(&conn, &patient.id, &doctor.id, now, Some(now + Duration::days(7)))
                .unwrap();
        deactivate_grant(&conn, &grant.id, &patient.id).unwrap();

        let decision = check_access(&conn, &doctor, &patient, AccessMode::Read, now).unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.reason, AccessReason::Inactive);
    }

    #[test]
    fn expired_grant_is_denied_even_when_active() {
        let conn = open_memory_database().unwrap();
        let doctor = seed_user(&conn, "d@example.test", Role::Doctor);
        let patient = seed_user(&conn, "p@example.test", Role::Patient);
        let now = Utc::now();

        upsert_grant(&conn, &patient.id, &doctor.id, now - Duration::days(10),
            Some(now - Duration::days(3)))
        .unwrap();

        let decision = check_access(&conn, &doctor, &patient, AccessMode::Write, now).unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.reason, AccessReason::Expired);
    }

    #[test]
    fn expiry_is_evaluated_at_check_time() {
        let conn = open_memory_database().unwrap();
        let doctor = seed_user(&conn, "d@example.test", Role::Doctor);
        let patient = seed_user(&conn, "p@example.test", Role::Patient);
        let now = Utc::now();

        upsert_grant(&conn, &patient.id, &doctor.id, now, Some(now + Duration::days(7))).unwrap();

        // Same row: valid today, expired when "now" moves past the window.
        assert!(check_access(&conn, &doctor, &patient, AccessMode::Read, now)
            .unwrap()
            .allowed);
        let later = now + Duration::days(8);
        assert_eq!(
            check_access(&conn, &doctor, &patient, AccessMode::Read, later)
                .unwrap()
                .reason,
            AccessReason::Expired
        );
    }

    // ── Rule 5: allow, same predicate for both modes ─────

    #[test]
    fn valid_grant_allows_read_and_write() {
        let conn = open_memory_database().unwrap();
        let lab = seed_user(&conn, "l@example.test", Role::Laboratory);
        let patient = seed_user(&conn, "p@example.test", Role::Patient);
        let now = Utc::now();

        upsert_grant(&conn, &patient.id, &lab.id, now, Some(now + Duration::days(7))).unwrap();

        for mode in [AccessMode::Read, AccessMode::Write] {
            let decision = check_access(&conn, &lab, &patient, mode, now).unwrap();
            assert!(decision.allowed, "mode {mode:?} should be allowed");
            assert_eq!(decision.reason, AccessReason::Granted);
        }
    }

    // ── Audit side effect ────────────────────────────────

    #[test]
    fn every_decision_writes_exactly_one_audit_entry() {
        let conn = open_memory_database().unwrap();
        let doctor = seed_user(&conn, "d@example.test", Role::Doctor);
        let patient = seed_user(&conn, "p@example.test", Role::Patient);
        let now = Utc::now();

        check_access(&conn, &doctor, &patient, AccessMode::Read, now).unwrap();
        assert_eq!(count_entries(&conn, "dep_access_denied").unwrap(), 1);
        assert_eq!(count_entries(&conn, "dep_access_allowed").unwrap(), 0);

        upsert_grant(&conn, &patient.id, &doctor.id, now, None).unwrap();
        check_access(&conn, &doctor, &patient, AccessMode::Read, now).unwrap();
        assert_eq!(count_entries(&conn, "dep_access_allowed").unwrap(), 1);
        assert_eq!(count_entries(&conn, "dep_access_denied").unwrap(), 1);
    }

    #[test]
    fn require_access_maps_deny_to_access_denied() {
        let conn = open_memory_database().unwrap();
        let doctor = seed_user(&conn, "d@example.test", Role::Doctor);
        let patient = seed_user(&conn, "p@example.test", Role::Patient);

        let err = require_access(&conn, &doctor, &patient, AccessMode::Write, Utc::now())
            .unwrap_err();
        match err {
            ServiceError::AccessDenied(reason) => assert_eq!(reason, "no_grant"),
            other => panic!("Expected AccessDenied, got: {other}"),
        }
    }
}
