//! Laboratory-side workflow: worklist, status transitions, result upload.
//!
//! Result upload claims the test for the uploading laboratory
//! (first-come, exclusive): the stamp, the stored result and the forced
//! Completed status land in one conditional update, so two laboratories
//! racing on an unclaimed test can never both win.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use crate::access::{self, AccessMode};
use crate::audit;
use crate::db::repository::{lab_test as lab_repo, user as user_repo};
use crate::error::ServiceError;
use crate::models::enums::{Role, TestStatus};
use crate::models::{LabTest, User};

fn get_test(conn: &Connection, test_id: &Uuid) -> Result<LabTest, ServiceError> {
    lab_repo::get_lab_test(conn, test_id)?.ok_or(ServiceError::NotFound("lab test"))
}

fn get_test_patient(conn: &Connection, test: &LabTest) -> Result<User, ServiceError> {
    match user_repo::get_user(conn, &test.patient_id)? {
        Some(user) if user.role == Role::Patient => Ok(user),
        _ => Err(ServiceError::NotFound("patient")),
    }
}

/// Examinations visible to this laboratory: its own claimed tests plus
/// every unclaimed one, newest first.
pub fn worklist(conn: &Connection, lab: &User) -> Result<Vec<LabTest>, ServiceError> {
    Ok(lab_repo::list_worklist(conn, &lab.id)?)
}

/// Explicit status transition by the laboratory.
///
/// Any state may be set from any state; the machine constrains who may
/// move it, not which arrow: a test claimed by another laboratory is
/// untouchable.
pub fn set_status(
    conn: &Connection,
    lab: &User,
    test_id: &Uuid,
    status: TestStatus,
    now: DateTime<Utc>,
) -> Result<LabTest, ServiceError> {
    let test = get_test(conn, test_id)?;
    let patient = get_test_patient(conn, &test)?;
    access::require_access(conn, lab, &patient, AccessMode::Write, now)?;

    if !lab_repo::update_status(conn, test_id, status, &lab.id)? {
        return Err(ServiceError::InvalidState(
            "test is handled by another laboratory".into(),
        ));
    }
    get_test(conn, test_id)
}

/// Upload a result: claim the test and complete it in one step.
///
/// Whatever the prior status, a successful upload leaves the test
/// Completed with `performed_by` stamped to this laboratory. Losing the
/// claim race, or touching a test already owned elsewhere, answers
/// InvalidState and changes nothing.
pub fn upload_result(
    conn: &Connection,
    lab: &User,
    test_id: &Uuid,
    result_document: &str,
    now: DateTime<Utc>,
) -> Result<LabTest, ServiceError> {
    if result_document.trim().is_empty() {
        return Err(ServiceError::Validation("result document is required".into()));
    }

    let test = get_test(conn, test_id)?;
    let patient = get_test_patient(conn, &test)?;
    access::require_access(conn, lab, &patient, AccessMode::Write, now)?;

    if !lab_repo::claim_and_complete(conn, test_id, &lab.id, result_document.trim(), now)? {
        return Err(ServiceError::InvalidState(
            "test is handled by another laboratory".into(),
        ));
    }

    let details = format!("test={} patient={}", test_id, patient.id);
    audit::record(conn, Some(&lab.id), "lab_result_uploaded", Some(&details), None);

    get_test(conn, test_id)
}
