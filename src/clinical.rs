//! Dossier aggregation and doctor-side clinical writes.
//!
//! Every professional write runs the authorization gate before touching
//! the store: on deny nothing is created, on allow exactly one record is
//! written and attributed to the acting professional.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access::{self, AccessMode};
use crate::db::repository::{
    clinical_note as note_repo, lab_test as lab_repo, prescription as prescription_repo,
    user as user_repo,
};
use crate::error::ServiceError;
use crate::models::enums::{Role, TestStatus};
use crate::models::{ClinicalNote, LabTest, Prescription, User};

// ═══════════════════════════════════════════════════════════
// Inputs and aggregates
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct NoteInput {
    #[serde(default)]
    pub blood_pressure: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub weight: Option<f64>,
    pub observation: String,
    #[serde(default)]
    pub diagnosis: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrescriptionInput {
    pub medication_details: String,
    #[serde(default)]
    pub document_ref: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabOrderInput {
    pub test_name: String,
    #[serde(default)]
    pub details: Option<String>,
}

/// The aggregated dossier (notes + prescriptions + lab results).
#[derive(Debug, Serialize)]
pub struct DepBundle {
    pub patient_id: Uuid,
    pub patient_name: String,
    pub clinical_notes: Vec<ClinicalNote>,
    pub prescriptions: Vec<Prescription>,
    pub lab_results: Vec<LabTest>,
}

/// Resolve a patient by id; a missing row and a wrong role are the same
/// NotFound.
fn get_patient(conn: &Connection, patient_id: &Uuid) -> Result<User, ServiceError> {
    match user_repo::get_user(conn, patient_id)? {
        Some(user) if user.role == Role::Patient => Ok(user),
        _ => Err(ServiceError::NotFound("patient")),
    }
}

// ═══════════════════════════════════════════════════════════
// Patient self-service
// ═══════════════════════════════════════════════════════════

/// The patient's own view of their dossier. Only completed lab tests
/// appear here; pending work stays on the laboratory side.
pub fn consult_own_dep(conn: &Connection, patient: &User) -> Result<DepBundle, ServiceError> {
    Ok(DepBundle {
        patient_id: patient.id,
        patient_name: patient.name.clone(),
        clinical_notes: note_repo::list_notes_for_patient(conn, &patient.id)?,
        prescriptions: prescription_repo::list_prescriptions_for_patient(conn, &patient.id)?,
        lab_results: lab_repo::list_completed_tests_for_patient(conn, &patient.id)?,
    })
}

pub fn list_own_prescriptions(
    conn: &Connection,
    patient: &User,
) -> Result<Vec<Prescription>, ServiceError> {
    Ok(prescription_repo::list_prescriptions_for_patient(conn, &patient.id)?)
}

pub fn list_own_lab_tests(conn: &Connection, patient: &User) -> Result<Vec<LabTest>, ServiceError> {
    Ok(lab_repo::list_tests_for_patient(conn, &patient.id)?)
}

// ═══════════════════════════════════════════════════════════
// Professional read path
// ═══════════════════════════════════════════════════════════

/// Authorization check plus dossier dump in one step: a professional with
/// a valid grant gets the full aggregate, everyone else gets AccessDenied.
pub fn check_and_consult(
    conn: &Connection,
    professional: &User,
    patient_id: &Uuid,
    now: DateTime<Utc>,
) -> Result<DepBundle, ServiceError> {
    let patient = get_patient(conn, patient_id)?;
    access::require_access(conn, professional, &patient, AccessMode::Read, now)?;

    Ok(DepBundle {
        patient_id: patient.id,
        patient_name: patient.name.clone(),
        clinical_notes: note_repo::list_notes_for_patient(conn, &patient.id)?,
        prescriptions: prescription_repo::list_prescriptions_for_patient(conn, &patient.id)?,
        lab_results: lab_repo::list_tests_for_patient(conn, &patient.id)?,
    })
}

// ═══════════════════════════════════════════════════════════
// Gated doctor writes
// ═══════════════════════════════════════════════════════════

pub fn add_note(
    conn: &Connection,
    doctor: &User,
    patient_id: &Uuid,
    input: &NoteInput,
    now: DateTime<Utc>,
) -> Result<ClinicalNote, ServiceError> {
    if input.observation.trim().is_empty() {
        return Err(ServiceError::Validation("observation is required".into()));
    }
    let patient = get_patient(conn, patient_id)?;
    access::require_access(conn, doctor, &patient, AccessMode::Write, now)?;

    let note = ClinicalNote {
        id: Uuid::new_v4(),
        patient_id: patient.id,
        doctor_id: doctor.id,
        blood_pressure: input.blood_pressure.clone(),
        temperature: input.temperature,
        weight: input.weight,
        observation: input.observation.trim().to_string(),
        diagnosis: input.diagnosis.clone(),
        created_at: now,
    };
    note_repo::insert_note(conn, &note)?;
    Ok(note)
}

pub fn create_prescription(
    conn: &Connection,
    doctor: &User,
    patient_id: &Uuid,
    input: &PrescriptionInput,
    now: DateTime<Utc>,
) -> Result<Prescription, ServiceError> {
    if input.medication_details.trim().is_empty() {
        return Err(ServiceError::Validation(
            "medication_details is required".into(),
        ));
    }
    let patient = get_patient(conn, patient_id)?;
    access::require_access(conn, doctor, &patient, AccessMode::Write, now)?;

    let prescription = Prescription {
        id: Uuid::new_v4(),
        patient_id: patient.id,
        doctor_id: doctor.id,
        medication_details: input.medication_details.trim().to_string(),
        document_ref: input.document_ref.clone(),
        created_at: now,
    };
    prescription_repo::insert_prescription(conn, &prescription)?;
    Ok(prescription)
}

/// Order a new examination: created pending and unclaimed, ready for a
/// laboratory to pick up from its worklist.
pub fn order_lab_test(
    conn: &Connection,
    doctor: &User,
    patient_id: &Uuid,
    input: &LabOrderInput,
    now: DateTime<Utc>,
) -> Result<LabTest, ServiceError> {
    if input.test_name.trim().is_empty() {
        return Err(ServiceError::Validation("test_name is required".into()));
    }
    let patient = get_patient(conn, patient_id)?;
    access::require_access(conn, doctor, &patient, AccessMode::Write, now)?;

    let test = LabTest {
        id: Uuid::new_v4(),
        patient_id: patient.id,
        prescribed_by: Some(doctor.id),
        performed_by: None,
        test_name: input.test_name.trim().to_string(),
        details: input.details.clone(),
        status: TestStatus::Pending,
        result_document: None,
        result_uploaded_at: None,
        interpretation: None,
        interpreted_by: None,
        created_at: now,
    };
    lab_repo::insert_lab_test(conn, &test)?;
    Ok(test)
}

/// Attach the doctor's reading of a result. Works at any status,
/// including Completed, and never moves the status itself.
pub fn interpret_lab_result(
    conn: &Connection,
    doctor: &User,
    test_id: &Uuid,
    interpretation: &str,
    now: DateTime<Utc>,
) -> Result<LabTest, ServiceError> {
    if interpretation.trim().is_empty() {
        return Err(ServiceError::Validation("interpretation is required".into()));
    }
    let test =
        lab_repo::get_lab_test(conn, test_id)?.ok_or(ServiceError::NotFound("lab test"))?;
    let patient = get_patient(conn, &test.patient_id)?;
    access::require_access(conn, doctor, &patient, AccessMode::Write, now)?;

    lab_repo::update_interpretation(conn, test_id, &doctor.id, interpretation.trim())?;
    lab_repo::get_lab_test(conn, test_id)?.ok_or(ServiceError::NotFound("lab test"))
}
