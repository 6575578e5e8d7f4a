use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::{parse_uuid, DatabaseError};
use crate::models::Prescription;

struct PrescriptionRow {
    id: String,
    patient_id: String,
    doctor_id: String,
    medication_details: String,
    document_ref: Option<String>,
    created_at: DateTime<Utc>,
}

fn read_prescription_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PrescriptionRow> {
    Ok(PrescriptionRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        medication_details: row.get(3)?,
        document_ref: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn prescription_from_row(row: PrescriptionRow) -> Result<Prescription, DatabaseError> {
    Ok(Prescription {
        id: parse_uuid("prescriptions.id", &row.id)?,
        patient_id: parse_uuid("prescriptions.patient_id", &row.patient_id)?,
        doctor_id: parse_uuid("prescriptions.doctor_id", &row.doctor_id)?,
        medication_details: row.medication_details,
        document_ref: row.document_ref,
        created_at: row.created_at,
    })
}

pub fn insert_prescription(
    conn: &Connection,
    prescription: &Prescription,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO prescriptions (id, patient_id, doctor_id, medication_details, document_ref, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            prescription.id.to_string(),
            prescription.patient_id.to_string(),
            prescription.doctor_id.to_string(),
            prescription.medication_details,
            prescription.document_ref,
            prescription.created_at,
        ],
    )?;
    Ok(())
}

pub fn list_prescriptions_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Prescription>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, doctor_id, medication_details, document_ref, created_at
         FROM prescriptions WHERE patient_id = ?1 ORDER BY created_at DESC",
    )?;
    let rows = stmt
        .query_map(params![patient_id.to_string()], read_prescription_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(prescription_from_row).collect()
}
