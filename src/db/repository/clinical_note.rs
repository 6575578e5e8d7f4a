use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::{parse_uuid, DatabaseError};
use crate::models::ClinicalNote;

const NOTE_COLUMNS: &str = "id, patient_id, doctor_id, blood_pressure, temperature, weight, observation, diagnosis, created_at";

struct NoteRow {
    id: String,
    patient_id: String,
    doctor_id: String,
    blood_pressure: Option<String>,
    temperature: Option<f64>,
    weight: Option<f64>,
    observation: String,
    diagnosis: Option<String>,
    created_at: DateTime<Utc>,
}

fn read_note_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<NoteRow> {
    Ok(NoteRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        blood_pressure: row.get(3)?,
        temperature: row.get(4)?,
        weight: row.get(5)?,
        observation: row.get(6)?,
        diagnosis: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn note_from_row(row: NoteRow) -> Result<ClinicalNote, DatabaseError> {
    Ok(ClinicalNote {
        id: parse_uuid("clinical_notes.id", &row.id)?,
        patient_id: parse_uuid("clinical_notes.patient_id", &row.patient_id)?,
        doctor_id: parse_uuid("clinical_notes.doctor_id", &row.doctor_id)?,
        blood_pressure: row.blood_pressure,
        temperature: row.temperature,
        weight: row.weight,
        observation: row.observation,
        diagnosis: row.diagnosis,
        created_at: row.created_at,
    })
}

pub fn insert_note(conn: &Connection, note: &ClinicalNote) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO clinical_notes (id, patient_id, doctor_id, blood_pressure, temperature,
         weight, observation, diagnosis, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            note.id.to_string(),
            note.patient_id.to_string(),
            note.doctor_id.to_string(),
            note.blood_pressure,
            note.temperature,
            note.weight,
            note.observation,
            note.diagnosis,
            note.created_at,
        ],
    )?;
    Ok(())
}

pub fn list_notes_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<ClinicalNote>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {NOTE_COLUMNS} FROM clinical_notes
         WHERE patient_id = ?1 ORDER BY created_at DESC"
    ))?;
    let rows = stmt
        .query_map(params![patient_id.to_string()], read_note_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(note_from_row).collect()
}
