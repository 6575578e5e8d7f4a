use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A consultation note recorded by a doctor. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicalNote {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    /// e.g. "120/80 mmHg"
    pub blood_pressure: Option<String>,
    pub temperature: Option<f64>,
    pub weight: Option<f64>,
    pub observation: String,
    pub diagnosis: Option<String>,
    pub created_at: DateTime<Utc>,
}
