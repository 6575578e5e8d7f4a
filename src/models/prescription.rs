use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An order issued by a doctor. Immutable once created; `document_ref`
/// points at an externally stored rendering, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub medication_details: String,
    pub document_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}
