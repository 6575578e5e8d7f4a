use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::TestStatus;

/// A laboratory examination and its result.
///
/// `performed_by` is first-claim: it is stamped when a laboratory uploads
/// the result, and from then on only that laboratory may touch the test.
/// Status, result fields and the doctor's interpretation are the only
/// mutable parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabTest {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub prescribed_by: Option<Uuid>,
    pub performed_by: Option<Uuid>,
    pub test_name: String,
    pub details: Option<String>,
    pub status: TestStatus,
    pub result_document: Option<String>,
    pub result_uploaded_at: Option<DateTime<Utc>>,
    pub interpretation: Option<String>,
    pub interpreted_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
