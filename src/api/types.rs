//! Shared types for the API layer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core_state::CoreState;
use crate::models::User;

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

/// Authenticated user, injected into request extensions by the auth
/// middleware. The (identity, role) pairing is trusted downstream.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

// ═══════════════════════════════════════════════════════════
// Request bodies
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

fn default_expiration_days() -> i64 {
    7
}

#[derive(Debug, Deserialize)]
pub struct GrantRequest {
    pub professional_email: String,
    #[serde(default = "default_expiration_days")]
    pub expiration_days: i64,
}

#[derive(Debug, Deserialize)]
pub struct CheckQuery {
    pub patient_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub patient_id: Uuid,
    #[serde(flatten)]
    pub note: crate::clinical::NoteInput,
}

#[derive(Debug, Deserialize)]
pub struct CreatePrescriptionRequest {
    pub patient_id: Uuid,
    #[serde(flatten)]
    pub prescription: crate::clinical::PrescriptionInput,
}

#[derive(Debug, Deserialize)]
pub struct OrderLabTestRequest {
    pub patient_id: Uuid,
    #[serde(flatten)]
    pub order: crate::clinical::LabOrderInput,
}

#[derive(Debug, Deserialize)]
pub struct InterpretRequest {
    pub interpretation: String,
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadResultRequest {
    pub result_document: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct DetailResponse {
    pub detail: &'static str,
}
