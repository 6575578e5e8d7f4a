//! Doctor-side clinical writes. All of them run the authorization gate
//! with write intent before any row is created.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::handlers::require_role;
use crate::api::types::{
    ApiContext, AuthUser, CreateNoteRequest, CreatePrescriptionRequest, InterpretRequest,
    OrderLabTestRequest,
};
use crate::clinical;
use crate::models::enums::Role;
use crate::models::{ClinicalNote, LabTest, Prescription};

/// `POST /api/doctor/notes`
pub async fn add_note(
    State(ctx): State<ApiContext>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(req): Json<CreateNoteRequest>,
) -> Result<(StatusCode, Json<ClinicalNote>), ApiError> {
    require_role(&user, Role::Doctor)?;
    let conn = ctx.core.db()?;
    let note = clinical::add_note(&conn, &user, &req.patient_id, &req.note, Utc::now())?;
    Ok((StatusCode::CREATED, Json(note)))
}

/// `POST /api/doctor/prescriptions`
pub async fn create_prescription(
    State(ctx): State<ApiContext>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(req): Json<CreatePrescriptionRequest>,
) -> Result<(StatusCode, Json<Prescription>), ApiError> {
    require_role(&user, Role::Doctor)?;
    let conn = ctx.core.db()?;
    let prescription = clinical::create_prescription(
        &conn,
        &user,
        &req.patient_id,
        &req.prescription,
        Utc::now(),
    )?;
    Ok((StatusCode::CREATED, Json(prescription)))
}

/// `POST /api/doctor/lab-tests`
pub async fn order_lab_test(
    State(ctx): State<ApiContext>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(req): Json<OrderLabTestRequest>,
) -> Result<(StatusCode, Json<LabTest>), ApiError> {
    require_role(&user, Role::Doctor)?;
    let conn = ctx.core.db()?;
    let test = clinical::order_lab_test(&conn, &user, &req.patient_id, &req.order, Utc::now())?;
    Ok((StatusCode::CREATED, Json(test)))
}

/// `PATCH /api/doctor/lab-tests/:id/interpret`
pub async fn interpret_lab_result(
    State(ctx): State<ApiContext>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(test_id): Path<Uuid>,
    Json(req): Json<InterpretRequest>,
) -> Result<Json<LabTest>, ApiError> {
    require_role(&user, Role::Doctor)?;
    let conn = ctx.core.db()?;
    let test =
        clinical::interpret_lab_result(&conn, &user, &test_id, &req.interpretation, Utc::now())?;
    Ok(Json(test))
}
