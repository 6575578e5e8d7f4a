//! Laboratory-side endpoints: worklist, status, result upload.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use chrono::Utc;
use std::str::FromStr;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::handlers::require_role;
use crate::api::types::{ApiContext, AuthUser, SetStatusRequest, UploadResultRequest};
use crate::lab;
use crate::models::enums::{Role, TestStatus};
use crate::models::LabTest;

/// `GET /api/labo/tests`
pub async fn worklist(
    State(ctx): State<ApiContext>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<Vec<LabTest>>, ApiError> {
    require_role(&user, Role::Laboratory)?;
    let conn = ctx.core.db()?;
    Ok(Json(lab::worklist(&conn, &user)?))
}

/// `PATCH /api/labo/tests/:id/status`
pub async fn set_status(
    State(ctx): State<ApiContext>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(test_id): Path<Uuid>,
    Json(req): Json<SetStatusRequest>,
) -> Result<Json<LabTest>, ApiError> {
    require_role(&user, Role::Laboratory)?;
    let status = TestStatus::from_str(&req.status)
        .map_err(|_| ApiError::BadRequest("invalid status".into()))?;

    let conn = ctx.core.db()?;
    let test = lab::set_status(&conn, &user, &test_id, status, Utc::now())?;
    Ok(Json(test))
}

/// `POST /api/labo/tests/:id/result`: claim and complete.
pub async fn upload_result(
    State(ctx): State<ApiContext>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(test_id): Path<Uuid>,
    Json(req): Json<UploadResultRequest>,
) -> Result<Json<LabTest>, ApiError> {
    require_role(&user, Role::Laboratory)?;
    let conn = ctx.core.db()?;
    let test = lab::upload_result(&conn, &user, &test_id, &req.result_document, Utc::now())?;
    Ok(Json(test))
}
