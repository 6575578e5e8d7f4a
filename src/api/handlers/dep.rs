//! Patient self-service: the own-dossier views.

use axum::extract::State;
use axum::{Extension, Json};

use crate::api::error::ApiError;
use crate::api::handlers::require_role;
use crate::api::types::{ApiContext, AuthUser};
use crate::clinical::{self, DepBundle};
use crate::models::enums::Role;
use crate::models::{LabTest, Prescription};

/// `GET /api/dep`: aggregated own dossier.
pub async fn consult(
    State(ctx): State<ApiContext>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<DepBundle>, ApiError> {
    require_role(&user, Role::Patient)?;
    let conn = ctx.core.db()?;
    Ok(Json(clinical::consult_own_dep(&conn, &user)?))
}

/// `GET /api/dep/prescriptions`
pub async fn prescriptions(
    State(ctx): State<ApiContext>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<Vec<Prescription>>, ApiError> {
    require_role(&user, Role::Patient)?;
    let conn = ctx.core.db()?;
    Ok(Json(clinical::list_own_prescriptions(&conn, &user)?))
}

/// `GET /api/dep/lab-tests`
pub async fn lab_tests(
    State(ctx): State<ApiContext>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<Vec<LabTest>>, ApiError> {
    require_role(&user, Role::Patient)?;
    let conn = ctx.core.db()?;
    Ok(Json(clinical::list_own_lab_tests(&conn, &user)?))
}
