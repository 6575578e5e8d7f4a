//! Consent ledger endpoints and the professional check-and-consult path.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::handlers::{require_professional, require_role};
use crate::api::types::{ApiContext, AuthUser, CheckQuery, DetailResponse, GrantRequest};
use crate::clinical::{self, DepBundle};
use crate::consent;
use crate::models::enums::Role;
use crate::models::ConsentGrant;

/// `GET /api/access/grants`: the patient's own ledger.
pub async fn list_grants(
    State(ctx): State<ApiContext>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<Vec<ConsentGrant>>, ApiError> {
    require_role(&user, Role::Patient)?;
    let conn = ctx.core.db()?;
    Ok(Json(consent::list_grants(&conn, &user)?))
}

/// `POST /api/access/grant`
pub async fn grant(
    State(ctx): State<ApiContext>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(req): Json<GrantRequest>,
) -> Result<(StatusCode, Json<ConsentGrant>), ApiError> {
    require_role(&user, Role::Patient)?;
    let conn = ctx.core.db()?;
    let grant = consent::grant_access(
        &conn,
        &user,
        &req.professional_email,
        req.expiration_days,
        Utc::now(),
    )?;
    Ok((StatusCode::CREATED, Json(grant)))
}

/// `POST /api/access/:id/revoke`
pub async fn revoke(
    State(ctx): State<ApiContext>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(grant_id): Path<Uuid>,
) -> Result<Json<DetailResponse>, ApiError> {
    require_role(&user, Role::Patient)?;
    let conn = ctx.core.db()?;
    consent::revoke_access(&conn, &user, &grant_id)?;
    Ok(Json(DetailResponse {
        detail: "access revoked",
    }))
}

/// `GET /api/access/check?patient_id=...`: allow returns the full
/// dossier dump, deny returns 403.
pub async fn check_and_consult(
    State(ctx): State<ApiContext>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Query(query): Query<CheckQuery>,
) -> Result<Json<DepBundle>, ApiError> {
    require_professional(&user)?;
    let conn = ctx.core.db()?;
    Ok(Json(clinical::check_and_consult(
        &conn,
        &user,
        &query.patient_id,
        Utc::now(),
    )?))
}
