//! Administration: account management and the audit trail.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use chrono::Utc;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::handlers::require_role;
use crate::api::types::{ApiContext, AuthUser, DetailResponse};
use crate::audit;
use crate::identity;
use crate::models::enums::Role;
use crate::models::{AuditLogEntry, User};

/// `GET /api/admin/users`
pub async fn list_users(
    State(ctx): State<ApiContext>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<Vec<User>>, ApiError> {
    require_role(&user, Role::Admin)?;
    let conn = ctx.core.db()?;
    Ok(Json(identity::list_users(&conn)?))
}

/// `DELETE /api/admin/users/:id`
pub async fn delete_user(
    State(ctx): State<ApiContext>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<DetailResponse>, ApiError> {
    require_role(&user, Role::Admin)?;
    let conn = ctx.core.db()?;
    identity::delete_user(&conn, &user, &user_id)?;
    Ok(Json(DetailResponse {
        detail: "user deleted",
    }))
}

/// `GET /api/admin/pending-professionals`
pub async fn pending_professionals(
    State(ctx): State<ApiContext>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<Vec<User>>, ApiError> {
    require_role(&user, Role::Admin)?;
    let conn = ctx.core.db()?;
    Ok(Json(identity::pending_professionals(&conn)?))
}

/// `PATCH /api/admin/professionals/:id/activate`
pub async fn activate_professional(
    State(ctx): State<ApiContext>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
    require_role(&user, Role::Admin)?;
    let conn = ctx.core.db()?;
    let activated = identity::activate_professional(&conn, &user, &user_id, Utc::now())?;
    Ok(Json(activated))
}

/// `GET /api/admin/audit-logs`: read-only, newest first.
pub async fn audit_logs(
    State(ctx): State<ApiContext>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<Vec<AuditLogEntry>>, ApiError> {
    require_role(&user, Role::Admin)?;
    let conn = ctx.core.db()?;
    Ok(Json(audit::list_logs(&conn)?))
}
