//! Bearer token authentication middleware.
//!
//! Extracts `Authorization: Bearer <token>`, resolves it to a user via
//! the session store, and injects `AuthUser` into request extensions for
//! downstream handlers. Any resolution failure is a plain 401.

use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthUser};
use crate::auth;

pub async fn require_auth(
    State(ctx): State<ApiContext>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    match require_auth_inner(ctx, req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_auth_inner(
    ctx: ApiContext,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?
        .to_string();

    // Scope the connection guard: it must not live across the await below.
    let user = {
        let conn = ctx.core.db()?;
        auth::authenticate(&conn, &token, Utc::now()).map_err(|_| ApiError::Unauthorized)?
    };

    req.extensions_mut().insert(AuthUser(user));
    Ok(next.run(req).await)
}
