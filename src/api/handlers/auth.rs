//! Registration and session endpoints.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::{Extension, Json};
use chrono::Utc;

use crate::api::error::ApiError;
use crate::api::types::{
    ApiContext, AuthUser, ChangePasswordRequest, DetailResponse, LoginRequest, LoginResponse,
};
use crate::auth;
use crate::error::ServiceError;
use crate::identity::{self, NewDoctorInput, NewLaboratoryInput, NewPatientInput};
use crate::models::User;

/// `POST /api/register/patient`
pub async fn register_patient(
    State(ctx): State<ApiContext>,
    Json(input): Json<NewPatientInput>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let conn = ctx.core.db()?;
    let user = identity::register_patient(&conn, &input, Utc::now())?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// `POST /api/register/doctor`: account starts inactive.
pub async fn register_doctor(
    State(ctx): State<ApiContext>,
    Json(input): Json<NewDoctorInput>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let conn = ctx.core.db()?;
    let user = identity::register_doctor(&conn, &input, Utc::now())?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// `POST /api/register/laboratory`: account starts inactive.
pub async fn register_laboratory(
    State(ctx): State<ApiContext>,
    Json(input): Json<NewLaboratoryInput>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let conn = ctx.core.db()?;
    let user = identity::register_laboratory(&conn, &input, Utc::now())?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// `POST /api/auth/login`
pub async fn login(
    State(ctx): State<ApiContext>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let origin = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string());

    let conn = ctx.core.db()?;
    let (token, user) = auth::login(&conn, &req.email, &req.password, origin.as_deref(), Utc::now())
        .map_err(|e| match e {
            // Bad credentials are a 401, not a 403.
            ServiceError::AccessDenied(_) => ApiError::Unauthorized,
            other => other.into(),
        })?;

    Ok(Json(LoginResponse { token, user }))
}

/// `POST /api/auth/logout`
pub async fn logout(
    State(ctx): State<ApiContext>,
    headers: HeaderMap,
) -> Result<Json<DetailResponse>, ApiError> {
    let token = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let conn = ctx.core.db()?;
    auth::logout(&conn, token)?;
    Ok(Json(DetailResponse {
        detail: "logged out",
    }))
}

/// `POST /api/auth/change-password`
pub async fn change_password(
    State(ctx): State<ApiContext>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<DetailResponse>, ApiError> {
    let conn = ctx.core.db()?;
    identity::change_password(&conn, &user, &req.old_password, &req.new_password, Utc::now())?;
    Ok(Json(DetailResponse {
        detail: "password changed",
    }))
}
