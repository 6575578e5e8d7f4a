//! Request handlers, grouped by actor.

pub mod access;
pub mod admin;
pub mod auth;
pub mod dep;
pub mod doctor;
pub mod labo;

use crate::api::error::ApiError;
use crate::models::enums::Role;
use crate::models::User;

/// Role dispatch at the request boundary: an explicit tag check, nothing
/// resolved from ambient state.
pub(crate) fn require_role(user: &User, role: Role) -> Result<(), ApiError> {
    if user.role == role {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!(
            "requires the {} role",
            role.as_str()
        )))
    }
}

/// Doctor or laboratory.
pub(crate) fn require_professional(user: &User) -> Result<(), ApiError> {
    if user.role.is_professional() {
        Ok(())
    } else {
        Err(ApiError::Forbidden("requires a professional role".into()))
    }
}
