//! Identity store: registration, credential hashing, admin validation.
//!
//! Role is fixed by the registration entry point and never changes
//! afterwards. Patients are usable immediately; doctor and laboratory
//! accounts start inactive and wait for an admin to validate them.

use base64::Engine;
use chrono::{DateTime, NaiveDate, Utc};
use pbkdf2::pbkdf2_hmac;
use rusqlite::Connection;
use serde::Deserialize;
use sha2::Sha256;
use std::str::FromStr;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::audit;
use crate::config::MIN_PASSWORD_LEN;
use crate::db::repository::user as user_repo;
use crate::db::DatabaseError;
use crate::error::ServiceError;
use crate::models::enums::{BloodGroup, Gender, Genotype, Role};
use crate::models::{DoctorProfile, PatientProfile, User};

// ═══════════════════════════════════════════════════════════
// Password hashing (PBKDF2-HMAC-SHA256)
// ═══════════════════════════════════════════════════════════

#[cfg(not(test))]
const PBKDF2_ITERATIONS: u32 = 600_000;
// The iteration count is baked into each stored hash, so test hashes
// stay verifiable with a cheap parameter.
#[cfg(test)]
const PBKDF2_ITERATIONS: u32 = 1_000;

const SALT_LENGTH: usize = 16;
const HASH_LENGTH: usize = 32;

const B64: base64::engine::general_purpose::GeneralPurpose =
    base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Derive a storable credential string: `pbkdf2-sha256$iter$salt$hash`.
pub fn hash_password(password: &str) -> String {
    use rand::RngCore;
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);

    let mut hash = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut hash);

    format!(
        "pbkdf2-sha256${PBKDF2_ITERATIONS}${}${}",
        B64.encode(salt),
        B64.encode(hash)
    )
}

/// Constant-time verification against a stored credential string.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some("pbkdf2-sha256"), Some(iterations), Some(salt), Some(expected)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (B64.decode(salt), B64.decode(expected)) else {
        return false;
    };

    let mut hash = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut hash);
    hash.as_slice().ct_eq(expected.as_slice()).into()
}

// ═══════════════════════════════════════════════════════════
// Registration inputs
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct NewUserInput {
    pub email: String,
    pub name: String,
    pub forename: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    pub gender: String,
    #[serde(default)]
    pub address: Option<String>,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPatientInput {
    #[serde(flatten)]
    pub user: NewUserInput,
    pub blood_group: String,
    #[serde(default)]
    pub genotype: Option<String>,
    #[serde(default)]
    pub diseases: Option<String>,
    #[serde(default)]
    pub allergies: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewDoctorInput {
    #[serde(flatten)]
    pub user: NewUserInput,
    #[serde(default)]
    pub hospital: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewLaboratoryInput {
    #[serde(flatten)]
    pub user: NewUserInput,
}

// ═══════════════════════════════════════════════════════════
// Registration
// ═══════════════════════════════════════════════════════════

/// Validate the shared fields and reserve nothing: returns the parsed
/// gender and the normalized (lowercased) email.
fn validate_base(conn: &Connection, input: &NewUserInput) -> Result<(Gender, String), ServiceError> {
    let email = input.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ServiceError::Validation("a valid email is required".into()));
    }
    if input.name.trim().is_empty() || input.forename.trim().is_empty() {
        return Err(ServiceError::Validation("name and forename are required".into()));
    }
    if input.password.len() < MIN_PASSWORD_LEN {
        return Err(ServiceError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if input.password != input.password_confirm {
        return Err(ServiceError::Validation("passwords do not match".into()));
    }
    let gender = Gender::from_str(&input.gender)
        .map_err(|_| ServiceError::Validation("invalid gender code".into()))?;

    if user_repo::get_user_by_email(conn, &email)?.is_some() {
        return Err(ServiceError::Conflict("email already registered".into()));
    }

    Ok((gender, email))
}

fn build_user(input: &NewUserInput, gender: Gender, email: String, role: Role, now: DateTime<Utc>) -> User {
    User {
        id: Uuid::new_v4(),
        email,
        name: input.name.trim().to_string(),
        forename: input.forename.trim().to_string(),
        phone: input.phone.clone(),
        date_of_birth: input.date_of_birth,
        gender,
        address: input.address.clone(),
        role,
        // Professionals wait for admin validation.
        is_active: !role.is_professional(),
        created_at: now,
        updated_at: now,
    }
}

/// The duplicate-email pre-check races with concurrent registrations; the
/// unique index is the backstop, surfaced as the same Conflict.
fn map_insert(err: DatabaseError) -> ServiceError {
    match err {
        DatabaseError::ConstraintViolation(_) => {
            ServiceError::Conflict("email already registered".into())
        }
        other => other.into(),
    }
}

pub fn register_patient(
    conn: &Connection,
    input: &NewPatientInput,
    now: DateTime<Utc>,
) -> Result<User, ServiceError> {
    let (gender, email) = validate_base(conn, &input.user)?;
    let blood_group = BloodGroup::from_str(&input.blood_group)
        .map_err(|_| ServiceError::Validation("invalid blood group".into()))?;
    let genotype = input
        .genotype
        .as_deref()
        .map(Genotype::from_str)
        .transpose()
        .map_err(|_| ServiceError::Validation("invalid genotype".into()))?;

    let user = build_user(&input.user, gender, email, Role::Patient, now);
    let password_hash = hash_password(&input.user.password);

    let tx = conn.unchecked_transaction().map_err(DatabaseError::from)?;
    user_repo::insert_user(&tx, &user, &password_hash).map_err(map_insert)?;
    user_repo::insert_patient_profile(
        &tx,
        &PatientProfile {
            id: Uuid::new_v4(),
            user_id: user.id,
            blood_group,
            genotype,
            diseases: input.diseases.clone(),
            allergies: input.allergies.clone(),
        },
    )?;
    tx.commit().map_err(DatabaseError::from)?;

    Ok(user)
}

pub fn register_doctor(
    conn: &Connection,
    input: &NewDoctorInput,
    now: DateTime<Utc>,
) -> Result<User, ServiceError> {
    let (gender, email) = validate_base(conn, &input.user)?;
    let user = build_user(&input.user, gender, email, Role::Doctor, now);
    let password_hash = hash_password(&input.user.password);

    let tx = conn.unchecked_transaction().map_err(DatabaseError::from)?;
    user_repo::insert_user(&tx, &user, &password_hash).map_err(map_insert)?;
    user_repo::insert_doctor_profile(
        &tx,
        &DoctorProfile {
            id: Uuid::new_v4(),
            user_id: user.id,
            hospital: input.hospital.clone(),
        },
    )?;
    tx.commit().map_err(DatabaseError::from)?;

    Ok(user)
}

pub fn register_laboratory(
    conn: &Connection,
    input: &NewLaboratoryInput,
    now: DateTime<Utc>,
) -> Result<User, ServiceError> {
    let (gender, email) = validate_base(conn, &input.user)?;
    let user = build_user(&input.user, gender, email, Role::Laboratory, now);
    let password_hash = hash_password(&input.user.password);

    user_repo::insert_user(conn, &user, &password_hash).map_err(map_insert)?;
    Ok(user)
}

// ═══════════════════════════════════════════════════════════
// Admin operations
// ═══════════════════════════════════════════════════════════

/// Validate a pending professional account.
pub fn activate_professional(
    conn: &Connection,
    admin: &User,
    user_id: &Uuid,
    now: DateTime<Utc>,
) -> Result<User, ServiceError> {
    let user = user_repo::get_user(conn, user_id)?.ok_or(ServiceError::NotFound("user"))?;
    if !user.role.is_professional() || user.is_active {
        return Err(ServiceError::Validation(
            "user is not a professional awaiting validation".into(),
        ));
    }

    user_repo::set_user_active(conn, &user.id, true, now)?;
    let details = format!("professional={} role={}", user.id, user.role.as_str());
    audit::record(conn, Some(&admin.id), "professional_activated", Some(&details), None);

    user_repo::get_user(conn, user_id)?.ok_or(ServiceError::NotFound("user"))
}

/// Professional accounts waiting for validation, oldest first.
pub fn pending_professionals(conn: &Connection) -> Result<Vec<User>, ServiceError> {
    Ok(user_repo::list_inactive_professionals(conn)?)
}

pub fn list_users(conn: &Connection) -> Result<Vec<User>, ServiceError> {
    Ok(user_repo::list_users(conn)?)
}

/// Remove an account. Clinical rows cascade away; audit rows stay behind
/// with the actor reference nulled.
pub fn delete_user(
    conn: &Connection,
    admin: &User,
    user_id: &Uuid,
) -> Result<(), ServiceError> {
    let details = format!("user={user_id}");
    if !user_repo::delete_user(conn, user_id)? {
        return Err(ServiceError::NotFound("user"));
    }
    audit::record(conn, Some(&admin.id), "user_deleted", Some(&details), None);
    Ok(())
}

// ═══════════════════════════════════════════════════════════
// Self-service
// ═══════════════════════════════════════════════════════════

pub fn change_password(
    conn: &Connection,
    user: &User,
    old_password: &str,
    new_password: &str,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    let stored = user_repo::get_password_hash(conn, &user.id)?
        .ok_or(ServiceError::NotFound("user"))?;
    if !verify_password(old_password, &stored) {
        return Err(ServiceError::Validation("old password is incorrect".into()));
    }
    if new_password.len() < MIN_PASSWORD_LEN {
        return Err(ServiceError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    user_repo::update_password_hash(conn, &user.id, &hash_password(new_password), now)?;
    Ok(())
}
