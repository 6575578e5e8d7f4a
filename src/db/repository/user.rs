use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::{parse_uuid, DatabaseError};
use crate::models::enums::{BloodGroup, Gender, Genotype, Role};
use crate::models::{DoctorProfile, PatientProfile, User};

const USER_COLUMNS: &str = "id, email, name, forename, phone, date_of_birth, gender, address, role, is_active, created_at, updated_at";

// Internal row type for User mapping
struct UserRow {
    id: String,
    email: String,
    name: String,
    forename: String,
    phone: Option<String>,
    date_of_birth: Option<NaiveDate>,
    gender: String,
    address: Option<String>,
    role: String,
    is_active: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn read_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        forename: row.get(3)?,
        phone: row.get(4)?,
        date_of_birth: row.get(5)?,
        gender: row.get(6)?,
        address: row.get(7)?,
        role: row.get(8)?,
        is_active: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn user_from_row(row: UserRow) -> Result<User, DatabaseError> {
    Ok(User {
        id: parse_uuid("users.id", &row.id)?,
        email: row.email,
        name: row.name,
        forename: row.forename,
        phone: row.phone,
        date_of_birth: row.date_of_birth,
        gender: Gender::from_str(&row.gender)?,
        address: row.address,
        role: Role::from_str(&row.role)?,
        is_active: row.is_active != 0,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

/// Map a unique-constraint failure (duplicate email) to `ConstraintViolation`.
fn map_insert_err(e: rusqlite::Error) -> DatabaseError {
    match e {
        rusqlite::Error::SqliteFailure(err, msg)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            DatabaseError::ConstraintViolation(msg.unwrap_or_else(|| "unique constraint".into()))
        }
        other => other.into(),
    }
}

/// Insert a user row. The credential hash is stored alongside the identity
/// but never read back onto the model.
pub fn insert_user(conn: &Connection, user: &User, password_hash: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO users (id, email, name, forename, phone, date_of_birth, gender, address,
         role, is_active, password_hash, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            user.id.to_string(),
            user.email,
            user.name,
            user.forename,
            user.phone,
            user.date_of_birth,
            user.gender.as_str(),
            user.address,
            user.role.as_str(),
            user.is_active as i32,
            password_hash,
            user.created_at,
            user.updated_at,
        ],
    )
    .map_err(map_insert_err)?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: &Uuid) -> Result<Option<User>, DatabaseError> {
    let mut stmt =
        conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))?;
    let row = stmt
        .query_row(params![id.to_string()], read_user_row)
        .optional()?;
    row.map(user_from_row).transpose()
}

/// Lookup by email. Emails are stored lowercase; the comparison is
/// case-insensitive so callers need not normalize first.
pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = LOWER(?1)"
    ))?;
    let row = stmt.query_row(params![email], read_user_row).optional()?;
    row.map(user_from_row).transpose()
}

pub fn get_password_hash(conn: &Connection, id: &Uuid) -> Result<Option<String>, DatabaseError> {
    let hash = conn
        .query_row(
            "SELECT password_hash FROM users WHERE id = ?1",
            params![id.to_string()],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(hash)
}

pub fn update_password_hash(
    conn: &Connection,
    id: &Uuid,
    password_hash: &str,
    now: DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
        params![password_hash, now, id.to_string()],
    )?;
    Ok(updated > 0)
}

/// Flip the activation flag. Role never changes after creation, so this is
/// the only identity mutation the admin path needs.
pub fn set_user_active(
    conn: &Connection,
    id: &Uuid,
    active: bool,
    now: DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE users SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
        params![active as i32, now, id.to_string()],
    )?;
    Ok(updated > 0)
}

pub fn list_users(conn: &Connection) -> Result<Vec<User>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
    ))?;
    let rows = stmt
        .query_map([], read_user_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(user_from_row).collect()
}

/// Professional accounts awaiting admin validation, oldest first.
pub fn list_inactive_professionals(conn: &Connection) -> Result<Vec<User>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users
         WHERE role IN ('doctor', 'laboratory') AND is_active = 0
         ORDER BY created_at ASC"
    ))?;
    let rows = stmt
        .query_map([], read_user_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(user_from_row).collect()
}

/// Hard delete. Clinical rows cascade; audit rows keep a NULL actor.
pub fn delete_user(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let deleted = conn.execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])?;
    Ok(deleted > 0)
}

// ═══════════════════════════════════════════════════════════
// Role profiles
// ═══════════════════════════════════════════════════════════

pub fn insert_patient_profile(
    conn: &Connection,
    profile: &PatientProfile,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patient_profiles (id, user_id, blood_group, genotype, diseases, allergies)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            profile.id.to_string(),
            profile.user_id.to_string(),
            profile.blood_group.as_str(),
            profile.genotype.map(|g| g.as_str()),
            profile.diseases,
            profile.allergies,
        ],
    )?;
    Ok(())
}

pub fn get_patient_profile(
    conn: &Connection,
    user_id: &Uuid,
) -> Result<Option<PatientProfile>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, blood_group, genotype, diseases, allergies
         FROM patient_profiles WHERE user_id = ?1",
    )?;
    let row = stmt
        .query_row(params![user_id.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })
        .optional()?;

    row.map(|(id, user_id, blood_group, genotype, diseases, allergies)| {
        Ok(PatientProfile {
            id: parse_uuid("patient_profiles.id", &id)?,
            user_id: parse_uuid("patient_profiles.user_id", &user_id)?,
            blood_group: BloodGroup::from_str(&blood_group)?,
            genotype: genotype.as_deref().map(Genotype::from_str).transpose()?,
            diseases,
            allergies,
        })
    })
    .transpose()
}

pub fn insert_doctor_profile(
    conn: &Connection,
    profile: &DoctorProfile,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO doctor_profiles (id, user_id, hospital) VALUES (?1, ?2, ?3)",
        params![
            profile.id.to_string(),
            profile.user_id.to_string(),
            profile.hospital,
        ],
    )?;
    Ok(())
}
