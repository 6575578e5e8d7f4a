pub mod repository;
pub mod sqlite;

pub use sqlite::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Invalid identifier in column {field}: {value}")]
    InvalidId { field: String, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),
}

/// Parse a TEXT column back into a Uuid.
pub(crate) fn parse_uuid(field: &str, value: &str) -> Result<uuid::Uuid, DatabaseError> {
    uuid::Uuid::parse_str(value).map_err(|_| DatabaseError::InvalidId {
        field: field.into(),
        value: value.into(),
    })
}
