//! Shared application state.
//!
//! One SQLite connection behind a mutex, shared by every request handler.
//! SQLite serializes writers anyway; the mutex keeps the borrow rules
//! honest and makes grant/check interleavings on the same pair observe
//! whole statements only.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;

use crate::db::{self, DatabaseError};

pub struct CoreState {
    conn: Mutex<Connection>,
}

impl CoreState {
    /// Open (and migrate) the database at the given path.
    pub fn open(path: &Path) -> Result<Self, CoreError> {
        let conn = db::open_database(path)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory state for tests.
    pub fn in_memory() -> Result<Self, CoreError> {
        let conn = db::open_memory_database()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    pub fn db(&self) -> Result<MutexGuard<'_, Connection>, CoreError> {
        self.conn.lock().map_err(|_| CoreError::LockPoisoned)
    }
}

/// Errors from CoreState operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}
