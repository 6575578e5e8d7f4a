//! Function-based repositories over the SQLite schema.
//!
//! Each entity gets plain functions taking `&Connection`; callers own the
//! transaction boundaries. Uuids and enums are stored as TEXT and parsed
//! back on read.

pub mod audit;
pub mod clinical_note;
pub mod consent;
pub mod prescription;
pub mod session;
pub mod user;
