//! Shared fixtures for unit tests.

use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::repository::{lab_test, user};
use crate::models::enums::{Gender, Role, TestStatus};
use crate::models::{LabTest, User};

/// Insert an active user with a throwaway credential hash.
pub fn seed_user(conn: &Connection, email: &str, role: Role) -> User {
    let now = Utc::now();
    let u = User {
        id: Uuid::new_v4(),
        email: email.to_lowercase(),
        name: "Diallo".to_string(),
        forename: "Test".to_string(),
        phone: None,
        date_of_birth: None,
        gender: Gender::Male,
        address: None,
        role,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    user::insert_user(conn, &u, "unused-hash").unwrap();
    u
}

/// Insert a pending, unclaimed lab test for the given patient.
pub fn seed_lab_test(conn: &Connection, patient: &User, name: &str) -> LabTest {
    let test = LabTest {
        id: Uuid::new_v4(),
        patient_id: patient.id,
        prescribed_by: None,
        performed_by: None,
        test_name: name.to_string(),
        details: None,
        status: TestStatus::Pending,
        result_document: None,
        result_uploaded_at: None,
        interpretation: None,
        interpreted_by: None,
        created_at: Utc::now(),
    };
    lab_test::insert_lab_test(conn, &test).unwrap();
    test
}
