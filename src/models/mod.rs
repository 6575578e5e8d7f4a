pub mod audit;
pub mod consent;
pub mod enums;
pub mod lab_test;
pub mod note;
pub mod prescription;
pub mod user;

pub use audit::AuditLogEntry;
pub use consent::ConsentGrant;
pub use lab_test::LabTest;
pub use note::ClinicalNote;
pub use prescription::Prescription;
pub use user::{DoctorProfile, PatientProfile, User};
