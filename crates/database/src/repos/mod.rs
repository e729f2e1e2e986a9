//! Database repository implementations

pub mod conversation_repository;
pub mod doctor_repository;
pub mod patient_repository;
pub mod plasma_repository;
pub mod point_repository;
pub mod review_repository;

pub use conversation_repository::{ConversationRepository, MessageRepository};
pub use doctor_repository::{DoctorRepository, DOCTOR_SORT_FIELDS};
pub use patient_repository::{PatientRepository, PATIENT_SORT_FIELDS};
pub use plasma_repository::{PlasmaRepository, PLASMA_SORT_FIELDS};
pub use point_repository::{PointRepository, POINT_SORT_FIELDS};
pub use review_repository::{ReviewRepository, REVIEW_SORT_FIELDS};
