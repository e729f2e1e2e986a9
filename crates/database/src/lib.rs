//! CareLink Database Crate
//!
//! Connection management, migrations, entities and repositories for the
//! CareLink backend. Everything is stored in SQLite through `sqlx`.

use carelink_config::DatabaseConfig;
use sqlx::SqlitePool;

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod query;
pub mod repos;
pub mod types;
pub mod validation;

pub use connection::prepare_database;
pub use migrations::{run_migrations, MIGRATOR};

pub use repos::{
    ConversationRepository, DoctorRepository, MessageRepository, PatientRepository,
    PlasmaRepository, PointRepository, ReviewRepository, DOCTOR_SORT_FIELDS,
    PATIENT_SORT_FIELDS, PLASMA_SORT_FIELDS, POINT_SORT_FIELDS, REVIEW_SORT_FIELDS,
};

pub use entities::{
    timestamp_now, BloodGroup, Conversation, CreateConversationRequest, CreateDoctorRequest,
    CreateMessageRequest, CreatePatientRequest, CreatePlasmaRequest, CreatePointRequest,
    CreateReviewRequest, Doctor, Gender, Message, Patient, Plasma, Point, Review, Role,
    UpdatePatientRequest, UpdatePlasmaRequest, UpdatePointRequest, UpdateReviewRequest,
};

pub use query::{ListParams, ListQuery, Page, PageRef, Pagination};
pub use types::{DatabaseError, DatabaseResult};

/// Connect and bring the schema up to date.
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;

    Ok(pool)
}
