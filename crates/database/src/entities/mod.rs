//! Database entities and their request types

pub mod common;
pub mod conversation;
pub mod doctor;
pub mod message;
pub mod patient;
pub mod plasma;
pub mod point;
pub mod review;

pub use common::{BloodGroup, Gender, Role};
pub use conversation::{Conversation, CreateConversationRequest};
pub use doctor::{CreateDoctorRequest, Doctor};
pub use message::{CreateMessageRequest, Message};
pub use patient::{CreatePatientRequest, Patient, UpdatePatientRequest};
pub use plasma::{CreatePlasmaRequest, Plasma, UpdatePlasmaRequest};
pub use point::{CreatePointRequest, Point, UpdatePointRequest};
pub use review::{CreateReviewRequest, Review, UpdateReviewRequest};

use chrono::{SecondsFormat, Utc};

/// RFC 3339 UTC timestamp with millisecond precision. Values sort lexically.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn new_public_id() -> String {
    cuid2::cuid()
}
