//! Direct conversations between a patient and a doctor

use serde::{Deserialize, Serialize};

use crate::types::DatabaseResult;
use crate::validation;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    #[serde(skip)]
    pub id: i64,
    #[serde(rename = "id")]
    pub public_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Conversation {
    pub fn has_member(&self, user_id: &str) -> bool {
        self.sender_id == user_id || self.receiver_id == user_id
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    #[serde(default)]
    pub sender_id: String,
    #[serde(default)]
    pub receiver_id: String,
}

impl CreateConversationRequest {
    pub fn validate(&self) -> DatabaseResult<()> {
        validation::require(&self.sender_id, "Please add a sender")?;
        validation::require(&self.receiver_id, "Please add a receiver")
    }
}
