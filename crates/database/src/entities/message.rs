//! Messages persisted inside a conversation

use serde::{Deserialize, Serialize};

use crate::types::DatabaseResult;
use crate::validation;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(skip)]
    pub id: i64,
    #[serde(rename = "id")]
    pub public_id: String,
    #[serde(skip)]
    pub conversation_id: i64,
    pub conversation: String,
    pub sender: String,
    pub text: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageRequest {
    #[serde(default)]
    pub conversation_id: String,
    #[serde(default)]
    pub text: String,
}

impl CreateMessageRequest {
    pub fn validate(&self) -> DatabaseResult<()> {
        validation::require(&self.conversation_id, "Please add a conversation")?;
        validation::require(&self.text, "Please add some text")
    }
}
