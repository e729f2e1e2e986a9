//! Conversation and message repositories.

use sqlx::SqlitePool;

use crate::entities::{new_public_id, timestamp_now, Conversation, Message};
use crate::types::{DatabaseError, DatabaseResult};

const SELECT_CONVERSATION: &str =
    "SELECT id, public_id, sender_id, receiver_id, created_at, updated_at FROM conversations";

const SELECT_MESSAGE: &str = "SELECT m.id, m.public_id, m.conversation_id, \
     c.public_id AS conversation, m.sender, m.text, m.created_at \
     FROM messages m JOIN conversations c ON c.id = m.conversation_id";

#[derive(Clone)]
pub struct ConversationRepository {
    pool: SqlitePool,
}

impl ConversationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<Conversation>> {
        let conversation =
            sqlx::query_as::<_, Conversation>(&format!("{SELECT_CONVERSATION} WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(conversation)
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> DatabaseResult<Option<Conversation>> {
        let conversation = sqlx::query_as::<_, Conversation>(&format!(
            "{SELECT_CONVERSATION} WHERE public_id = ?"
        ))
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(conversation)
    }

    /// The conversation between two users, in either direction.
    pub async fn find_between(&self, a: &str, b: &str) -> DatabaseResult<Option<Conversation>> {
        let conversation = sqlx::query_as::<_, Conversation>(&format!(
            "{SELECT_CONVERSATION} WHERE (sender_id = ? AND receiver_id = ?) \
             OR (sender_id = ? AND receiver_id = ?) ORDER BY id LIMIT 1"
        ))
        .bind(a)
        .bind(b)
        .bind(b)
        .bind(a)
        .fetch_optional(&self.pool)
        .await?;
        Ok(conversation)
    }

    pub async fn create(&self, sender_id: &str, receiver_id: &str) -> DatabaseResult<Conversation> {
        let now = timestamp_now();
        let result = sqlx::query(
            "INSERT INTO conversations (public_id, sender_id, receiver_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(new_public_id())
        .bind(sender_id)
        .bind(receiver_id)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.find_by_id(result.last_insert_rowid()).await?.ok_or_else(|| {
            DatabaseError::QueryError("failed to retrieve created conversation".into())
        })
    }

    /// Conversations the user takes part in, most recently active first.
    pub async fn list_for_user(&self, user_id: &str) -> DatabaseResult<Vec<Conversation>> {
        let conversations = sqlx::query_as::<_, Conversation>(&format!(
            "{SELECT_CONVERSATION} WHERE sender_id = ? OR receiver_id = ? \
             ORDER BY updated_at DESC, id DESC"
        ))
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(conversations)
    }
}

#[derive(Clone)]
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<Message>> {
        let message = sqlx::query_as::<_, Message>(&format!("{SELECT_MESSAGE} WHERE m.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(message)
    }

    /// Append a message and bump the conversation's `updated_at`.
    pub async fn create(
        &self,
        conversation_id: i64,
        sender: &str,
        text: &str,
    ) -> DatabaseResult<Message> {
        let now = timestamp_now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO messages (public_id, conversation_id, sender, text, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(new_public_id())
        .bind(conversation_id)
        .bind(sender)
        .bind(text)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.find_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| DatabaseError::QueryError("failed to retrieve created message".into()))
    }

    pub async fn list_for_conversation(&self, conversation_id: i64) -> DatabaseResult<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(&format!(
            "{SELECT_MESSAGE} WHERE m.conversation_id = ? ORDER BY m.created_at, m.id"
        ))
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }
}
