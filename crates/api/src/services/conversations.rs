use carelink_auth::Account;
use carelink_database::{
    Conversation, ConversationRepository, CreateConversationRequest, CreateMessageRequest,
    DoctorRepository, Message, MessageRepository, PatientRepository, Role,
};
use sqlx::SqlitePool;

use super::error::ServiceError;

fn not_a_member(account: &Account) -> ServiceError {
    ServiceError::unauthorized(format!(
        "User {} is not a member of this conversation",
        account.public_id()
    ))
}

/// Returns the existing conversation between the two users, or opens one.
/// The caller must be one of them.
pub async fn open_conversation(
    pool: &SqlitePool,
    account: &Account,
    req: &CreateConversationRequest,
) -> Result<Conversation, ServiceError> {
    req.validate()?;
    let (sender, receiver) = (req.sender_id.trim(), req.receiver_id.trim());
    if account.public_id() != sender && account.public_id() != receiver {
        return Err(not_a_member(account));
    }
    if sender == receiver {
        return Err(ServiceError::bad_request(
            "A conversation needs two different users",
        ));
    }

    let other = if account.public_id() == sender {
        receiver
    } else {
        sender
    };
    if !account_exists(pool, other).await? {
        return Err(ServiceError::not_found(format!("No user with the id of {other}")));
    }

    let repo = ConversationRepository::new(pool.clone());
    if let Some(existing) = repo.find_between(sender, receiver).await? {
        return Ok(existing);
    }
    let conversation = repo.create(sender, receiver).await?;
    tracing::info!(conversation = %conversation.public_id, "conversation opened");
    Ok(conversation)
}

async fn account_exists(pool: &SqlitePool, public_id: &str) -> Result<bool, ServiceError> {
    if PatientRepository::new(pool.clone())
        .find_by_public_id(public_id)
        .await?
        .is_some()
    {
        return Ok(true);
    }
    Ok(DoctorRepository::new(pool.clone())
        .find_by_public_id(public_id)
        .await?
        .is_some())
}

pub async fn conversations_for_user(
    pool: &SqlitePool,
    account: &Account,
    user_id: &str,
) -> Result<Vec<Conversation>, ServiceError> {
    if account.public_id() != user_id && account.role() != Role::Admin {
        return Err(ServiceError::unauthorized(format!(
            "User {} is not authorized to read these conversations",
            account.public_id()
        )));
    }
    Ok(ConversationRepository::new(pool.clone())
        .list_for_user(user_id)
        .await?)
}

async fn member_conversation(
    pool: &SqlitePool,
    account: &Account,
    conversation_id: &str,
) -> Result<Conversation, ServiceError> {
    let conversation = ConversationRepository::new(pool.clone())
        .find_by_public_id(conversation_id)
        .await?
        .ok_or_else(|| {
            ServiceError::not_found(format!(
                "No conversation with the id of {conversation_id}"
            ))
        })?;
    if !conversation.has_member(account.public_id()) {
        return Err(not_a_member(account));
    }
    Ok(conversation)
}

pub async fn post_message(
    pool: &SqlitePool,
    account: &Account,
    req: &CreateMessageRequest,
) -> Result<Message, ServiceError> {
    req.validate()?;
    let conversation = member_conversation(pool, account, req.conversation_id.trim()).await?;
    Ok(MessageRepository::new(pool.clone())
        .create(conversation.id, account.public_id(), req.text.trim())
        .await?)
}

pub async fn messages_in(
    pool: &SqlitePool,
    account: &Account,
    conversation_id: &str,
) -> Result<Vec<Message>, ServiceError> {
    let conversation = member_conversation(pool, account, conversation_id).await?;
    Ok(MessageRepository::new(pool.clone())
        .list_for_conversation(conversation.id)
        .await?)
}
