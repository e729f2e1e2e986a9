use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use carelink_database::{Conversation, CreateConversationRequest, CreateMessageRequest, Message};

use crate::{
    error::ApiJson,
    routes::models::{CollectionResponse, DataResponse},
    services::conversations as conversation_service,
    ApiError, AppState,
};

pub async fn open_conversation(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<CreateConversationRequest>,
) -> Result<Json<DataResponse<Conversation>>, ApiError> {
    let account = state.protect(&headers).await?;
    let conversation =
        conversation_service::open_conversation(state.db_pool(), &account, &req).await?;
    Ok(Json(DataResponse::new(conversation)))
}

pub async fn list_for_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Result<Json<CollectionResponse<Conversation>>, ApiError> {
    let account = state.protect(&headers).await?;
    let conversations =
        conversation_service::conversations_for_user(state.db_pool(), &account, &user_id).await?;
    Ok(Json(CollectionResponse::from(conversations)))
}

pub async fn post_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<CreateMessageRequest>,
) -> Result<(StatusCode, Json<DataResponse<Message>>), ApiError> {
    let account = state.protect(&headers).await?;
    let message = conversation_service::post_message(state.db_pool(), &account, &req).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(message))))
}

pub async fn list_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(conversation_id): Path<String>,
) -> Result<Json<CollectionResponse<Message>>, ApiError> {
    let account = state.protect(&headers).await?;
    let messages =
        conversation_service::messages_in(state.db_pool(), &account, &conversation_id).await?;
    Ok(Json(CollectionResponse::from(messages)))
}
