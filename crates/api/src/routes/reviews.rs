use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use carelink_database::{CreateReviewRequest, ListQuery, Review, Role, UpdateReviewRequest};

use crate::{
    error::{ApiJson, ApiQuery},
    routes::models::{CollectionResponse, DataResponse, Empty, ListResponse},
    services::reviews as review_service,
    util::{authorize, require_patient},
    ApiError, AppState,
};

pub async fn list_for_point(
    State(state): State<AppState>,
    Path(point_id): Path<String>,
) -> Result<Json<CollectionResponse<Review>>, ApiError> {
    let reviews = review_service::list_for_point(state.db_pool(), &point_id).await?;
    Ok(Json(CollectionResponse::from(reviews)))
}

pub async fn create_for_point(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(point_id): Path<String>,
    ApiJson(req): ApiJson<CreateReviewRequest>,
) -> Result<(StatusCode, Json<DataResponse<Review>>), ApiError> {
    let account = state.protect(&headers).await?;
    authorize(&account, &[Role::Patient, Role::Admin])?;
    let patient = require_patient(&account)?;

    let review = review_service::create_review(state.db_pool(), patient, &point_id, &req).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(review))))
}

pub async fn list_reviews(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<ListResponse<Review>>, ApiError> {
    let page = review_service::list_reviews(state.db_pool(), &query).await?;
    Ok(Json(ListResponse::from(page)))
}

pub async fn get_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<Review>>, ApiError> {
    let review = review_service::find_review(state.db_pool(), &id).await?;
    Ok(Json(DataResponse::new(review)))
}

pub async fn update_review(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateReviewRequest>,
) -> Result<Json<DataResponse<Review>>, ApiError> {
    let account = state.protect(&headers).await?;
    let patient = require_patient(&account)?;

    let review = review_service::update_review(state.db_pool(), patient, &id, &req).await?;
    Ok(Json(DataResponse::new(review)))
}

pub async fn delete_review(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<Empty>>, ApiError> {
    let account = state.protect(&headers).await?;
    let patient = require_patient(&account)?;

    review_service::delete_review(state.db_pool(), patient, &id).await?;
    Ok(Json(DataResponse::new(Empty::default())))
}
