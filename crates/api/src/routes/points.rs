use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use carelink_database::{CreatePointRequest, ListQuery, Point, Role, UpdatePointRequest};

use crate::{
    error::{ApiJson, ApiPath, ApiQuery},
    routes::models::{CollectionResponse, DataResponse, Empty, ListResponse},
    services::points as point_service,
    util::{authorize, require_patient},
    ApiError, AppState,
};

pub async fn list_points(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<ListResponse<Point>>, ApiError> {
    let page = point_service::list_points(state.db_pool(), &query).await?;
    Ok(Json(ListResponse::from(page)))
}

pub async fn create_point(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<CreatePointRequest>,
) -> Result<(StatusCode, Json<DataResponse<Point>>), ApiError> {
    let account = state.protect(&headers).await?;
    authorize(&account, &[Role::Patient, Role::DonationPoint, Role::Admin])?;
    let patient = require_patient(&account)?;

    let point = point_service::create_point(state.db_pool(), patient, &req).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(point))))
}

pub async fn get_point(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<Point>>, ApiError> {
    let point = point_service::find_point(state.db_pool(), &id).await?;
    Ok(Json(DataResponse::new(point)))
}

pub async fn update_point(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdatePointRequest>,
) -> Result<Json<DataResponse<Point>>, ApiError> {
    let account = state.protect(&headers).await?;
    let patient = require_patient(&account)?;

    let point = point_service::update_point(state.db_pool(), patient, &id, &req).await?;
    Ok(Json(DataResponse::new(point)))
}

pub async fn delete_point(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<Empty>>, ApiError> {
    let account = state.protect(&headers).await?;
    let patient = require_patient(&account)?;

    point_service::delete_point(state.db_pool(), patient, &id).await?;
    Ok(Json(DataResponse::new(Empty::default())))
}

pub async fn points_in_radius(
    State(state): State<AppState>,
    ApiPath((lat, lng, distance)): ApiPath<(f64, f64, f64)>,
) -> Result<Json<CollectionResponse<Point>>, ApiError> {
    let points = point_service::points_within_radius(state.db_pool(), lat, lng, distance).await?;
    Ok(Json(CollectionResponse::from(points)))
}
