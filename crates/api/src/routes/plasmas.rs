use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use carelink_database::{CreatePlasmaRequest, ListQuery, Plasma, UpdatePlasmaRequest};

use crate::{
    error::{ApiJson, ApiQuery},
    routes::models::{CollectionResponse, DataResponse, Empty, ListResponse},
    services::plasmas as plasma_service,
    util::require_patient,
    ApiError, AppState,
};

pub async fn list_for_point(
    State(state): State<AppState>,
    Path(point_id): Path<String>,
) -> Result<Json<CollectionResponse<Plasma>>, ApiError> {
    let plasmas = plasma_service::list_for_point(state.db_pool(), &point_id).await?;
    Ok(Json(CollectionResponse::from(plasmas)))
}

pub async fn create_for_point(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(point_id): Path<String>,
    ApiJson(req): ApiJson<CreatePlasmaRequest>,
) -> Result<(StatusCode, Json<DataResponse<Plasma>>), ApiError> {
    let account = state.protect(&headers).await?;
    let patient = require_patient(&account)?;

    let plasma = plasma_service::create_plasma(state.db_pool(), patient, &point_id, &req).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(plasma))))
}

pub async fn list_plasmas(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<ListResponse<Plasma>>, ApiError> {
    let page = plasma_service::list_plasmas(state.db_pool(), &query).await?;
    Ok(Json(ListResponse::from(page)))
}

pub async fn get_plasma(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<Plasma>>, ApiError> {
    let plasma = plasma_service::find_plasma(state.db_pool(), &id).await?;
    Ok(Json(DataResponse::new(plasma)))
}

pub async fn update_plasma(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdatePlasmaRequest>,
) -> Result<Json<DataResponse<Plasma>>, ApiError> {
    let account = state.protect(&headers).await?;
    let patient = require_patient(&account)?;

    let plasma = plasma_service::update_plasma(state.db_pool(), patient, &id, &req).await?;
    Ok(Json(DataResponse::new(plasma)))
}

pub async fn delete_plasma(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<Empty>>, ApiError> {
    let account = state.protect(&headers).await?;
    let patient = require_patient(&account)?;

    plasma_service::delete_plasma(state.db_pool(), patient, &id).await?;
    Ok(Json(DataResponse::new(Empty::default())))
}
