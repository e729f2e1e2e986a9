//! Patient administration. Every handler requires an admin token.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use carelink_auth::Account;
use carelink_database::{
    CreatePatientRequest, ListParams, ListQuery, Patient, Role, UpdatePatientRequest,
    PATIENT_SORT_FIELDS,
};

use crate::{
    error::{ApiJson, ApiQuery},
    routes::models::{DataResponse, Empty, ListResponse},
    util::authorize,
    ApiError, AppState,
};

async fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<Account, ApiError> {
    let account = state.protect(headers).await?;
    authorize(&account, &[Role::Admin])?;
    Ok(account)
}

async fn find_patient(state: &AppState, id: &str) -> Result<Patient, ApiError> {
    state
        .authenticator()
        .patients()
        .find_by_public_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No patient with the id of {id}")))
}

pub async fn list_patients(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<ListResponse<Patient>>, ApiError> {
    require_admin(&state, &headers).await?;
    let params = ListParams::resolve(&query, PATIENT_SORT_FIELDS, "created_at DESC, id DESC")?;
    let page = state.authenticator().patients().list(&params).await?;
    Ok(Json(ListResponse::from(page)))
}

pub async fn create_patient(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<CreatePatientRequest>,
) -> Result<(StatusCode, Json<DataResponse<Patient>>), ApiError> {
    let admin = require_admin(&state, &headers).await?;
    let role = req.role.unwrap_or(Role::Patient);
    let patient = state.authenticator().create_patient(&req, role).await?;
    tracing::info!(admin = %admin.public_id(), patient = %patient.public_id, %role, "patient created by admin");
    Ok((StatusCode::CREATED, Json(DataResponse::new(patient))))
}

pub async fn get_patient(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<Patient>>, ApiError> {
    require_admin(&state, &headers).await?;
    let patient = find_patient(&state, &id).await?;
    Ok(Json(DataResponse::new(patient)))
}

pub async fn update_patient(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdatePatientRequest>,
) -> Result<Json<DataResponse<Patient>>, ApiError> {
    require_admin(&state, &headers).await?;
    let patient = find_patient(&state, &id).await?;
    let updated = state
        .authenticator()
        .patients()
        .update(patient.id, &req)
        .await?;
    Ok(Json(DataResponse::new(updated)))
}

pub async fn delete_patient(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<Empty>>, ApiError> {
    require_admin(&state, &headers).await?;
    let patient = find_patient(&state, &id).await?;
    state.authenticator().patients().delete(patient.id).await?;
    tracing::info!(patient = %patient.public_id, "patient deleted");
    Ok(Json(DataResponse::new(Empty::default())))
}
