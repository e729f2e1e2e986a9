use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use carelink_auth::Account;
use carelink_database::{CreateDoctorRequest, Doctor, ListParams, ListQuery, DOCTOR_SORT_FIELDS};

use crate::{
    error::{ApiJson, ApiQuery},
    routes::auth::send_token,
    routes::models::{DataResponse, ListResponse, LoginRequest, TokenResponse},
    ApiError, AppState,
};

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<CreateDoctorRequest>,
) -> Result<(CookieJar, Json<TokenResponse>), ApiError> {
    let (_, issued) = state.authenticator().register_doctor(&req).await?;
    Ok(send_token(&state, jar, &issued.token))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<(CookieJar, Json<TokenResponse>), ApiError> {
    let (_, issued) = state
        .authenticator()
        .login_doctor(&req.email, &req.password)
        .await?;
    Ok(send_token(&state, jar, &issued.token))
}

pub async fn list_doctors(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<ListResponse<Doctor>>, ApiError> {
    let params = ListParams::resolve(&query, DOCTOR_SORT_FIELDS, "created_at DESC, id DESC")?;
    let page = state.authenticator().doctors().list(&params).await?;
    Ok(Json(ListResponse::from(page)))
}

pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DataResponse<Doctor>>, ApiError> {
    match state.protect(&headers).await? {
        Account::Doctor(doctor) => Ok(Json(DataResponse::new(doctor))),
        other => Err(ApiError::forbidden(format!(
            "User role {} is not authorized to access this route",
            other.role()
        ))),
    }
}

pub async fn get_doctor(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<Doctor>>, ApiError> {
    let doctor = state
        .authenticator()
        .doctors()
        .find_by_public_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No doctor with the id of {id}")))?;
    Ok(Json(DataResponse::new(doctor)))
}
