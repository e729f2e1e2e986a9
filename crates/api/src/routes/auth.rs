use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use carelink_auth::Account;
use carelink_database::{CreatePatientRequest, UpdatePatientRequest};

use crate::{
    error::ApiJson,
    routes::models::{
        DataResponse, Empty, ForgotPasswordRequest, LoginRequest, ResetPasswordRequest,
        TokenResponse, UpdateDetailsRequest, UpdatePasswordRequest,
    },
    util::{expired_token_cookie, require_patient, token_cookie},
    ApiError, AppState,
};

/// Sets the session cookie and echoes the token in the body.
pub(crate) fn send_token(
    state: &AppState,
    jar: CookieJar,
    token: &str,
) -> (CookieJar, Json<TokenResponse>) {
    (
        jar.add(token_cookie(token, state.settings())),
        Json(TokenResponse::new(token)),
    )
}

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<CreatePatientRequest>,
) -> Result<(CookieJar, Json<TokenResponse>), ApiError> {
    let (_, issued) = state.authenticator().register_patient(&req).await?;
    Ok(send_token(&state, jar, &issued.token))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<(CookieJar, Json<TokenResponse>), ApiError> {
    let (_, issued) = state
        .authenticator()
        .login_patient(&req.email, &req.password)
        .await?;
    Ok(send_token(&state, jar, &issued.token))
}

pub async fn logout(jar: CookieJar) -> (CookieJar, Json<DataResponse<Empty>>) {
    (
        jar.add(expired_token_cookie()),
        Json(DataResponse::new(Empty::default())),
    )
}

pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DataResponse<Account>>, ApiError> {
    let account = state.protect(&headers).await?;
    Ok(Json(DataResponse::new(account)))
}

pub async fn update_details(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<UpdateDetailsRequest>,
) -> Result<Json<DataResponse<carelink_database::Patient>>, ApiError> {
    let account = state.protect(&headers).await?;
    let patient = require_patient(&account)?;

    let update = UpdatePatientRequest {
        name: req.name,
        email: req.email,
        ..UpdatePatientRequest::default()
    };
    let updated = state
        .authenticator()
        .patients()
        .update(patient.id, &update)
        .await?;
    Ok(Json(DataResponse::new(updated)))
}

pub async fn update_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    ApiJson(req): ApiJson<UpdatePasswordRequest>,
) -> Result<(CookieJar, Json<TokenResponse>), ApiError> {
    let account = state.protect(&headers).await?;
    let patient = require_patient(&account)?;

    let issued = state
        .authenticator()
        .update_password(patient, &req.current_password, &req.new_password)
        .await?;
    Ok(send_token(&state, jar, &issued.token))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ForgotPasswordRequest>,
) -> Result<Json<DataResponse<&'static str>>, ApiError> {
    state.authenticator().forgot_password(&req.email).await?;
    Ok(Json(DataResponse::new("Email sent")))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    jar: CookieJar,
    ApiJson(req): ApiJson<ResetPasswordRequest>,
) -> Result<(CookieJar, Json<TokenResponse>), ApiError> {
    let (_, issued) = state
        .authenticator()
        .reset_password(&token, &req.password)
        .await?;
    Ok(send_token(&state, jar, &issued.token))
}
