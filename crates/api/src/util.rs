use axum::http::{header::AUTHORIZATION, HeaderMap};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use carelink_auth::Account;
use carelink_database::{Patient, Role};

use crate::state::SessionSettings;
use crate::ApiError;

pub const TOKEN_COOKIE: &str = "token";
pub const NOT_AUTHORIZED: &str = "Not authorized to access this route";

pub fn require_bearer(headers: &HeaderMap) -> Result<String, ApiError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized(NOT_AUTHORIZED))?;

    let mut parts = value.split_whitespace();
    let scheme = parts.next().unwrap_or("");
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return Err(ApiError::unauthorized(NOT_AUTHORIZED));
    }

    let token = parts.next().unwrap_or("");
    if token.is_empty() {
        return Err(ApiError::unauthorized(NOT_AUTHORIZED));
    }

    Ok(token.to_string())
}

/// Bearer header first, then the `token` cookie.
pub fn require_token(headers: &HeaderMap) -> Result<String, ApiError> {
    if headers.contains_key(AUTHORIZATION) {
        return require_bearer(headers);
    }

    CookieJar::from_headers(headers)
        .get(TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::unauthorized(NOT_AUTHORIZED))
}

pub fn authorize(account: &Account, roles: &[Role]) -> Result<(), ApiError> {
    let role = account.role();
    if roles.contains(&role) {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!(
            "User role {role} is not authorized to access this route"
        )))
    }
}

/// Patient-only routes reject doctor tokens with 403.
pub fn require_patient(account: &Account) -> Result<&Patient, ApiError> {
    account.as_patient().ok_or_else(|| {
        ApiError::forbidden(format!(
            "User role {} is not authorized to access this route",
            account.role()
        ))
    })
}

pub fn token_cookie(token: &str, settings: &SessionSettings) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .secure(settings.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(i64::from(settings.cookie_expire_days)))
        .build()
}

/// Overwrites the session cookie with an empty, already expired one.
pub fn expired_token_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build((TOKEN_COOKIE, "")).path("/").build();
    cookie.make_removal();
    cookie
}
