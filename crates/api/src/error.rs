use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use carelink_auth::AuthError;
use carelink_database::DatabaseError;
use serde::Serialize;
use tracing::{debug, error};

use crate::services::stats::StatsError;

pub const DUPLICATE_MESSAGE: &str = "Duplicate field value entered";
pub const SERVER_ERROR_MESSAGE: &str = "Server Error";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            success: false,
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        error!(error = ?error, "internal error");
        Self::internal_server_error(SERVER_ERROR_MESSAGE)
    }
}

impl From<DatabaseError> for ApiError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::ValidationError(message) => Self::bad_request(message),
            DatabaseError::Duplicate(detail) => {
                debug!(%detail, "unique constraint rejected write");
                Self::bad_request(DUPLICATE_MESSAGE)
            }
            DatabaseError::NotFound(what) => Self::not_found(format!("Resource not found: {what}")),
            other => {
                error!(error = ?other, "database error");
                Self::internal_server_error(SERVER_ERROR_MESSAGE)
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Database(inner) => Self::from(inner),
            AuthError::MissingCredentials
            | AuthError::InvalidResetToken
            | AuthError::RoleNotAllowed(_) => Self::bad_request(error.to_string()),
            AuthError::InvalidCredentials
            | AuthError::Unauthorized
            | AuthError::IncorrectPassword => Self::unauthorized(error.to_string()),
            AuthError::UnknownEmail => Self::not_found(error.to_string()),
            AuthError::MailDelivery(_) => {
                error!(error = ?error, "auth error");
                Self::internal_server_error(error.to_string())
            }
            AuthError::PasswordHash(_) | AuthError::Token(_) => {
                error!(error = ?error, "auth error");
                Self::internal_server_error(SERVER_ERROR_MESSAGE)
            }
        }
    }
}

impl From<StatsError> for ApiError {
    fn from(error: StatsError) -> Self {
        error!(error = ?error, "statistics upstream error");
        Self::bad_gateway(error.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        let status = rejection.status();
        Self::new(status, rejection.body_text())
    }
}

/// `Json` whose rejections use the API error body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);
