use std::any::Any;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::{accounts::AccountError, auth::gate::AuthRejection};

const GENERIC_FAILURE: &str = "Something went wrong";

/// Every failure a handler can return.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error(transparent)]
    Auth(#[from] AuthRejection),
    #[error("{0}")]
    BadRequest(String),
    #[error("Route not found")]
    RouteNotFound,
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

fn message(status: StatusCode, text: impl Into<String>) -> Response {
    (status, Json(json!({ "message": text.into() }))).into_response()
}

fn error_text(status: StatusCode, text: impl Into<String>) -> Response {
    (status, Json(json!({ "error": text.into() }))).into_response()
}

fn internal(err: &dyn std::error::Error) -> Response {
    error!(error = %err, debug = ?err, "internal error");
    message(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE)
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        match self {
            AccountError::Validation(msg) => error_text(StatusCode::BAD_REQUEST, msg),
            AccountError::DuplicateEmail => message(StatusCode::BAD_REQUEST, "Email already in use"),
            AccountError::InvalidCredentials => {
                message(StatusCode::UNAUTHORIZED, "Invalid email or password")
            }
            AccountError::NotFound => message(StatusCode::NOT_FOUND, "User not found"),
            AccountError::Store(e) => {
                warn!(error = %e, "store failure");
                error_text(StatusCode::BAD_REQUEST, e.to_string())
            }
            AccountError::Internal(e) => internal(&*e),
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            AuthRejection::MissingToken
            | AuthRejection::Expired
            | AuthRejection::InvalidToken => message(StatusCode::UNAUTHORIZED, self.to_string()),
            AuthRejection::UserNotFound => message(StatusCode::NOT_FOUND, self.to_string()),
            AuthRejection::InsufficientRole => message(StatusCode::FORBIDDEN, self.to_string()),
            AuthRejection::Internal(e) => internal(&e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Account(e) => e.into_response(),
            ApiError::Auth(e) => e.into_response(),
            ApiError::BadRequest(msg) => error_text(StatusCode::BAD_REQUEST, msg),
            ApiError::RouteNotFound => message(StatusCode::NOT_FOUND, "Route not found"),
        }
    }
}

/// Fallback for unknown paths and for known paths hit with the wrong method.
pub async fn route_not_found() -> ApiError {
    ApiError::RouteNotFound
}

/// Turns a handler panic into the generic 500, keeping the detail in the log.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    error!(panic = %detail, "handler panicked");
    message(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE)
}
