use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::types::{ErrorContext, View, found};
use crate::services::{AuthError, BlogError};

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),

    /// Answered with `302 Found`; used when an action is refused.
    Redirect(String),

    DatabaseError(String),

    ValidationError(String),

    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Redirect(location) => write!(f, "Redirect to {}", location),
            ApiError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            ApiError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, template, message) = match &self {
            ApiError::Redirect(location) => return found(location),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "404.html", msg.clone()),
            ApiError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "500.html",
                    "A database error occurred".to_string(),
                )
            }
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, "400.html", msg.clone()),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "500.html",
                    "An internal error occurred".to_string(),
                )
            }
        };

        (status, View::new(template, ErrorContext { message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl From<BlogError> for ApiError {
    fn from(err: BlogError) -> Self {
        match err {
            BlogError::PostNotFound(id) => ApiError::not_found("Post", id),
            BlogError::Forbidden(_) => ApiError::home(),
            BlogError::LoginRequired => ApiError::Redirect(super::auth::LOGIN_URL.to_string()),
            BlogError::Validation(errors) => ApiError::ValidationError(errors.to_string()),
            BlogError::Database(msg) => ApiError::DatabaseError(msg),
            BlogError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::UserNotFound => ApiError::NotFound("User not found".to_string()),
            AuthError::InvalidLink => ApiError::NotFound("Invalid link".to_string()),
            AuthError::AlreadyActive => ApiError::ValidationError("Account is already active".to_string()),
            AuthError::Validation(errors) => ApiError::ValidationError(errors.to_string()),
            AuthError::Mail(e) => ApiError::InternalError(e.to_string()),
            AuthError::Database(msg) => ApiError::DatabaseError(msg),
            AuthError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl ApiError {
    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        ApiError::NotFound(format!("{} {} not found", resource, id))
    }

    /// Back to the post list.
    pub fn home() -> Self {
        ApiError::Redirect("/".to_string())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::InternalError(msg.into())
    }
}
