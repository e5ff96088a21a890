use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::identity::IdentityError;

/// AppError
///
/// The single error taxonomy of the service. Authentication, authorization, not-found and
/// validation failures are produced locally by handlers and turned into structured responses.
/// Everything else (store connectivity, hashing, token minting) is logged and surfaces as a
/// generic 500 without leaking details to the client.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing, malformed, expired or forged token, or bad login credentials.
    #[error("unauthorized")]
    Unauthorized,
    /// Valid token whose role is not in the route's permitted set.
    #[error("forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
    /// The path exists but the HTTP method is not routed for it.
    #[error("method not allowed")]
    MethodNotAllowed,
    /// Credential-service validation failures, returned to the caller in order.
    #[error("validation failed: {0:?}")]
    Validation(Vec<IdentityError>),
    #[error("{0}")]
    BadRequest(String),
    #[error("database operation failed")]
    Database(#[from] sqlx::Error),
    #[error("database migration failed")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("password hashing failed")]
    Hashing(#[from] bcrypt::BcryptError),
    #[error("token operation failed")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            AppError::Forbidden => StatusCode::FORBIDDEN.into_response(),
            AppError::NotFound => StatusCode::NOT_FOUND.into_response(),
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED.into_response(),
            AppError::Validation(errors) => (StatusCode::BAD_REQUEST, Json(errors)).into_response(),
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            e @ (AppError::Database(_)
            | AppError::Migration(_)
            | AppError::Hashing(_)
            | AppError::Token(_)
            | AppError::Internal(_)) => {
                tracing::error!(
                    error.cause_chain = ?e,
                    error.message = %e,
                    "Unexpected error happened"
                );
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
