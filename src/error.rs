use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Failures raised by the repository backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint was hit; carries the field name.
    #[error("duplicate {0}")]
    Duplicate(&'static str),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub(crate) fn missing_user(id: crate::object_id::ObjectId) -> StoreError {
    StoreError::Backend(anyhow::anyhow!("user {id} not found"))
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                let field = match db.constraint() {
                    Some(c) if c.contains("email") => "email",
                    Some(c) if c.contains("title") => "title",
                    Some(c) if c.contains("token") => "token",
                    _ => "key",
                };
                return StoreError::Duplicate(field);
            }
        }
        StoreError::Backend(e.into())
    }
}

/// Authentication failures. Kept distinct for logs; clients only ever see the
/// status code.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing auth token")]
    MissingToken,
    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("token is not registered for its user")]
    UnknownToken,
    #[error("no user with that email")]
    UnknownEmail,
    #[error("password mismatch")]
    WrongPassword,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("password hashing failed: {0}")]
    Hash(anyhow::Error),
    #[error("token signing failed: {0}")]
    Signing(jsonwebtoken::errors::Error),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("duplicate {0}")]
    DuplicateKey(&'static str),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(field) => AppError::DuplicateKey(field),
            StoreError::Backend(e) => AppError::Internal(e),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(msg) => {
                warn!(reason = %msg, "validation error");
                (StatusCode::BAD_REQUEST, Json(json!({ "error": "invalid" }))).into_response()
            }
            AppError::DuplicateKey(field) => {
                warn!(field, "duplicate key");
                (StatusCode::BAD_REQUEST, Json(json!({ "error": "duplicate" }))).into_response()
            }
            AppError::NotFound => (StatusCode::NOT_FOUND, Json(json!({}))).into_response(),
            AppError::Auth(e) => match e {
                AuthError::MissingToken | AuthError::InvalidToken(_) | AuthError::UnknownToken => {
                    warn!(error = %e, "request rejected");
                    StatusCode::UNAUTHORIZED.into_response()
                }
                AuthError::UnknownEmail | AuthError::WrongPassword => {
                    warn!(error = %e, "invalid credentials");
                    StatusCode::BAD_REQUEST.into_response()
                }
                AuthError::Store(StoreError::Duplicate(field)) => {
                    warn!(field, "duplicate key");
                    (StatusCode::BAD_REQUEST, Json(json!({ "error": "duplicate" }))).into_response()
                }
                AuthError::Store(StoreError::Backend(_))
                | AuthError::Hash(_)
                | AuthError::Signing(_) => {
                    error!(error = %e, "auth backend failure");
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
            },
            AppError::Internal(e) => {
                error!(error = %e, "internal error");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_hides_detail() {
        let cases = [
            (AppError::validation("title too short"), StatusCode::BAD_REQUEST),
            (AppError::DuplicateKey("email"), StatusCode::BAD_REQUEST),
            (AppError::NotFound, StatusCode::NOT_FOUND),
            (AppError::Auth(AuthError::UnknownToken), StatusCode::UNAUTHORIZED),
            (AppError::Auth(AuthError::MissingToken), StatusCode::UNAUTHORIZED),
            (AppError::Auth(AuthError::WrongPassword), StatusCode::BAD_REQUEST),
            (AppError::Auth(AuthError::UnknownEmail), StatusCode::BAD_REQUEST),
            (
                AppError::Internal(anyhow::anyhow!("connection reset")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn store_duplicate_becomes_duplicate_key() {
        let err: AppError = StoreError::Duplicate("title").into();
        assert!(matches!(err, AppError::DuplicateKey("title")));
    }
}
