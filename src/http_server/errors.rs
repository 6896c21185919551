//! # HTTP API Errors
//!
//! Every error leaves the server as `{"error": {"code", "message"}}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::users::UserError;

/// Result type for HTTP handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// HTTP API errors
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    // ==================
    // Client Errors (4xx)
    // ==================
    /// Request body missing, malformed or of the wrong shape
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// Path parameter could not be parsed
    #[error("Invalid path parameter: {0}")]
    InvalidPath(String),

    /// Query string could not be parsed
    #[error("Invalid query parameter: {0}")]
    InvalidQuery(String),

    /// No route matches
    #[error("Route not found")]
    RouteNotFound,

    // ==================
    // Domain Errors
    // ==================
    #[error("{0}")]
    User(#[from] UserError),

    // ==================
    // Server Errors (5xx)
    // ==================
    /// A handler panicked; recovered by the panic layer
    #[error("Internal server error")]
    Panic,
}

impl ApiError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidBody(_) | ApiError::InvalidPath(_) | ApiError::InvalidQuery(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::RouteNotFound => StatusCode::NOT_FOUND,
            ApiError::User(err) => StatusCode::from_u16(err.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            ApiError::Panic => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidBody(_) => "INVALID_BODY",
            ApiError::InvalidPath(_) => "INVALID_PATH_PARAMETER",
            ApiError::InvalidQuery(_) => "INVALID_QUERY_PARAMETER",
            ApiError::RouteNotFound => "ROUTE_NOT_FOUND",
            ApiError::User(err) => err.code(),
            ApiError::Panic => "INTERNAL_ERROR",
        }
    }
}

/// `{"code", "message"}`
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

impl From<&ApiError> for ErrorResponse {
    fn from(err: &ApiError) -> Self {
        // Infrastructure details stay in the logs
        let message = match err {
            ApiError::User(user) if user.is_infrastructure() => match user.status_code() {
                408 => "Request timed out".to_string(),
                503 => "Service temporarily unavailable".to_string(),
                _ => "Internal server error".to_string(),
            },
            other => other.to_string(),
        };
        Self {
            error: ErrorDetail {
                code: err.code().to_string(),
                message,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse::from(&self));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use crate::txn::TxError;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::InvalidBody("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(UserError::Conflict {
                id: 1,
                expected: 1,
                actual: None
            })
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(UserError::from(TxError::Cancelled)).status_code(),
            StatusCode::REQUEST_TIMEOUT
        );
    }

    #[test]
    fn test_infrastructure_message_is_generic() {
        let err = ApiError::from(UserError::from(TxError::Commit(StoreError::CommitFailed(
            "disk on fire".into(),
        ))));
        let body = ErrorResponse::from(&err);
        assert_eq!(body.error.code, "TRANSACTION_FAILED");
        assert!(!body.error.message.contains("disk"));
    }

    #[test]
    fn test_body_shape() {
        let body = ErrorResponse::from(&ApiError::from(UserError::NotFound { id: 3 }));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"]["code"], "USER_NOT_FOUND");
        assert_eq!(json["error"]["message"], "user 3 not found");
    }
}
