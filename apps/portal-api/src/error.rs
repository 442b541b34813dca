//! HTTP error mapping for the portal API.
//!
//! Every failure leaves the API as `{"error": <message>, "code": <CODE>}`.
//! Internal failures are logged with their detail and answered with a
//! generic message.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use perkhub_core::CoreError;
use perkhub_db::DbError;

use crate::services::ServiceError;

/// An error response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        ApiError {
            status,
            code,
            message: message.into(),
        }
    }

    /// A 500 whose detail is logged, never returned.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        error!(error = %detail, "Internal error");
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL",
            "Internal server error",
        )
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::Validation(_) => {
                ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION", message)
            }
            CoreError::Unauthenticated => {
                ApiError::new(StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", message)
            }
            CoreError::Unauthorized { .. } => {
                ApiError::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
            }
            CoreError::NotFound { .. } => {
                ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
            }
            CoreError::UserNotFound(_) => {
                ApiError::new(StatusCode::NOT_FOUND, "USER_NOT_FOUND", message)
            }
            CoreError::AlreadyRedeemed { .. } => {
                ApiError::new(StatusCode::BAD_REQUEST, "ALREADY_REDEEMED", message)
            }
            CoreError::CodeExpired { .. } => {
                ApiError::new(StatusCode::BAD_REQUEST, "CODE_EXPIRED", message)
            }
            CoreError::InsufficientBalance { .. } => {
                ApiError::new(StatusCode::BAD_REQUEST, "INSUFFICIENT_BALANCE", message)
            }
            CoreError::Conflict(_) => ApiError::new(StatusCode::CONFLICT, "CONFLICT", message),
            CoreError::CodeSpaceExhausted { .. } => ApiError::internal(message),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { .. } => {
                ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string())
            }
            DbError::UniqueViolation { ref field, .. } => ApiError::new(
                StatusCode::CONFLICT,
                "DUPLICATE",
                format!("Duplicate {field}"),
            ),
            DbError::Busy => ApiError::new(StatusCode::CONFLICT, "BUSY", err.to_string()),
            other => ApiError::internal(other),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Core(e) => e.into(),
            ServiceError::Db(e) => e.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, "INVALID_JSON", rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "code": self.code,
        }));
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perkhub_core::{UserRole, ValidationError};

    #[test]
    fn test_core_error_status_mapping() {
        let cases = [
            (
                CoreError::Validation(ValidationError::Required {
                    field: "code".to_string(),
                }),
                StatusCode::BAD_REQUEST,
            ),
            (CoreError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (
                CoreError::Unauthorized {
                    required: UserRole::Superadmin,
                },
                StatusCode::UNAUTHORIZED,
            ),
            (CoreError::not_found("Voucher", "v1"), StatusCode::NOT_FOUND),
            (
                CoreError::UserNotFound("u1".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                CoreError::AlreadyRedeemed {
                    code: "ABCD-EFGH-IJKL-MNOP".to_string(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                CoreError::InsufficientBalance {
                    available: 1,
                    requested: 2,
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                CoreError::Conflict("retry".to_string()),
                StatusCode::CONFLICT,
            ),
            (
                CoreError::CodeSpaceExhausted { attempts: 20 },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn test_already_redeemed_message() {
        let err = ApiError::from(CoreError::AlreadyRedeemed {
            code: "ABCD-EFGH-IJKL-MNOP".to_string(),
        });
        assert_eq!(err.message, "ABCD-EFGH-IJKL-MNOP has already been redeemed");
    }

    #[test]
    fn test_internal_detail_is_hidden() {
        let err = ApiError::from(DbError::QueryFailed("no such table: users".to_string()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("users"));

        let busy = ApiError::from(DbError::Busy);
        assert_eq!(busy.status, StatusCode::CONFLICT);
        assert_eq!(busy.code, "BUSY");
    }
}
