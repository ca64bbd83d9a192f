//! Error types for the clinic API.
//!
//! Every handler returns [`ApiResult`]. Repository errors are mapped here and
//! only here:
//!
//! | Kind                                   | Status | Code                 |
//! |----------------------------------------|--------|----------------------|
//! | Order / stock item / issuance missing  | 404    | `NOT_FOUND`          |
//! | Order or issuance in the wrong state   | 409    | `INVALID_STATE`      |
//! | Not enough stock                       | 400    | `INSUFFICIENT_STOCK` |
//! | Bad input                              | 400    | `VALIDATION_ERROR`   |
//! | No / bad credentials                   | 401    | `UNAUTHORIZED`       |
//! | Missing capability                     | 403    | `FORBIDDEN`          |
//! | Duplicate unique value                 | 409    | `CONFLICT`           |
//! | Anything else                          | 500    | `INTERNAL`           |

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use clinic_core::{CoreError, ValidationError};
use clinic_db::DbError;

/// API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    InsufficientStock(String),

    #[error("{message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    /// The detail is logged, never sent.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ApiError {
    pub fn unauthorized() -> Self {
        ApiError::Unauthorized("Authentication required".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidState(_) | ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InsufficientStock(_) | ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InvalidState(_) => "INVALID_STATE",
            ApiError::InsufficientStock(_) => "INSUFFICIENT_STOCK",
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Internal(_) => "INTERNAL",
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation {
            field: Some(err.field().to_string()),
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::OrderNotFound(_)
            | CoreError::StockItemNotFound(_)
            | CoreError::IssuanceNotFound(_) => ApiError::NotFound(message),
            CoreError::InvalidOrderState { .. }
            | CoreError::AlreadyReturned(_)
            | CoreError::AlreadyDamaged(_)
            | CoreError::HasIssuances { .. }
            | CoreError::InvalidStatusTransition { .. } => ApiError::InvalidState(message),
            CoreError::InsufficientStock { .. } => ApiError::InsufficientStock(message),
            CoreError::InvalidPayment { .. } => ApiError::Validation {
                message,
                field: Some("amountCents".to_string()),
            },
            CoreError::Validation(v) => v.into(),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Rule(core) => core.into(),
            DbError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            DbError::UniqueViolation { .. } | DbError::ForeignKeyViolation { .. } => {
                ApiError::Conflict(err.to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let (message, field) = match self {
            ApiError::Internal(detail) => {
                error!(error = %detail, "Request failed with internal error");
                ("Internal server error".to_string(), None)
            }
            ApiError::Validation { message, field } => (message, field),
            other => (other.to_string(), None),
        };

        let body = ErrorBody {
            error: message,
            code,
            field,
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
