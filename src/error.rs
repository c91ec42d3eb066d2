/// Error Model
///
/// Every failure in the service is an [`ApiError`]: a status code, a message,
/// an operational flag and an optional cause. Expected failures (bad
/// credentials, validation, forbidden) are operational and safe to describe to
/// the caller. Everything else is non-operational and is only described in full
/// outside production.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::Serialize;
use std::fmt;

use crate::configuration::Environment;

/// Message shown in production for non-operational failures.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong";

// ============================================================================
// 1. TAXONOMY
// ============================================================================

/// The failure classes the service can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    AuthRequired,
    TokenMissing,
    InvalidTokenType,
    InvalidOrExpiredToken,
    UserNotFound,
    InvalidCredentials,
    InvalidRefreshToken,
    RefreshTokenMismatch,
    Forbidden,
    ValidationFailed,
    NotFound,
    MethodNotAllowed,
    Conflict,
    StorageUnavailable,
    InternalError,
}

impl ErrorKind {
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::AuthRequired
            | ErrorKind::TokenMissing
            | ErrorKind::InvalidTokenType
            | ErrorKind::InvalidOrExpiredToken
            | ErrorKind::UserNotFound
            | ErrorKind::InvalidCredentials
            | ErrorKind::InvalidRefreshToken
            | ErrorKind::RefreshTokenMismatch => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::ValidationFailed => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_operational(self) -> bool {
        !matches!(self, ErrorKind::StorageUnavailable | ErrorKind::InternalError)
    }

    pub fn default_message(self) -> &'static str {
        match self {
            ErrorKind::AuthRequired => "Authentication required",
            ErrorKind::TokenMissing => "Authentication token not provided",
            ErrorKind::InvalidTokenType => "Invalid token type",
            ErrorKind::InvalidOrExpiredToken => "Invalid or expired token",
            ErrorKind::UserNotFound => "User not found",
            ErrorKind::InvalidCredentials => "Incorrect email or password",
            ErrorKind::InvalidRefreshToken => "Invalid refresh token",
            ErrorKind::RefreshTokenMismatch => "Refresh token mismatch",
            ErrorKind::Forbidden => "Forbidden: Insufficient permissions",
            ErrorKind::ValidationFailed => "Validation failed",
            ErrorKind::NotFound => "Not found",
            ErrorKind::MethodNotAllowed => "Method not allowed",
            ErrorKind::Conflict => "Email already taken",
            ErrorKind::StorageUnavailable => "Storage unavailable",
            ErrorKind::InternalError => "Internal server error",
        }
    }

    /// Stable machine-readable code, included in non-production bodies.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::AuthRequired => "AUTH_REQUIRED",
            ErrorKind::TokenMissing => "TOKEN_MISSING",
            ErrorKind::InvalidTokenType => "INVALID_TOKEN_TYPE",
            ErrorKind::InvalidOrExpiredToken => "TOKEN_INVALID",
            ErrorKind::UserNotFound => "USER_NOT_FOUND",
            ErrorKind::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorKind::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            ErrorKind::RefreshTokenMismatch => "REFRESH_TOKEN_MISMATCH",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::ValidationFailed => "VALIDATION_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            ErrorKind::Conflict => "DUPLICATE_ENTRY",
            ErrorKind::StorageUnavailable => "SERVICE_UNAVAILABLE",
            ErrorKind::InternalError => "INTERNAL_ERROR",
        }
    }
}

// ============================================================================
// 2. UNIFORM ERROR SHAPE
// ============================================================================

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    kind: ErrorKind,
    status_code: StatusCode,
    message: String,
    is_operational: bool,
    cause: Option<String>,
}

impl ApiError {
    /// Error of `kind` with its default message.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            status_code: kind.status_code(),
            message: kind.default_message().to_string(),
            is_operational: kind.is_operational(),
            cause: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }

    pub fn validation(details: impl fmt::Display) -> Self {
        Self::new(ErrorKind::ValidationFailed).with_message(format!("Validation failed: {}", details))
    }

    pub fn not_found(path: &str) -> Self {
        Self::new(ErrorKind::NotFound).with_message(format!("Not found: {}", path))
    }

    pub fn internal(cause: impl fmt::Display) -> Self {
        Self::new(ErrorKind::InternalError).with_cause(cause)
    }

    /// Normalize an error raised outside the taxonomy.
    ///
    /// Client-error statuses look like a caller mistake and keep their
    /// status; anything else becomes a 500. The result is never operational.
    pub fn from_foreign(status: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        let (kind, status_code) = if status.is_client_error() {
            (ErrorKind::ValidationFailed, status)
        } else {
            (ErrorKind::InternalError, StatusCode::INTERNAL_SERVER_ERROR)
        };
        let message = if message.trim().is_empty() {
            kind.default_message().to_string()
        } else {
            message
        };

        Self {
            kind,
            status_code,
            cause: Some(message.clone()),
            message,
            is_operational: false,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> StatusCode {
        self.status_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_operational(&self) -> bool {
        self.is_operational
    }

    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }
}

impl From<ErrorKind> for ApiError {
    fn from(kind: ErrorKind) -> Self {
        ApiError::new(kind)
    }
}

/// Failures reported by a user store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate entry: {0}")]
    Duplicate(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                StoreError::Duplicate(db.message().to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(_) => ApiError::new(ErrorKind::Conflict).with_cause(err),
            StoreError::Unavailable(_) => ApiError::new(ErrorKind::StorageUnavailable).with_cause(err),
            StoreError::Backend(_) => ApiError::internal(err),
        }
    }
}

// ============================================================================
// 3. HTTP RENDERING
// ============================================================================

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

/// Extra detail only rendered outside production.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    pub code: &'static str,
    pub status_code: u16,
    pub is_operational: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl ApiError {
    /// Build the response body for `environment`.
    pub fn body(&self, environment: Environment) -> ErrorBody {
        if environment.is_production() {
            let message = if self.is_operational {
                self.message.clone()
            } else {
                GENERIC_ERROR_MESSAGE.to_string()
            };
            return ErrorBody { status: "error", message, error: None };
        }

        ErrorBody {
            status: "error",
            message: self.message.clone(),
            error: Some(ErrorDetail {
                code: self.kind.code(),
                status_code: self.status_code.as_u16(),
                is_operational: self.is_operational,
                cause: self.cause.clone(),
            }),
        }
    }

    /// Render for `environment`, logging non-operational failures server-side.
    pub fn render(&self, environment: Environment, request_path: &str) -> HttpResponse {
        if self.is_operational {
            tracing::debug!(
                path = request_path,
                code = self.kind.code(),
                status = self.status_code.as_u16(),
                "Request rejected: {}",
                self.message
            );
        } else {
            tracing::error!(
                path = request_path,
                code = self.kind.code(),
                status = self.status_code.as_u16(),
                cause = self.cause.as_deref().unwrap_or(""),
                "Unexpected error: {}",
                self.message
            );
        }

        HttpResponse::build(self.status_code).json(self.body(environment))
    }
}

/// Without an [`crate::middleware::ErrorResponder`] in front, errors render
/// in the production form so nothing leaks by default.
impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.status_code
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code).json(self.body(Environment::Production))
    }
}
