use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{area}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Auth errors
/// - E2xxx: Profile/expectation/upload errors
/// - E3xxx: Matching errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    BadRequest,
    PayloadTooLarge,

    // Auth (E1xxx)
    InvalidCredentials,
    EmailAlreadyExists,
    TokenExpired,
    TokenInvalid,
    RefreshTokenRevoked,
    PasswordTooWeak,
    AccountDisabled,

    // Profiles / expectations / uploads (E2xxx)
    UserNotFound,
    ProfileNotFound,
    ProfileAlreadyExists,
    ExpectationNotFound,
    ExpectationAlreadyExists,
    PhotoCountOutOfRange,
    InvalidFileType,
    UploadFailed,

    // Matching (E3xxx)
    MatchNotFound,
    ProfileRequired,
    ExpectationRequired,
    NoCandidates,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::Forbidden => "E0005",
            Self::BadRequest => "E0006",
            Self::PayloadTooLarge => "E0007",

            // Auth
            Self::InvalidCredentials => "E1001",
            Self::EmailAlreadyExists => "E1002",
            Self::TokenExpired => "E1003",
            Self::TokenInvalid => "E1004",
            Self::RefreshTokenRevoked => "E1005",
            Self::PasswordTooWeak => "E1006",
            Self::AccountDisabled => "E1007",

            // Profiles / expectations / uploads
            Self::UserNotFound => "E2001",
            Self::ProfileNotFound => "E2002",
            Self::ProfileAlreadyExists => "E2003",
            Self::ExpectationNotFound => "E2004",
            Self::ExpectationAlreadyExists => "E2005",
            Self::PhotoCountOutOfRange => "E2006",
            Self::InvalidFileType => "E2007",
            Self::UploadFailed => "E2008",

            // Matching
            Self::MatchNotFound => "E3001",
            Self::ProfileRequired => "E3002",
            Self::ExpectationRequired => "E3003",
            Self::NoCandidates => "E3004",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError | Self::BadRequest | Self::PasswordTooWeak
            | Self::PhotoCountOutOfRange | Self::InvalidFileType | Self::UploadFailed
            | Self::ProfileRequired | Self::ExpectationRequired => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound | Self::UserNotFound | Self::ProfileNotFound
            | Self::ExpectationNotFound | Self::MatchNotFound
            | Self::NoCandidates => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::InvalidCredentials | Self::TokenExpired
            | Self::TokenInvalid | Self::RefreshTokenRevoked => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::AccountDisabled => StatusCode::FORBIDDEN,
            Self::EmailAlreadyExists | Self::ProfileAlreadyExists
            | Self::ExpectationAlreadyExists => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message, details } => {
                let status = code.status_code();
                let mut resp = ApiErrorResponse::new(code.code(), message);
                if let Some(d) = details {
                    resp = resp.with_details(d.clone());
                }
                (status, resp)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "internal server error"),
                )
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                match err {
                    diesel::result::Error::NotFound => (
                        StatusCode::NOT_FOUND,
                        ApiErrorResponse::new("E0003", "resource not found"),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiErrorResponse::new("E0001", "database error"),
                    ),
                }
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new("E0002", msg),
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_codes_map_to_409() {
        assert_eq!(ErrorCode::EmailAlreadyExists.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::ProfileAlreadyExists.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::ExpectationAlreadyExists.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn not_found_codes_map_to_404() {
        for code in [
            ErrorCode::ProfileNotFound,
            ErrorCode::ExpectationNotFound,
            ErrorCode::MatchNotFound,
            ErrorCode::NoCandidates,
        ] {
            assert_eq!(code.status_code(), StatusCode::NOT_FOUND);
        }
    }

    #[test]
    fn upload_validation_codes_map_to_400() {
        assert_eq!(ErrorCode::PhotoCountOutOfRange.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::InvalidFileType.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(ErrorCode::InvalidCredentials.code(), "E1001");
        assert_eq!(ErrorCode::ProfileNotFound.code(), "E2002");
        assert_eq!(ErrorCode::MatchNotFound.code(), "E3001");
    }
}
