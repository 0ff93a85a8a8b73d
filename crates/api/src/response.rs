use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use services::{CoverageError, QuestionError, RoundError};

#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

/// Wraps `data` in the `{success: true, data}` envelope.
pub fn ok<T: Serialize>(data: T) -> Json<SuccessResponse<T>> {
    Json(SuccessResponse {
        success: true,
        data,
    })
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    details: Option<Value>,
    is_operational: bool,
}

impl AppError {
    pub fn not_found(code: &str, message: impl Into<String>) -> Self {
        Self::operational(StatusCode::NOT_FOUND, code, message)
    }

    pub fn conflict(code: &str, message: impl Into<String>) -> Self {
        Self::operational(StatusCode::CONFLICT, code, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn validation(code: &str, message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::operational(
            StatusCode::SERVICE_UNAVAILABLE,
            "PERSISTENCE_UNAVAILABLE",
            message,
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
            details: None,
            is_operational: false,
        }
    }

    /// Attach structured context for the client.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    fn operational(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.to_string(),
            message: message.into(),
            details: None,
            is_operational: true,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.is_operational {
            self.message
        } else {
            error!(code = %self.code, error = %self.message, "request failed");
            "internal server error".to_string()
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code: self.code,
            details: self.details,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<RoundError> for AppError {
    fn from(err: RoundError) -> Self {
        let message = err.to_string();
        match err {
            RoundError::InvalidFilters(_) => Self::validation("INVALID_FILTERS", message),
            RoundError::ActiveRoundExists => Self::conflict("ACTIVE_ROUND_EXISTS", message),
            RoundError::NoActiveRound => Self::not_found("NO_ACTIVE_ROUND", message),
            RoundError::RoundNotFound(_) => Self::not_found("ROUND_NOT_FOUND", message),
            RoundError::GuessNotFound(_) => Self::not_found("GUESS_NOT_FOUND", message),
            RoundError::GuessAlreadyFinalized(_) => {
                Self::conflict("GUESS_ALREADY_FINALIZED", message)
            }
            RoundError::RoundCompleted(_) => Self::conflict("ROUND_COMPLETED", message),
            RoundError::PersistenceUnavailable(_) => Self::unavailable(message),
            _ => Self::internal(message),
        }
    }
}

impl From<QuestionError> for AppError {
    fn from(err: QuestionError) -> Self {
        let message = err.to_string();
        match err {
            QuestionError::InvalidFilters(_) => Self::validation("INVALID_FILTERS", message),
            QuestionError::CountOutOfRange { .. } => Self::validation("INVALID_COUNT", message),
            QuestionError::UnknownVerb(_) => Self::not_found("VERB_NOT_FOUND", message),
            _ => Self::internal(message),
        }
    }
}

impl From<CoverageError> for AppError {
    fn from(err: CoverageError) -> Self {
        let message = err.to_string();
        match err {
            CoverageError::InvalidDateRange => Self::validation("INVALID_DATE_RANGE", message),
            _ => Self::internal(message),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::validation("INVALID_ID", rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}
