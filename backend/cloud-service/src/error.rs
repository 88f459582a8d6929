/// Error types for cloud-service
///
/// Every handler returns `Result<T>`; `AppError` renders the JSON error body
/// `{error, message, retryAfter?}`; 429s go through `rate_limit::too_many_requests`
/// so they match the scope middleware. Server-side failures are logged here
/// and reach the client only as a generic message.
use crate::db::StoreError;
use crate::services::FeedError;
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use chrono::Utc;
use rate_limit::{too_many_requests, RateLimitDecision};
use serde::Serialize;
use thiserror::Error;

/// Result type for cloud-service operations
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Names the missing resource, e.g. `NotFound("post")`
    #[error("{0} not found")]
    NotFound(String),

    #[error("Rate limit exceeded")]
    RateLimited(RateLimitDecision),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl AppError {
    fn error_type(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::RateLimited(_) => "RATE_LIMIT_EXCEEDED",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Store(_) | AppError::Feed(_) | AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn is_server_error(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Store(_) | AppError::Feed(_) | AppError::Internal(_)
        )
    }
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(what) => AppError::NotFound(what.to_string()),
            StoreError::Database(e) => AppError::Database(e),
            other => AppError::Store(other),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Database(_)
            | AppError::Store(_)
            | AppError::Feed(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();

        let message = if self.is_server_error() {
            tracing::error!(error = %self, "Request failed with internal error");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        if let AppError::RateLimited(decision) = self {
            return too_many_requests(decision, Utc::now().timestamp_millis());
        }

        HttpResponse::build(status_code).json(ErrorResponse {
            error: self.error_type().to_string(),
            message,
        })
    }
}

// Convert validator errors to AppError with the per-field messages
impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();
        messages.sort();

        if messages.is_empty() {
            AppError::Validation(errors.to_string())
        } else {
            AppError::Validation(messages.join("; "))
        }
    }
}
