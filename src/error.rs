use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "Not found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "Bad request", Some(msg.clone()))
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
            AppError::Json(e) => {
                tracing::error!("JSON error: {}", e);
                (StatusCode::BAD_REQUEST, "Invalid JSON", Some(e.to_string()))
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Failures on the webhook ingestion path.
///
/// Anything fatal rolls the whole transaction back, ledger row included, so
/// the provider's retry sees the event as fresh. Unknown event types are not
/// represented here - they are skipped with a successful response, not
/// treated as errors.
#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("invalid webhook signature")]
    SignatureInvalid,

    #[error("webhook secret is not configured")]
    ConfigurationMissing,

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("missing required field: {0}")]
    MissingRequiredField(&'static str),

    #[error("cannot resolve billing period")]
    UnresolvablePeriod,

    #[error("unsupported payment mode: {0}")]
    UnsupportedPaymentMode(String),

    #[error("no user bound to customer {0}")]
    UserNotFound(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

impl From<AppError> for WebhookError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Database(e) => WebhookError::Database(e),
            AppError::Pool(e) => WebhookError::Pool(e),
            other => WebhookError::MalformedPayload(other.to_string()),
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::SignatureInvalid => StatusCode::UNAUTHORIZED,
            WebhookError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            WebhookError::MissingRequiredField(_)
            | WebhookError::UnresolvablePeriod
            | WebhookError::UnsupportedPaymentMode(_)
            | WebhookError::UserNotFound(_) => StatusCode::UNPROCESSABLE_ENTITY,
            WebhookError::ConfigurationMissing => StatusCode::INTERNAL_SERVER_ERROR,
            WebhookError::Database(e) => {
                tracing::error!("Database error in webhook handler: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            WebhookError::Pool(e) => {
                tracing::error!("Pool error in webhook handler: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = serde_json::json!({
            "received": false,
            "message": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}
