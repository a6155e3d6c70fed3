//! HTTP error taxonomy
//!
//! Every expected failure of a route maps to one variant. The JSON body is
//! always `{status: "error", code, message, details?}`. Route-level
//! failures (unknown route, blocked origin, unexpected errors) are also
//! offered to browsers as an HTML page, see `api::middleware::html_errors`.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use nyvoro_common::application::ValidationErrors;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;

/// Response extension marking an error that may be rendered as HTML
#[derive(Debug, Clone)]
pub struct HtmlErrorPage {
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request payload is invalid.")]
    Validation(ValidationErrors),

    #[error("Request body is too large.")]
    PayloadTooLarge,

    #[error("Application id is required.")]
    ApplicationIdRequired,

    #[error("Magic link token is required.")]
    TokenRequired,

    #[error("Spam detected.")]
    SpamDetected,

    #[error("Captcha verification failed.")]
    CaptchaInvalid(Vec<String>),

    /// 401; message differs between read and edit attempts
    #[error("{0}")]
    InvalidToken(&'static str),

    #[error("Application not found.")]
    NotFound,

    #[error("Requested route does not exist.")]
    RouteNotFound,

    #[error("Too many application requests. Try again later.")]
    RateLimited { retry_after_secs: u64 },

    #[error("Request origin is not allowed by this API.")]
    CorsBlocked,

    #[error("Stored application payload is invalid.")]
    PayloadCorrupted { application_id: String, reason: String },

    /// Anything unanticipated; the detail is logged, never returned
    #[error("Unexpected server error.")]
    Internal(String),
}

impl From<nyvoro_common::Error> for ApiError {
    fn from(err: nyvoro_common::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::ApplicationIdRequired
            | ApiError::TokenRequired
            | ApiError::SpamDetected
            | ApiError::CaptchaInvalid(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            ApiError::CorsBlocked => StatusCode::FORBIDDEN,
            ApiError::NotFound | ApiError::RouteNotFound => StatusCode::NOT_FOUND,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::PayloadCorrupted { .. } | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::PayloadTooLarge => "payload_too_large",
            ApiError::ApplicationIdRequired => "application_id_required",
            ApiError::TokenRequired => "token_required",
            ApiError::SpamDetected => "spam_detected",
            ApiError::CaptchaInvalid(_) => "captcha_invalid",
            ApiError::InvalidToken(_) => "invalid_token",
            ApiError::NotFound => "not_found",
            ApiError::RouteNotFound => "route_not_found",
            ApiError::RateLimited { .. } => "rate_limited",
            ApiError::CorsBlocked => "cors_blocked",
            ApiError::PayloadCorrupted { .. } => "payload_corrupted",
            ApiError::Internal(_) => "internal_error",
        }
    }

    /// JSON error body
    pub fn body(&self) -> Value {
        let mut body = json!({
            "status": "error",
            "code": self.code(),
            "message": self.to_string(),
        });

        match self {
            ApiError::Validation(details) => {
                body["details"] = json!(details);
            }
            ApiError::CaptchaInvalid(errors) => {
                body["errors"] = json!(errors);
            }
            _ => {}
        }

        body
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::PayloadCorrupted { application_id, reason } => {
                error!(application_id = %application_id, "Stored payload failed validation: {}", reason);
            }
            ApiError::Internal(detail) => {
                error!("Unhandled error: {}", detail);
            }
            _ => {}
        }

        let mut response = (self.status(), Json(self.body())).into_response();

        if matches!(
            self,
            ApiError::RouteNotFound | ApiError::CorsBlocked | ApiError::Internal(_)
        ) {
            response.extensions_mut().insert(HtmlErrorPage {
                message: self.to_string(),
            });
        }

        if let ApiError::RateLimited { retry_after_secs } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}
