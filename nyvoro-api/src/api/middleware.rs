//! Cross-cutting request handling: origin policy, HTML error pages,
//! panic recovery and the 404 fallback

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue, Method, Response as HttpResponse},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::any::Any;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{error, warn};

use crate::config::AppConfig;
use crate::error::{ApiError, HtmlErrorPage};
use crate::pages::{render_error_page, wants_html};
use crate::AppState;

/// CORS headers for the configured origins
pub fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Invalid CORS origin in config; skipping");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(600))
}

/// Reject requests whose `Origin` is present but not allow-listed
///
/// Requests without an `Origin` header (curl, server-to-server) pass.
pub async fn cors_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(origin) = request.headers().get(header::ORIGIN) {
        let allowed = origin
            .to_str()
            .map(|origin| state.config.allowed_origins.iter().any(|a| a == origin))
            .unwrap_or(false);

        if !allowed {
            warn!("Blocked request from origin {:?}", origin);
            return ApiError::CorsBlocked.into_response();
        }
    }

    next.run(request).await
}

/// Swap marked JSON error bodies for the HTML error page when the client
/// accepts `text/html`
///
/// Only the path is echoed back, never the query string.
pub async fn html_errors(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let accepts_html = wants_html(request.headers());
    let path = request.uri().path().to_string();

    let response = next.run(request).await;
    if !accepts_html {
        return response;
    }

    let Some(page) = response.extensions().get::<HtmlErrorPage>().cloned() else {
        return response;
    };

    let (mut parts, _json) = response.into_parts();
    let html = render_error_page(
        parts.status,
        state.config.environment,
        Some(&page.message),
        Some(&path),
    );

    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );

    Response::from_parts(parts, Body::from(html))
}

/// Handler-level panics become a 500 `internal_error`
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> HttpResponse<Body> {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    error!("Request handler panicked: {}", detail);
    ApiError::Internal(format!("panic: {}", detail)).into_response()
}

pub async fn route_not_found() -> ApiError {
    ApiError::RouteNotFound
}
