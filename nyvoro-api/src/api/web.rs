//! Browser-facing routes: the API landing page, or the built website

use axum::{
    body::Body,
    extract::{Request, State},
    http::Method,
    response::{Html, IntoResponse, Response},
};
use std::path::{Path, PathBuf};
use tower::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::pages::render_home_page;
use crate::AppState;

/// GET / when the website bundle is not served
pub async fn home_page(State(state): State<AppState>) -> Html<String> {
    Html(render_home_page(state.config.environment))
}

/// `index.html` of the website bundle, when it should be served and exists
pub fn web_index(config: &AppConfig) -> Option<PathBuf> {
    if !config.serve_web_dist {
        return None;
    }
    let index = config.web_dist_dir.join("index.html");
    index.is_file().then_some(index)
}

fn is_api_path(path: &str) -> bool {
    path.starts_with("/api/")
}

/// Fallback when the website is served
///
/// Static files are served as-is; any other GET outside `/api/` gets
/// `index.html` so client-side routes resolve.
pub async fn serve_web_app(State(state): State<AppState>, request: Request) -> Response {
    let method = request.method();
    if is_api_path(request.uri().path()) || (method != Method::GET && method != Method::HEAD) {
        return ApiError::RouteNotFound.into_response();
    }

    let dist: &Path = &state.config.web_dist_dir;
    let service = ServeDir::new(dist).fallback(ServeFile::new(dist.join("index.html")));

    match service.oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_paths() {
        assert!(is_api_path("/api/v1/health"));
        assert!(is_api_path("/api/"));
        assert!(!is_api_path("/api"));
        assert!(!is_api_path("/fr/join"));
    }
}
