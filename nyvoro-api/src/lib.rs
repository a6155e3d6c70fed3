//! nyvoro-api library - application intake and magic-link profile service
//!
//! Accepts artist applications for Nyvoro Records, stores them in SQLite,
//! notifies the label by e-mail and hands the applicant two capability
//! links: one to view the stored profile, one to edit it.

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue},
    middleware,
    routing::get,
    Router,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{info, warn};

pub mod api;
pub mod captcha;
pub mod config;
pub mod email_template;
pub mod error;
pub mod intake;
pub mod links;
pub mod mailer;
pub mod pages;
pub mod rate_limit;

use captcha::CaptchaVerifier;
use config::{AppConfig, Environment};
use intake::IntakeService;
use mailer::Notifier;
use rate_limit::SubmissionRateLimiter;

/// JSON request bodies above this size are rejected
pub const BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: SqlitePool,
    pub intake: IntakeService,
    pub rate_limiter: Arc<SubmissionRateLimiter>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        db: SqlitePool,
        captcha: Arc<dyn CaptchaVerifier>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let config = Arc::new(config);
        let rate_limiter = Arc::new(SubmissionRateLimiter::new(
            config.rate_limit_window,
            config.rate_limit_max,
        ));
        let intake = IntakeService::new(db.clone(), Arc::clone(&config), captcha, notifier);

        Self {
            config,
            db,
            intake,
            rate_limiter,
        }
    }
}

/// Build application router
///
/// Layers, innermost first: body limit, CORS headers, origin guard, panic
/// recovery, HTML error negotiation, security headers, request tracing.
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .merge(api::application_routes(state.clone()))
        .merge(api::health_routes());

    router = match api::web::web_index(&state.config) {
        Some(index) => {
            info!("Serving website bundle from {}", state.config.web_dist_dir.display());
            info!("Client-side routes fall back to {}", index.display());
            router.fallback(api::web::serve_web_app)
        }
        None => {
            if state.config.environment != Environment::Test {
                warn!(
                    "Website bundle not served (serve_web_dist={}, path={})",
                    state.config.serve_web_dist,
                    state.config.web_dist_dir.display()
                );
            }
            router
                .route("/", get(api::web::home_page))
                .fallback(api::middleware::route_not_found)
        }
    };

    router
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(api::middleware::cors_layer(&state.config))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::middleware::cors_guard,
        ))
        .layer(CatchPanicLayer::custom(api::middleware::handle_panic))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::middleware::html_errors,
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
