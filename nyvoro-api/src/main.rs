//! nyvoro-api - Nyvoro Records application intake service
//!
//! Reads configuration from the environment, opens the SQLite store and
//! serves the HTTP API (and optionally the built website).

use anyhow::{Context, Result};
use nyvoro_api::captcha::TurnstileVerifier;
use nyvoro_api::config::AppConfig;
use nyvoro_api::mailer::SmtpNotifier;
use nyvoro_api::{build_router, AppState};
use nyvoro_common::db::init_database;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often expired rate-limit windows are dropped
const RATE_LIMIT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nyvoro_api=info,nyvoro_common=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification before anything slow
    info!(
        "Starting nyvoro-api v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = AppConfig::from_env().context("Invalid configuration")?;
    info!("Environment: {}", config.environment);
    info!("Database: {}", config.database_url);
    if config.turnstile.bypass {
        info!("Captcha verification bypassed");
    }
    if config.trust_proxy {
        info!("Trusting X-Forwarded-For for submission throttling");
    }

    let db = match init_database(&config.database_url).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    let captcha = TurnstileVerifier::new(&config.turnstile, config.http_timeout)
        .context("Failed to build captcha client")?;
    let notifier =
        SmtpNotifier::new(&config.smtp, config.http_timeout).context("Failed to build SMTP transport")?;

    let port = config.port;
    let state = AppState::new(config, db, Arc::new(captcha), Arc::new(notifier));

    let rate_limiter = Arc::clone(&state.rate_limiter);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RATE_LIMIT_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            rate_limiter.retain_recent().await;
        }
    });

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("nyvoro-api listening on http://{}", addr);
    info!("Health check: http://{}/api/v1/health", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("Server error")?;

    Ok(())
}
