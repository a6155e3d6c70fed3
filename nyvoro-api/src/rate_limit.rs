//! Per-client submission throttling
//!
//! Fixed window per client: at most `max` submissions are admitted from
//! the first request of a window until the window elapses, then the count
//! starts over. Clients are keyed by the socket peer address; the
//! `X-Forwarded-For` header is only honoured when `trust_proxy` is set.
//! State lives in memory only and is lost on restart.
//!
//! Every response on a throttled route carries the draft-6 standard
//! headers `RateLimit-Limit`, `RateLimit-Remaining` and `RateLimit-Reset`.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use nyvoro_common::security::UNKNOWN_CLIENT_IP;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::AppState;

pub const RATE_LIMIT_LIMIT: &str = "ratelimit-limit";
pub const RATE_LIMIT_REMAINING: &str = "ratelimit-remaining";
pub const RATE_LIMIT_RESET: &str = "ratelimit-reset";

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Outcome of one admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub admitted: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the client's window resets
    pub reset: Duration,
}

impl RateDecision {
    /// Whole seconds, rounded up, never zero
    pub fn reset_secs(&self) -> u64 {
        self.reset.as_secs_f64().ceil().max(1.0) as u64
    }

    fn write_headers(&self, headers: &mut HeaderMap) {
        let values = [
            (RATE_LIMIT_LIMIT, u64::from(self.limit)),
            (RATE_LIMIT_REMAINING, u64::from(self.remaining)),
            (RATE_LIMIT_RESET, self.reset_secs()),
        ];
        for (name, value) in values {
            headers.insert(name, HeaderValue::from(value));
        }
    }
}

pub struct SubmissionRateLimiter {
    window: Duration,
    max: u32,
    clients: Mutex<HashMap<String, Window>>,
}

impl SubmissionRateLimiter {
    pub fn new(window: Duration, max: u32) -> Self {
        Self {
            window,
            max: max.max(1),
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub async fn check(&self, client: &str) -> RateDecision {
        self.check_at(client, Instant::now()).await
    }

    /// Count one request from `client` at `now`
    pub async fn check_at(&self, client: &str, now: Instant) -> RateDecision {
        let mut clients = self.clients.lock().await;

        let entry = clients.entry(client.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.saturating_duration_since(entry.started) >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        let admitted = entry.count < self.max;
        if admitted {
            entry.count += 1;
        }

        RateDecision {
            admitted,
            limit: self.max,
            remaining: self.max - entry.count,
            reset: self.window.saturating_sub(now.saturating_duration_since(entry.started)),
        }
    }

    /// Drop clients whose window has elapsed
    pub async fn retain_recent(&self) {
        self.retain_recent_at(Instant::now()).await;
    }

    async fn retain_recent_at(&self, now: Instant) {
        let mut clients = self.clients.lock().await;
        let before = clients.len();
        clients.retain(|_, w| now.saturating_duration_since(w.started) < self.window);
        let dropped = before - clients.len();
        if dropped > 0 {
            debug!("Rate limiter dropped {} expired client window(s)", dropped);
        }
    }

    pub async fn tracked_clients(&self) -> usize {
        self.clients.lock().await.len()
    }
}

/// Throttling key: socket peer, or the forwarded client when behind a trusted proxy
fn limiter_key(request: &Request, trust_proxy: bool) -> String {
    if trust_proxy {
        return crate::api::request_client_ip(request);
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT_IP.to_string())
}

/// Middleware placed on the submission route only
pub async fn limit_submissions(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let client = limiter_key(&request, state.config.trust_proxy);
    let decision = state.rate_limiter.check(&client).await;

    let mut response = if decision.admitted {
        next.run(request).await
    } else {
        warn!("Rate limit reached for a client; window resets in {:?}", decision.reset);
        ApiError::RateLimited {
            retry_after_secs: decision.reset_secs(),
        }
        .into_response()
    };

    decision.write_headers(response.headers_mut());
    response
}
