//! Application submission and magic-link profile endpoints

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    middleware,
    routing::{get, post},
    Json, Router,
};
use nyvoro_common::application::ValidationErrors;
use serde::Deserialize;
use serde_json::Value;
use std::net::SocketAddr;

use super::middleware::route_not_found;
use crate::error::ApiError;
use crate::intake::{ProfileUpdated, ProfileView, SubmissionContext, SubmissionReceipt, SubmissionStatus};
use crate::rate_limit::limit_submissions;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

/// Body rejections become `400 validation_error`, except oversized bodies
fn json_body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    payload.map(|Json(value)| value).map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            ApiError::Validation(ValidationErrors::form(rejection.body_text()))
        }
    })
}

fn token(query: Option<Query<TokenQuery>>) -> Option<String> {
    query.and_then(|Query(q)| q.token)
}

/// POST /api/v1/applications
pub async fn create_application(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmissionReceipt>), ApiError> {
    let body = json_body(payload)?;

    let ctx = SubmissionContext {
        client_ip: super::client_ip_from(&headers, peer.map(|ConnectInfo(addr)| addr)),
        origin: headers
            .get(header::ORIGIN)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };

    let receipt = state.intake.submit(body, ctx).await?;
    let status = match receipt.status {
        SubmissionStatus::Ok => StatusCode::CREATED,
        SubmissionStatus::StoredWithEmailError => StatusCode::ACCEPTED,
    };

    Ok((status, Json(receipt)))
}

/// GET /api/v1/applications/:application_id/profile?token=...
pub async fn get_profile(
    State(state): State<AppState>,
    Path(application_id): Path<String>,
    query: Option<Query<TokenQuery>>,
) -> Result<Json<ProfileView>, ApiError> {
    let view = state
        .intake
        .get_profile(&application_id, token(query).as_deref())
        .await?;
    Ok(Json(view))
}

/// PUT /api/v1/applications/:application_id/profile?token=...
pub async fn update_profile(
    State(state): State<AppState>,
    Path(application_id): Path<String>,
    query: Option<Query<TokenQuery>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ProfileUpdated>, ApiError> {
    let updated = state
        .intake
        .update_profile(&application_id, token(query).as_deref(), json_body(payload))
        .await?;
    Ok(Json(updated))
}

/// Submission route is rate limited; profile routes are not
///
/// Unsupported methods answer `404 route_not_found` without touching the
/// limiter, so the fallback must be attached after `.layer`.
pub fn application_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/applications",
            post(create_application)
                .layer(middleware::from_fn_with_state(state, limit_submissions))
                .fallback(route_not_found),
        )
        .route(
            "/api/v1/applications/:application_id/profile",
            get(get_profile).put(update_profile).fallback(route_not_found),
        )
}
