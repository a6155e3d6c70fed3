//! HTTP API handlers

pub mod applications;
pub mod health;
pub mod middleware;
pub mod web;

use axum::extract::{ConnectInfo, Request};
use axum::http::HeaderMap;
use nyvoro_common::security::client_ip;
use std::net::SocketAddr;

pub use applications::application_routes;
pub use health::health_routes;

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Client address from `X-Forwarded-For`, else the socket peer
pub fn client_ip_from(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers.get(FORWARDED_FOR).and_then(|v| v.to_str().ok());
    client_ip(forwarded, peer.map(|addr| addr.ip()))
}

pub fn request_client_ip(request: &Request) -> String {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    client_ip_from(request.headers(), peer)
}
