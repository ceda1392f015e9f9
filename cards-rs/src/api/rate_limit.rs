//! Fixed-window rate limiting per client IP

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::warn;

use super::response::ApiError;

pub const RATE_LIMIT_MESSAGE: &str = "Too many requests, please try again later.";

/// Rate limiter state for tracking requests per IP
pub struct RateLimiter {
    /// Map of IP -> (request count, window start time)
    requests: RwLock<HashMap<String, (u32, Instant)>>,
    max_requests: u32,
    window_duration: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_seconds: u64) -> Self {
        Self {
            requests: RwLock::new(HashMap::new()),
            max_requests,
            window_duration: Duration::from_secs(window_seconds),
        }
    }

    /// Count one request for `ip`; false once the window's quota is spent
    pub async fn check_rate_limit(&self, ip: &str) -> bool {
        self.check_at(ip, Instant::now()).await
    }

    async fn check_at(&self, ip: &str, now: Instant) -> bool {
        let mut requests = self.requests.write().await;

        // Drop windows that ended long ago so the map stays bounded
        let window = self.window_duration;
        requests.retain(|_, (_, start)| now.saturating_duration_since(*start) <= window * 2);

        let entry = requests.entry(ip.to_string()).or_insert((0, now));

        if now.saturating_duration_since(entry.1) >= window {
            entry.0 = 0;
            entry.1 = now;
        }

        if entry.0 >= self.max_requests {
            return false;
        }

        entry.0 += 1;
        true
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.requests.read().await.len()
    }
}

/// Client IP from the connection, "unknown" when the router runs without it
fn client_ip(req: &Request) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&req);

    if !limiter.check_rate_limit(&ip).await {
        warn!("Rate limit exceeded for {} on {}", ip, req.uri().path());
        return ApiError::new(StatusCode::TOO_MANY_REQUESTS, RATE_LIMIT_MESSAGE).into_response();
    }

    next.run(req).await
}
