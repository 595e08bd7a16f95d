//! Coarse fixed-window request limiter for the API surface

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use parking_lot::Mutex;

use crate::config::RateLimitConfig;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Clone)]
pub struct RateLimiter {
    state: Arc<Mutex<HashMap<String, RateWindow>>>,
    window: Duration,
    max_requests: u32,
}

#[derive(Debug, Clone, Copy)]
struct RateWindow {
    started_at: Instant,
    count: u32,
}

impl RateLimiter {
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(HashMap::new())),
            window: config.window,
            max_requests: config.max_requests,
        }
    }

    pub fn check(&self, client: &str) -> Result<(), AppError> {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: &str, now: Instant) -> Result<(), AppError> {
        let mut guard = self.state.lock();

        // Forget clients whose window has lapsed
        guard.retain(|_, w| now.duration_since(w.started_at) < self.window);

        let entry = guard.entry(client.to_string()).or_insert(RateWindow {
            started_at: now,
            count: 0,
        });

        if entry.count >= self.max_requests {
            let retry_after_secs = self
                .window
                .saturating_sub(now.duration_since(entry.started_at))
                .as_secs()
                .max(1);
            tracing::warn!(client, retry_after_secs, "Rate limit exceeded");
            return Err(AppError::TooManyRequests {
                message: "Too many requests, try again later".to_string(),
                retry_after_secs,
            });
        }

        entry.count += 1;
        Ok(())
    }
}

/// Client key: peer address, then the first forwarded address
fn client_key(request: &Request) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "anonymous".to_string())
}

pub async fn limit_requests(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    state.limiter().check(&client_key(&request))?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http;

    fn limiter(max_requests: u32) -> RateLimiter {
        RateLimiter::from_config(&RateLimitConfig {
            window: Duration::from_secs(60),
            max_requests,
        })
    }

    #[test]
    fn test_blocks_after_limit() {
        let limiter = limiter(2);
        let start = Instant::now();

        limiter.check_at("1.2.3.4", start).unwrap();
        limiter.check_at("1.2.3.4", start).unwrap();

        let err = limiter.check_at("1.2.3.4", start).unwrap_err();
        assert!(matches!(
            err,
            AppError::TooManyRequests {
                retry_after_secs: 60,
                ..
            }
        ));

        // Other clients have their own window
        limiter.check_at("5.6.7.8", start).unwrap();
    }

    #[test]
    fn test_window_resets() {
        let limiter = limiter(1);
        let start = Instant::now();

        limiter.check_at("1.2.3.4", start).unwrap();
        assert!(limiter.check_at("1.2.3.4", start).is_err());
        limiter
            .check_at("1.2.3.4", start + Duration::from_secs(61))
            .unwrap();
    }

    #[test]
    fn test_client_key_prefers_forwarded_header_without_peer() {
        let request = http::Request::builder()
            .header("x-forwarded-for", "10.0.0.1, 10.0.0.2")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_key(&request), "10.0.0.1");

        let bare = http::Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_key(&bare), "anonymous");
    }
}
