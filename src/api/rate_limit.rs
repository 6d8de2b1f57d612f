//! Fixed-window request throttling, keyed per identity per endpoint.
//!
//! State is held in-process only: in a multi-instance deployment each
//! instance enforces its own independent limit. See DESIGN.md before
//! relying on this as a global limit.

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::debug;

use super::AppState;
use super::auth::client_ip;
use crate::config::{RateLimitConfig, RateLimitProfile};

/// Outcome of one limit check. `reset_at` is the end of the current
/// window whether or not the request was admitted.
#[derive(Debug, Clone, Copy)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

#[derive(Debug)]
struct Window {
    count: u32,
    reset_at: DateTime<Utc>,
}

/// Process-wide limiter. Constructed once at startup; the sweep task is
/// owned by the component and torn down through [`RateLimiter::shutdown`].
pub struct RateLimiter {
    windows: RwLock<HashMap<String, Window>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            windows: RwLock::new(HashMap::new()),
            sweeper: Mutex::new(None),
        }
    }

    pub async fn check(&self, key: &str, limit: u32, window: Duration) -> Decision {
        let now = Utc::now();
        let mut windows = self.windows.write().await;

        if let Some(entry) = windows.get_mut(key)
            && entry.reset_at > now
        {
            if entry.count >= limit {
                return Decision {
                    allowed: false,
                    limit,
                    remaining: 0,
                    reset_at: entry.reset_at,
                };
            }

            entry.count += 1;
            return Decision {
                allowed: true,
                limit,
                remaining: limit - entry.count,
                reset_at: entry.reset_at,
            };
        }

        // First hit for the key, or the previous window has elapsed
        let reset_at = now + window;
        windows.insert(key.to_string(), Window { count: 1, reset_at });

        Decision {
            allowed: true,
            limit,
            remaining: limit.saturating_sub(1),
            reset_at,
        }
    }

    /// Drop windows whose reset time has passed, to bound memory.
    pub async fn sweep(&self) {
        let now = Utc::now();
        let mut windows = self.windows.write().await;
        let before = windows.len();
        windows.retain(|_, w| w.reset_at > now);

        let removed = before - windows.len();
        if removed > 0 {
            debug!(removed, "Rate limit sweep removed expired windows");
        }
    }

    pub fn start_sweeper(self: &Arc<Self>, every: std::time::Duration) {
        let limiter = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                limiter.sweep().await;
            }
        });

        if let Ok(mut slot) = self.sweeper.try_lock() {
            *slot = Some(handle);
        }
    }

    pub async fn shutdown(&self) {
        if let Some(handle) = self.sweeper.lock().await.take() {
            handle.abort();
        }
    }

    #[cfg(test)]
    async fn window_count(&self) -> usize {
        self.windows.read().await.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick the named profile for a request by path and method.
#[must_use]
pub fn select_profile(
    config: &RateLimitConfig,
    method: &Method,
    path: &str,
) -> (&'static str, RateLimitProfile) {
    if path.ends_with("/auth/login") {
        ("login", config.login)
    } else if path.ends_with("/auth/register") {
        ("register", config.register)
    } else if path.ends_with("/auth/forgot-password") || path.ends_with("/auth/reset-password") {
        ("password", config.password)
    } else if matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    ) {
        ("mutation", config.mutation)
    } else {
        ("read", config.read)
    }
}

pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let config = state.config().read().await.rate_limit.clone();
    if !config.enabled {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let ip = client_ip(request.headers());
    let identity = bearer_identity(&state, request.headers());

    let (profile_name, profile) = select_profile(&config, &method, &path);
    let key = format!("{method}:{path}:{ip}:{identity}");

    let decision = state
        .rate_limiter()
        .check(
            &key,
            profile.max_requests,
            Duration::seconds(i64::try_from(profile.window_seconds).unwrap_or(i64::MAX)),
        )
        .await;

    if !decision.allowed {
        metrics::counter!("rate_limit_denied_total", &[("profile", profile_name.to_string())])
            .increment(1);

        let retry_after = (decision.reset_at - Utc::now()).num_seconds().max(1);
        let body = serde_json::json!({
            "success": false,
            "error": "Limite de requisições excedido. Tente novamente mais tarde.",
            "retryAfter": retry_after,
        });

        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        apply_headers(&mut response, &decision);
        return response;
    }

    let mut response = next.run(request).await;
    apply_headers(&mut response, &decision);
    response
}

/// Limits are per authenticated identity when a valid bearer token is
/// present, per IP otherwise.
fn bearer_identity(state: &AppState, headers: &axum::http::HeaderMap) -> String {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .and_then(|token| state.signer().verify(token.trim()).ok())
        .map_or_else(|| "anonymous".to_string(), |claims| claims.sub)
}

fn apply_headers(response: &mut Response, decision: &Decision) {
    let headers = response.headers_mut();

    if let Ok(value) = HeaderValue::from_str(&decision.limit.to_string()) {
        headers.insert("X-RateLimit-Limit", value);
    }
    if let Ok(value) = HeaderValue::from_str(&decision.remaining.to_string()) {
        headers.insert("X-RateLimit-Remaining", value);
    }
    if let Ok(value) = HeaderValue::from_str(&decision.reset_at.timestamp().to_string()) {
        headers.insert("X-RateLimit-Reset", value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{Duration as TokioDuration, sleep};

    #[tokio::test]
    async fn test_fixed_window_allows_up_to_limit() {
        let limiter = RateLimiter::new();

        for _ in 0..5 {
            let decision = limiter.check("k", 5, Duration::seconds(900)).await;
            assert!(decision.allowed);
        }

        let denied = limiter.check("k", 5, Duration::seconds(900)).await;
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
    }

    #[tokio::test]
    async fn test_denial_keeps_reset_time_unchanged() {
        let limiter = RateLimiter::new();

        let first = limiter.check("k", 1, Duration::seconds(900)).await;
        let denied = limiter.check("k", 1, Duration::seconds(900)).await;

        assert!(!denied.allowed);
        assert_eq!(denied.reset_at, first.reset_at);
    }

    #[tokio::test]
    async fn test_window_reopens_after_elapse() {
        let limiter = RateLimiter::new();

        for _ in 0..2 {
            assert!(limiter.check("k", 2, Duration::seconds(1)).await.allowed);
        }
        assert!(!limiter.check("k", 2, Duration::seconds(1)).await.allowed);

        sleep(TokioDuration::from_millis(1100)).await;

        let fresh = limiter.check("k", 2, Duration::seconds(1)).await;
        assert!(fresh.allowed);
        assert_eq!(fresh.remaining, 1);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let limiter = RateLimiter::new();

        assert!(limiter.check("a", 1, Duration::seconds(60)).await.allowed);
        assert!(!limiter.check("a", 1, Duration::seconds(60)).await.allowed);
        assert!(limiter.check("b", 1, Duration::seconds(60)).await.allowed);
    }

    #[tokio::test]
    async fn test_sweep_drops_expired_windows() {
        let limiter = RateLimiter::new();

        limiter.check("old", 5, Duration::seconds(1)).await;
        limiter.check("fresh", 5, Duration::seconds(600)).await;
        assert_eq!(limiter.window_count().await, 2);

        sleep(TokioDuration::from_millis(1100)).await;
        limiter.sweep().await;

        assert_eq!(limiter.window_count().await, 1);
    }

    #[test]
    fn test_profile_selection() {
        let config = RateLimitConfig::default();

        let (name, _) = select_profile(&config, &Method::POST, "/api/auth/login");
        assert_eq!(name, "login");

        let (name, _) = select_profile(&config, &Method::POST, "/api/auth/forgot-password");
        assert_eq!(name, "password");

        let (name, _) = select_profile(&config, &Method::POST, "/api/auth/logout");
        assert_eq!(name, "mutation");

        let (name, _) = select_profile(&config, &Method::GET, "/api/system/status");
        assert_eq!(name, "read");
    }
}
