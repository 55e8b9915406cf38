// /learnhub-lms/services/payments-service/src/middleware/rate_limit.rs
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Json, Response},
};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{models::ErrorResponse, AppState};

/// Rate limiter per client IP dengan gradual refill
#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<RwLock<HashMap<String, Bucket>>>,
    max_requests: u32,
    window_seconds: i64,
}

#[derive(Debug, Clone)]
struct Bucket {
    remaining: u32,
    refilled_at: DateTime<Utc>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_seconds: i64) -> Self {
        let limiter = Self {
            buckets: Arc::new(RwLock::new(HashMap::new())),
            max_requests,
            window_seconds,
        };

        // Background cleanup supaya map tidak tumbuh terus
        let buckets = limiter.buckets.clone();
        let window = window_seconds;
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(window as u64 * 2));
            loop {
                interval.tick().await;
                let cutoff = Utc::now() - Duration::seconds(window * 2);
                buckets.write().await.retain(|_, b| b.refilled_at > cutoff);
            }
        });

        limiter
    }

    pub async fn allow(&self, key: &str) -> bool {
        let mut buckets = self.buckets.write().await;
        let now = Utc::now();

        let bucket = buckets.entry(key.to_string()).or_insert_with(|| Bucket {
            remaining: self.max_requests,
            refilled_at: now,
        });

        let elapsed = (now - bucket.refilled_at).num_seconds();
        if elapsed >= self.window_seconds {
            bucket.remaining = self.max_requests;
            bucket.refilled_at = now;
        } else if elapsed > 0 {
            let per_second = self.max_requests as f64 / self.window_seconds as f64;
            let refill = (elapsed as f64 * per_second) as u32;
            if refill > 0 {
                bucket.remaining = (bucket.remaining + refill).min(self.max_requests);
                bucket.refilled_at = now;
            }
        }

        if bucket.remaining > 0 {
            bucket.remaining -= 1;
            true
        } else {
            false
        }
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let path = req.uri().path();

    // Health dan webhook tidak di-limit: gateway retries tidak boleh mental
    if path.starts_with("/health") || path.contains("/webhook") {
        return Ok(next.run(req).await);
    }

    let client_key = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.split(',').next())
        .or_else(|| {
            req.headers()
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
        })
        .unwrap_or("unknown")
        .trim()
        .to_string();

    if !state.rate_limiter.allow(&client_key).await {
        tracing::warn!("Rate limit terlampaui untuk: {}", client_key);
        return Err((
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorResponse {
                success: false,
                message: "Terlalu banyak request. Silakan coba lagi nanti.".to_string(),
                error_code: Some("RATE_LIMIT_EXCEEDED".to_string()),
                details: Some(serde_json::json!({
                    "retry_after_seconds": 60
                })),
            }),
        ));
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_limiter_exhausts_and_blocks() {
        let limiter = RateLimiter::new(3, 60);
        assert!(limiter.allow("10.0.0.1").await);
        assert!(limiter.allow("10.0.0.1").await);
        assert!(limiter.allow("10.0.0.1").await);
        assert!(!limiter.allow("10.0.0.1").await);

        // Client lain tidak terpengaruh
        assert!(limiter.allow("10.0.0.2").await);
    }
}
