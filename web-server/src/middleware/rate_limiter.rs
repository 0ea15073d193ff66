// web-server/src/middleware/rate_limiter.rs
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::{header, StatusCode},
    Error, HttpResponse, ResponseError,
};
use dashmap::DashMap;
use futures_util::future::{ready, LocalBoxFuture, Ready};
use serde_json::json;
use siwe_common::RateLimitConfig;
use thiserror::Error;

// Past this many tracked clients, idle entries are swept on the next hit
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, Error)]
#[error("Rate limit exceeded")]
pub struct RateLimitExceeded {
    pub retry_after: u64,
}

impl ResponseError for RateLimitExceeded {
    fn status_code(&self) -> StatusCode {
        StatusCode::TOO_MANY_REQUESTS
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::TooManyRequests()
            .append_header((header::RETRY_AFTER, self.retry_after.to_string()))
            .json(json!({ "error": "Rate limit exceeded. Please try again later." }))
    }
}

/// Per-IP sliding window over a set of path prefixes
#[derive(Debug, Clone)]
pub struct RateLimiter {
    paths: Vec<String>,
    max_requests: usize,
    window: Duration,
    trust_forwarded: bool,
    store: Arc<DashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(paths: Vec<String>, max_requests: usize, window: Duration) -> Self {
        Self {
            paths,
            max_requests,
            window,
            trust_forwarded: false,
            store: Arc::new(DashMap::new()),
        }
    }

    /// Take the client address from forwarding headers instead of the socket
    pub fn trust_forwarded_headers(mut self, trust: bool) -> Self {
        self.trust_forwarded = trust;
        self
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            config.paths.clone(),
            config.max_requests,
            Duration::from_secs(config.window_seconds),
        )
        .trust_forwarded_headers(config.trust_forwarded_headers)
    }

    fn client_key(&self, req: &ServiceRequest) -> String {
        if self.trust_forwarded {
            if let Some(ip) = req.connection_info().realip_remote_addr() {
                return ip.to_string();
            }
        }
        req.peer_addr()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn applies_to(&self, path: &str) -> bool {
        self.paths.iter().any(|p| path.starts_with(p.as_str()))
    }

    /// Record a hit for `key`, or return the seconds until it may retry.
    fn check(&self, key: &str, now: Instant) -> Result<(), u64> {
        if self.store.len() > SWEEP_THRESHOLD {
            let window = self.window;
            self.store.retain(|_, hits| {
                hits.back()
                    .map_or(false, |last| now.duration_since(*last) < window)
            });
        }

        let mut hits = self.store.entry(key.to_string()).or_default();
        while hits
            .front()
            .map_or(false, |oldest| now.duration_since(*oldest) >= self.window)
        {
            hits.pop_front();
        }

        if hits.len() >= self.max_requests {
            let retry_after = hits
                .front()
                .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(self.window);
            return Err(retry_after.as_secs().max(1));
        }

        hits.push_back(now);
        Ok(())
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RateLimiterMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimiterMiddleware {
            service,
            limiter: self.clone(),
        }))
    }
}

pub struct RateLimiterMiddleware<S> {
    service: S,
    limiter: RateLimiter,
}

impl<S, B> Service<ServiceRequest> for RateLimiterMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<ServiceResponse<B>, Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if self.limiter.applies_to(req.path()) {
            let ip = self.limiter.client_key(&req);

            if let Err(retry_after) = self.limiter.check(&ip, Instant::now()) {
                tracing::warn!("Rate limit exceeded for IP: {} on {}", ip, req.path());
                return Box::pin(async move { Err(RateLimitExceeded { retry_after }.into()) });
            }
        }

        let fut = self.service.call(req);
        Box::pin(fut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn limiter(max: usize) -> RateLimiter {
        RateLimiter::new(vec!["/api/auth/nonce".to_string()], max, Duration::from_secs(60))
    }

    #[test]
    fn test_window_budget() {
        let limiter = limiter(2);
        let now = Instant::now();

        assert!(limiter.check("1.2.3.4", now).is_ok());
        assert!(limiter.check("1.2.3.4", now).is_ok());
        assert_eq!(limiter.check("1.2.3.4", now), Err(60));
        assert!(limiter.check("5.6.7.8", now).is_ok());
    }

    #[test]
    fn test_window_slides() {
        let limiter = limiter(1);
        let start = Instant::now();

        assert!(limiter.check("1.2.3.4", start).is_ok());
        assert_eq!(
            limiter.check("1.2.3.4", start + Duration::from_secs(45)),
            Err(15)
        );
        assert!(limiter
            .check("1.2.3.4", start + Duration::from_secs(61))
            .is_ok());
    }

    #[test]
    fn test_client_key_ignores_forwarded_headers_by_default() {
        let peer: std::net::SocketAddr = "192.0.2.7:40000".parse().unwrap();
        let req = TestRequest::get()
            .uri("/api/auth/nonce")
            .peer_addr(peer)
            .insert_header(("X-Forwarded-For", "10.0.0.1"))
            .to_srv_request();

        assert_eq!(limiter(1).client_key(&req), "192.0.2.7");
        assert_eq!(
            limiter(1).trust_forwarded_headers(true).client_key(&req),
            "10.0.0.1"
        );
    }

    #[test]
    fn test_path_prefixes() {
        let limiter = limiter(1);
        assert!(limiter.applies_to("/api/auth/nonce"));
        assert!(!limiter.applies_to("/api/auth/me"));
    }
}
