use crate::config::RateLimitPolicy;
use crate::limiter::{FixedWindowLimiter, RateLimitDecision};
use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderMap, HeaderName, HeaderValue},
    Error, HttpResponse,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, warn};

type KeyExtractor = Arc<dyn Fn(&ServiceRequest) -> String + Send + Sync>;

/// Applies one [`RateLimitPolicy`] to every request reaching the wrapped
/// service. Allowed responses carry the `X-RateLimit-*` headers; rejected
/// requests short-circuit with 429.
#[derive(Clone)]
pub struct RateLimitMiddleware {
    limiter: Arc<FixedWindowLimiter>,
    policy: RateLimitPolicy,
    key_fn: KeyExtractor,
}

impl RateLimitMiddleware {
    /// Limit per client IP.
    pub fn new(limiter: Arc<FixedWindowLimiter>, policy: RateLimitPolicy) -> Self {
        Self {
            limiter,
            policy,
            key_fn: Arc::new(|req| format!("ip:{}", extract_client_ip(req))),
        }
    }

    /// Replace the identifier used to key the window (e.g. authenticated user id).
    pub fn with_key_extractor<F>(mut self, key_fn: F) -> Self
    where
        F: Fn(&ServiceRequest) -> String + Send + Sync + 'static,
    {
        self.key_fn = Arc::new(key_fn);
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddlewareService {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
            policy: self.policy,
            key_fn: self.key_fn.clone(),
        }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: Rc<S>,
    limiter: Arc<FixedWindowLimiter>,
    policy: RateLimitPolicy,
    key_fn: KeyExtractor,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let key = self.policy.key(&(self.key_fn)(&req));
        let decision = self.limiter.check(&key, &self.policy.config());

        if !decision.allowed {
            warn!(
                key = %key,
                policy = %self.policy,
                limit = decision.limit,
                "Rate limit exceeded"
            );
            let response = too_many_requests(&decision, self.limiter.now_millis());
            return Box::pin(async move { Ok(req.into_response(response).map_into_right_body()) });
        }

        debug!(key = %key, remaining = decision.remaining, "Rate limit check passed");

        let service = self.service.clone();
        Box::pin(async move {
            let mut res = service.call(req).await?;
            insert_rate_limit_headers(res.headers_mut(), &decision);
            Ok(res.map_into_left_body())
        })
    }
}

/// Write the `X-RateLimit-*` headers for `decision` into `headers`.
pub fn insert_rate_limit_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    for (name, value) in decision.headers() {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            headers.insert(name, value);
        }
    }
}

/// 429 response for a rejected decision.
///
/// Body is `{error, message, retryAfter}`, with `retryAfter` in seconds
/// counted from `now_ms`. Every rejection path in the service renders through
/// here so the shape stays the same everywhere.
pub fn too_many_requests(decision: &RateLimitDecision, now_ms: i64) -> HttpResponse {
    let mut builder = HttpResponse::TooManyRequests();
    for header in decision.headers() {
        builder.insert_header(header);
    }
    builder.json(serde_json::json!({
        "error": "RATE_LIMIT_EXCEEDED",
        "message": "Rate limit exceeded",
        "retryAfter": decision.retry_after_secs(now_ms),
    }))
}

/// Client IP, preferring the first `X-Forwarded-For` hop.
fn extract_client_ip(req: &ServiceRequest) -> String {
    if let Some(forwarded) = req.headers().get("X-Forwarded-For") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            if let Some(first_ip) = forwarded_str.split(',').next() {
                let first_ip = first_ip.trim();
                if !first_ip.is_empty() {
                    return first_ip.to_string();
                }
            }
        }
    }

    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
