/// HTTP middleware utilities for cloud-service
///
/// Authentication happens upstream: the gateway verifies the session and
/// forwards the viewer id in `X-User-Id`. `ViewerIdentity` lifts that header
/// into request extensions, where the `UserId` and `Viewer` extractors read it.
use crate::error::AppError;
use actix_web::dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;

/// Trusted header carrying the authenticated viewer id
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Authenticated viewer id stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

/// Optional viewer for routes that also serve anonymous readers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer(pub Option<String>);

impl Viewer {
    pub fn id(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

/// Actix middleware that records the forwarded viewer id, if any.
pub struct ViewerIdentity;

impl<S, B> Transform<S, ServiceRequest> for ViewerIdentity
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = ViewerIdentityService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ViewerIdentityService {
            service: Rc::new(service),
        }))
    }
}

pub struct ViewerIdentityService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for ViewerIdentityService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        let user_id = req
            .headers()
            .get(USER_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        if let Some(user_id) = user_id {
            req.extensions_mut().insert(UserId(user_id));
        }

        Box::pin(async move { service.call(req).await })
    }
}

impl FromRequest for UserId {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<UserId>()
                .cloned()
                .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string())),
        )
    }
}

impl FromRequest for Viewer {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(Viewer(
            req.extensions().get::<UserId>().map(|id| id.0.clone()),
        )))
    }
}

/// Limiter identity for read routes: `user:<id>` for a known viewer,
/// otherwise `ip:<client address>`.
///
/// Handlers that enforce limits themselves and the `/api/users` middleware
/// both key through here, so one reader shares a single read window.
pub fn requester_key(req: &HttpRequest) -> String {
    if let Some(user_id) = req.extensions().get::<UserId>() {
        return format!("user:{}", user_id.0);
    }
    let ip = req
        .connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string();
    format!("ip:{}", ip)
}

/// [`requester_key`] for middleware key extractors
pub fn viewer_or_ip_key(req: &ServiceRequest) -> String {
    requester_key(req.request())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App, HttpResponse};

    async fn whoami(viewer: Viewer) -> HttpResponse {
        HttpResponse::Ok().body(viewer.0.unwrap_or_else(|| "anonymous".to_string()))
    }

    async fn protected(user_id: UserId) -> HttpResponse {
        HttpResponse::Ok().body(user_id.0)
    }

    #[actix_rt::test]
    async fn test_viewer_header_is_extracted() {
        let app = test::init_service(
            App::new()
                .wrap(ViewerIdentity)
                .route("/whoami", web::get().to(whoami)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/whoami")
            .insert_header((USER_ID_HEADER, "user_42"))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "user_42");

        let req = test::TestRequest::get().uri("/whoami").to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "anonymous");
    }

    #[actix_rt::test]
    async fn test_blank_header_is_anonymous() {
        let app = test::init_service(
            App::new()
                .wrap(ViewerIdentity)
                .route("/protected", web::post().to(protected)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/protected")
            .insert_header((USER_ID_HEADER, "   "))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
    }

    #[::core::prelude::v1::test]
    fn test_key_prefers_viewer() {
        let req = test::TestRequest::get()
            .insert_header(("X-Forwarded-For", "203.0.113.7"))
            .to_srv_request();
        assert_eq!(viewer_or_ip_key(&req), "ip:203.0.113.7");

        req.extensions_mut().insert(UserId("alice".to_string()));
        assert_eq!(viewer_or_ip_key(&req), "user:alice");
    }

    #[::core::prelude::v1::test]
    fn test_handler_and_middleware_keys_agree() {
        let req = test::TestRequest::get()
            .insert_header(("X-Forwarded-For", "198.51.100.4"))
            .to_srv_request();
        assert_eq!(requester_key(req.request()), viewer_or_ip_key(&req));

        req.extensions_mut().insert(UserId("bob".to_string()));
        assert_eq!(requester_key(req.request()), "user:bob");
        assert_eq!(requester_key(req.request()), viewer_or_ip_key(&req));
    }
}
