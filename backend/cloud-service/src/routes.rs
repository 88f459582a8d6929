/// Route table for cloud-service
use crate::error::AppError;
use crate::handlers;
use crate::metrics::serve_metrics;
use crate::middleware::viewer_or_ip_key;
use crate::state::AppState;
use actix_web::middleware::Condition;
use actix_web::web;
use rate_limit::{RateLimitMiddleware, RateLimitPolicy};

/// Largest accepted JSON body
const JSON_LIMIT_BYTES: usize = 16 * 1024;

/// JSON extractor config that reports malformed bodies in the service error shape
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_LIMIT_BYTES)
        .error_handler(|err, _req| AppError::BadRequest(format!("Invalid JSON body: {}", err)).into())
}

/// Query extractor config that reports undecodable query strings in the
/// service error shape
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(format!("Invalid query string: {}", err)).into())
}

/// Register state and every route. The caller wraps the app in `ViewerIdentity`.
pub fn configure(cfg: &mut web::ServiceConfig, state: &AppState) {
    let users_limit = RateLimitMiddleware::new(state.limiter.clone(), RateLimitPolicy::Read)
        .with_key_extractor(viewer_or_ip_key);

    cfg.app_data(web::Data::new(state.clone()))
        .app_data(json_config())
        .app_data(query_config())
        .route("/metrics", web::get().to(serve_metrics))
        .service(
            web::scope("/api")
                .route("/health", web::get().to(handlers::health_check))
                .service(
                    web::resource("/tweets")
                        .route(web::get().to(handlers::get_feed))
                        .route(web::post().to(handlers::create_post)),
                )
                .route("/likes", web::post().to(handlers::toggle_like))
                .route("/retweets", web::post().to(handlers::toggle_retweet))
                .route("/replies", web::post().to(handlers::add_reply))
                .service(
                    web::resource("/profile")
                        .route(web::get().to(handlers::get_profile))
                        .route(web::patch().to(handlers::update_profile)),
                )
                .route("/activity", web::get().to(handlers::get_activity))
                .route("/stream", web::get().to(handlers::stream_updates))
                .service(
                    web::scope("/admin")
                        .route("/delete-tweet", web::post().to(handlers::delete_tweet))
                        .route("/delete-user", web::post().to(handlers::delete_user)),
                )
                .service(
                    web::scope("/users")
                        .wrap(Condition::new(state.rate_limit_enabled, users_limit))
                        .route("/search", web::get().to(handlers::search_users)),
                ),
        );
}
