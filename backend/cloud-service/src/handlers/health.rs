/// Health check handler
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;

/// GET /api/health
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    match state.content.count_posts().await {
        Ok(total) => HttpResponse::Ok().json(json!({
            "ok": true,
            "totalTweets": total,
        })),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            HttpResponse::InternalServerError().json(json!({
                "ok": false,
                "error": "Store unavailable",
            }))
        }
    }
}
