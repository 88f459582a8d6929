/// Activity handler - likes the viewer received and gave
use super::with_rate_limit_headers;
use crate::error::Result;
use crate::middleware::{requester_key, UserId};
use crate::state::AppState;
use actix_web::{web, HttpRequest, HttpResponse};
use rate_limit::RateLimitPolicy;

/// Entries returned per list
pub const ACTIVITY_LIMIT: i64 = 20;

/// GET /api/activity
pub async fn get_activity(
    user_id: UserId,
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let decision = state.enforce(RateLimitPolicy::Read, &requester_key(&req))?;

    let activity = state.content.activity(&user_id.0, ACTIVITY_LIMIT).await?;

    Ok(with_rate_limit_headers(
        HttpResponse::Ok().json(activity),
        decision,
    ))
}
